//! The `TangoService` gRPC surface: translates between the wire types in
//! `proto::v1` and the transport-free operations in `tango_core`.
//!
//! Structured like `entity_gateway::server::grpc::EntityGatewayService`: a
//! thin struct holding shared state, one method per RPC, each method doing
//! request validation then delegating to a plain function.

use std::sync::Arc;
use std::time::Duration;

use tango_core::device::DeviceRegistry;
use tango_core::job::{Job, NewJob};
use tango_core::registry::JobRegistry;
use tango_core::{aggregation, scheduler, status, TangoError};
use tonic::{Request, Response, Status};

use crate::accounting::AccountingLog;
use crate::proto::v1::tango_service_server::TangoService as TangoServiceTrait;
use crate::proto::v1::{
    DeviceInfo, DeviceRequest, DeviceResponse, DeviceStatus, DeviceStatusResponse,
    JobStatusReply, JobStatusRequest, ResultResponse, TaskAssignment as ProtoTaskAssignment,
    TaskRequest, TaskResponse, TaskResult,
};

fn tango_err_to_status(err: TangoError) -> Status {
    let message = err.to_string();
    match err.grpc_code() {
        tango_core::error::GrpcCode::NotFound => Status::not_found(message),
        tango_core::error::GrpcCode::InvalidArgument => Status::invalid_argument(message),
        tango_core::error::GrpcCode::Unavailable => Status::unavailable(message),
        tango_core::error::GrpcCode::Unauthenticated => Status::unauthenticated(message),
        tango_core::error::GrpcCode::Internal => Status::internal(message),
    }
}

pub struct TangoServer {
    registry: Arc<JobRegistry>,
    devices: Arc<DeviceRegistry>,
    object_store: Arc<dyn tango_core::ports::ObjectStore>,
    accounting: Arc<AccountingLog>,
    records_bucket: String,
    assignment_lease: Duration,
}

impl TangoServer {
    pub fn new(
        registry: Arc<JobRegistry>,
        devices: Arc<DeviceRegistry>,
        object_store: Arc<dyn tango_core::ports::ObjectStore>,
        accounting: Arc<AccountingLog>,
        records_bucket: String,
        assignment_lease: Duration,
    ) -> Self {
        Self {
            registry,
            devices,
            object_store,
            accounting,
            records_bucket,
            assignment_lease,
        }
    }
}

#[tonic::async_trait]
impl TangoServiceTrait for TangoServer {
    async fn submit_task(
        &self,
        request: Request<TaskRequest>,
    ) -> Result<Response<TaskResponse>, Status> {
        let req = request.into_inner();

        if self.registry.get(&req.job_id).is_some() {
            return Err(Status::already_exists(format!(
                "job {} already submitted",
                req.job_id
            )));
        }
        if req.row_splits == 0 || req.col_splits == 0 {
            return Err(Status::invalid_argument(
                "row_splits and col_splits must be positive",
            ));
        }

        self.registry.put(Job::new(NewJob {
            job_id: req.job_id,
            consumer_id: req.consumer_id,
            operation: req.operation,
            a_data: req.a_data,
            b_data: req.b_data,
            m: req.m,
            n: req.n,
            d: req.d,
            row_splits: req.row_splits,
            col_splits: req.col_splits,
            scale_bytes: req.scale_bytes,
            scale_scalar: req.scale_scalar,
        }));

        Ok(Response::new(TaskResponse {
            accepted: true,
            message: "job accepted".to_string(),
        }))
    }

    async fn fetch_task(
        &self,
        request: Request<DeviceRequest>,
    ) -> Result<Response<ProtoTaskAssignment>, Status> {
        let req = request.into_inner();
        let assignment = scheduler::fetch_task(&self.registry, &req.device_id, self.assignment_lease)
            .map_err(tango_err_to_status)?;

        Ok(Response::new(ProtoTaskAssignment {
            job_id: assignment.job_id,
            task_id: assignment.task_id,
            operation: assignment.operation,
            a_data: assignment.a_data,
            b_data: assignment.b_data,
            m: assignment.row_block as i32,
            n: assignment.col_block as i32,
            d: assignment.grid_rows as i32,
            scale_bytes: assignment.scale_bytes,
            scale_scalar: assignment.scale_scalar,
        }))
    }

    async fn report_result(
        &self,
        request: Request<TaskResult>,
    ) -> Result<Response<ResultResponse>, Status> {
        let req = request.into_inner();

        let consumer_id = self
            .registry
            .get(&req.job_id)
            .map(|job| job.consumer_id.clone())
            .ok_or_else(|| Status::not_found("job not found"))?;

        // Accounting is only meaningful for genuine work (spec.md §4.D step 5).
        if req.flops > 0 && !req.result_data.is_empty() {
            if let Err(e) = self.accounting.append(&req.device_id, &consumer_id, req.flops) {
                tracing::warn!(error = %e, "failed to append accounting record");
            }
        }

        let outcome = aggregation::report_result(&self.registry, &req.job_id, &req.task_id, req.result_data)
            .map_err(tango_err_to_status)?;

        if outcome.just_completed {
            match self.accounting.take_and_clear() {
                Ok(bytes) if !bytes.is_empty() => {
                    let key = format!("{}.csv", req.job_id);
                    if let Err(e) = self
                        .object_store
                        .upload(&self.records_bucket, &key, bytes)
                        .await
                    {
                        tracing::warn!(error = %e, job_id = %req.job_id, "accounting upload failed");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "failed to read accounting file for upload"),
            }
            // Dequeue regardless of upload outcome (spec.md §4.D step 7 /
            // open question: the job is done either way, and a lost
            // accounting upload shouldn't wedge the queue).
            self.registry.dequeue(&req.job_id);
        }

        Ok(Response::new(ResultResponse {
            success: true,
            message: "result recorded".to_string(),
        }))
    }

    async fn get_job_status(
        &self,
        request: Request<JobStatusRequest>,
    ) -> Result<Response<JobStatusReply>, Status> {
        let req = request.into_inner();
        let reply = match status::get_job_status(&self.registry, &req.job_id) {
            // An absent job is reported complete: it was either harvested
            // after finishing or never existed, and the consumer is meant
            // to treat this as "possible completion" (spec.md §4.F).
            status::JobStatus::NotFound => JobStatusReply {
                is_complete: true,
                message: "Job not found (possible completion).".to_string(),
                final_result: None,
            },
            status::JobStatus::InProgress => JobStatusReply {
                is_complete: false,
                message: "job in progress".to_string(),
                final_result: None,
            },
            status::JobStatus::Complete { final_result } => JobStatusReply {
                is_complete: true,
                message: "job complete".to_string(),
                final_result: Some(final_result),
            },
        };
        Ok(Response::new(reply))
    }

    async fn register_device(
        &self,
        request: Request<DeviceInfo>,
    ) -> Result<Response<DeviceResponse>, Status> {
        let req = request.into_inner();
        self.devices.register(req.device_id);
        Ok(Response::new(DeviceResponse {
            registered: true,
            message: "device registered".to_string(),
        }))
    }

    async fn update_device_status(
        &self,
        request: Request<DeviceStatus>,
    ) -> Result<Response<DeviceStatusResponse>, Status> {
        let req = request.into_inner();
        let cpu_usage = i32::try_from(req.cpu_usage).map_err(|_| {
            Status::invalid_argument(format!("cpu_usage {} out of range", req.cpu_usage))
        })?;
        let updated = self.devices.update_status(
            &req.device_id,
            req.available_ram,
            cpu_usage,
            req.internet_speed,
            req.is_charging,
        );
        let message = if updated {
            "device status updated".to_string()
        } else {
            "device not registered".to_string()
        };
        Ok(Response::new(DeviceStatusResponse { updated, message }))
    }
}
