//! Coordinator-wide error type.
//!
//! Mirrors the teacher's `SemOsError`: one flat enum, one `#[from] anyhow::Error`
//! catch-all, and a transport-status mapping method consulted only at the RPC
//! boundary. Core logic never constructs a transport status directly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TangoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("no available tasks")]
    Exhausted,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("reassembly failed for job {0}: {1}")]
    ReassemblyFailed(String, String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

/// gRPC status codes, named the way `tonic::Code` names them, without
/// depending on tonic from this transport-free crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrpcCode {
    NotFound,
    InvalidArgument,
    Unavailable,
    Unauthenticated,
    Internal,
}

impl TangoError {
    pub fn grpc_code(&self) -> GrpcCode {
        match self {
            Self::NotFound(_) => GrpcCode::NotFound,
            Self::Malformed(_) => GrpcCode::InvalidArgument,
            Self::Exhausted => GrpcCode::Unavailable,
            Self::Unauthorized(_) => GrpcCode::Unauthenticated,
            Self::ReassemblyFailed(_, _) => GrpcCode::Internal,
            Self::Internal(_) => GrpcCode::Internal,
        }
    }
}
