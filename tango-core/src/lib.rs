//! Transport-free domain logic for the Tango distributed computation
//! coordinator: the job/shard state machine, the pull-based dispatch
//! scheduler, the aggregation/reassembly path, and the background
//! expiration reaper.
//!
//! No tonic, no network I/O. `tango-server` wires this up to a gRPC
//! surface; tests exercise it directly.

pub mod aggregation;
pub mod config;
pub mod device;
pub mod error;
pub mod job;
pub mod matmul;
pub mod ports;
pub mod reaper;
pub mod registry;
pub mod scheduler;
pub mod status;

pub use error::TangoError;
pub use job::{Job, NewJob};
pub use registry::JobRegistry;
