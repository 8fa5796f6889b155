//! Tango coordinator — the tonic gRPC surface over `tango_core`'s
//! transport-free domain logic: the auth interceptor, the secret/object
//! store adapters, the accounting log, and the service implementation.

pub mod accounting;
pub mod auth;
pub mod objectstore;
pub mod proto;
pub mod secrets;
pub mod service;
