//! Generated gRPC bindings for `tango.v1`, compiled by `build.rs` from
//! `proto/tango/v1/tango.proto`.

pub mod v1 {
    tonic::include_proto!("tango.v1");
}

#[cfg(feature = "reflection")]
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("tango_descriptor");
