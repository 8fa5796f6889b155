fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR")?);
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .file_descriptor_set_path(out_dir.join("tango_descriptor.bin"))
        .compile_protos(&["proto/tango/v1/tango.proto"], &["proto"])?;
    Ok(())
}
