fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = prost_build::Config::new();
    config.protoc_executable(protoc_bin_vendored::protoc_bin_path()?);

    println!("cargo:rerun-if-changed=proto/recap.proto");
    tonic_build::configure()
        .build_client(true)
        .compile_protos_with_config(config, &["proto/recap.proto"], &["proto"])?;
    Ok(())
}
