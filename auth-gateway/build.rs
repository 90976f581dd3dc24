fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Fall back to the bundled protoc so builds do not need a system install
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path().map_err(|e| e.to_string())?;
        std::env::set_var("PROTOC", protoc);
    }

    tonic_build::configure()
        .build_server(false)
        .compile_protos(&["proto/identity.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/identity.proto");
    Ok(())
}
