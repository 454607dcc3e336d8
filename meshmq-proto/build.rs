use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if env::var_os("PROTOC").is_none() {
        unsafe {
            env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
        }
    }

    // Proto sources live at the workspace root so other tooling can reach them.
    let proto_root = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?)
        .parent()
        .unwrap()
        .join("proto");

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&[proto_root.join("meshmq/v1/relay.proto")], &[proto_root])?;

    Ok(())
}
