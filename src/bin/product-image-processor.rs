//! Product image processor binary
//!
//! Runs the HTTP upload service (`serve`) or an offline batch (`process`).

#[cfg(feature = "cli")]
use product_image_processor::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
