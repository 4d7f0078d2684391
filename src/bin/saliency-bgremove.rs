//! Saliency background removal CLI
//!
//! Removes image backgrounds offline using classical saliency analysis.

#[cfg(feature = "cli")]
use saliency_bgremove::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(2);
}
