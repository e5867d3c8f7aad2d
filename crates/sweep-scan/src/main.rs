//! Sweep Scan - Main Entry Point

use anyhow::Result;
use sweep_scan::{init_logging, run, ScanSettings};
use tracing::info;

fn main() -> Result<()> {
    let settings = ScanSettings::load()?;
    init_logging(&settings.log_level);

    info!("=== Sweep Scan v{} ===", env!("CARGO_PKG_VERSION"));

    for report in run(&settings)? {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
