//! Sweep Scan
//!
//! Loads scan settings, reads the needle and haystack files, applies the
//! configured mask preprocessing and reports the best sweeps of each haystack.

mod scan;
mod settings;

pub use scan::{preprocess, run, scan_lists, Preprocessed, ScanReport};
pub use settings::{ScanSettings, CONFIG_ENV, ENV_PREFIX};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging at `level`, falling back to info for unknown names
pub fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
