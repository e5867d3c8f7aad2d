//! Scan settings
//!
//! Read from an optional file named by `SWEEP_SCAN_CONFIG`, then overlaid by
//! `SWEEP_SCAN__*` environment variables, with `__` separating nested keys:
//! `SWEEP_SCAN__ENGINE__GRANULARITY=1`.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use sweep_engine::{EngineConfig, Mode, RankOrder};

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "SWEEP_SCAN_CONFIG";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "SWEEP_SCAN";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub engine: EngineConfig,

    /// Mode to run. Added to the engine's mode set if missing.
    pub mode: Mode,

    /// Reference file for needle modes
    pub needle: Option<PathBuf>,

    /// Files scanned one after another with the same context
    pub haystacks: Vec<PathBuf>,

    /// Masks per sweep
    pub sweep_len: u64,

    /// Best sweeps reported per haystack
    pub rank_count: usize,
    pub order: RankOrder,

    /// Stacked delta passes, 0 to 3
    pub deltafy: u8,

    /// Delta each byte lane separately
    pub channelize: bool,

    /// Remap the masks in use onto a dense range
    pub densify: bool,

    /// Code masks by distance from their predecessor
    pub surroundify: bool,

    pub log_level: String,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            mode: Mode::Shannon,
            needle: None,
            haystacks: Vec::new(),
            sweep_len: 256,
            rank_count: 1,
            order: RankOrder::Ascending,
            deltafy: 0,
            channelize: false,
            densify: false,
            surroundify: false,
            log_level: "info".to_string(),
        }
    }
}

impl ScanSettings {
    /// Load from the settings file, if any, and the environment.
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            builder = builder.add_source(File::with_name(&path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("haystacks")
                    .with_list_parse_key("engine.modes"),
            )
            .build()
            .context("Failed to read scan settings")?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let mut settings: Self = config
            .try_deserialize()
            .context("Invalid scan settings")?;
        settings.engine.modes.insert(settings.mode);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(text: &str) -> Result<ScanSettings> {
        let config = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        ScanSettings::from_config(config)
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let settings = from_toml("").unwrap();
        assert_eq!(settings, ScanSettings::default());
    }

    #[test]
    fn test_mode_joins_engine_modes() {
        let settings = from_toml(
            r#"
            mode = "jsd"
            needle = "needle.bin"
            haystacks = ["a.bin", "b.bin"]
            sweep_len = 64
            rank_count = 4
            order = "descending"
            densify = true

            [engine]
            granularity = 1
            mask_max = 65535
            modes = ["shannon"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.mode, Mode::Jsd);
        assert!(settings.engine.modes.contains(Mode::Jsd));
        assert!(settings.engine.modes.contains(Mode::Shannon));
        assert_eq!(settings.engine.granularity, 1);
        assert_eq!(settings.haystacks.len(), 2);
        assert_eq!(settings.order, RankOrder::Descending);
        assert!(settings.densify);
        assert!(!settings.surroundify);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(from_toml(r#"mode = "entropy""#).is_err());
    }
}
