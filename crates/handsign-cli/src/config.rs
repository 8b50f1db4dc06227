//! Application configuration for the CLI.

use std::path::{Path, PathBuf};

use handsign_core::PipelineParams;
use handsign_link::LinkConfig;

use crate::error::CliError;

/// Runtime configuration assembled from defaults, environment and flags.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Accelerator link settings (`HANDSIGN_SPI_*` overrides apply).
    pub link: LinkConfig,
    /// Local pipeline thresholds, also handed to the simulator.
    pub params: PipelineParams,
    /// Print reports as JSON instead of text.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            params: PipelineParams::default(),
            json: std::env::var("HANDSIGN_JSON")
                .ok()
                .is_some_and(|value| env_flag(&value)),
        }
    }
}

impl AppConfig {
    /// Apply command-line overrides on top of the defaults.
    ///
    /// `params` names a JSON file; fields it omits keep their defaults.
    pub fn from_overrides(
        params: Option<&Path>,
        device: Option<PathBuf>,
        json: bool,
    ) -> Result<Self, CliError> {
        let mut config = Self::default();
        if let Some(path) = params {
            config.params = load_params(path)?;
            tracing::info!("Loaded pipeline parameters from {}", path.display());
        }
        if let Some(device) = device {
            config.link.device = device;
        }
        config.json |= json;
        Ok(config)
    }
}

/// Truthy values: `1`, `true`, `yes`, `on` (any case). Anything else,
/// including `0` and `false`, leaves the flag off.
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn load_params(path: &Path) -> Result<PipelineParams, CliError> {
    let text = std::fs::read_to_string(path)?;
    PipelineParams::from_json(&text).map_err(|source| CliError::Params {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("handsign-params-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "skin": { "cb": [90, 125], "cr": [135, 175] } }"#).unwrap();

        let config = AppConfig::from_overrides(Some(&path), Some("/dev/spidev1.0".into()), true).unwrap();
        assert_eq!(config.params.skin.cb, [90, 125]);
        assert_eq!(config.params.peaks, PipelineParams::default().peaks);
        assert_eq!(config.link.device, PathBuf::from("/dev/spidev1.0"));
        assert!(config.json);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_env_flag_values() {
        for on in ["1", "true", "TRUE", "yes", " on "] {
            assert!(env_flag(on), "{on:?} should enable");
        }
        for off in ["0", "false", "False", "no", "off", "", "maybe"] {
            assert!(!env_flag(off), "{off:?} should not enable");
        }
    }

    #[test]
    fn test_malformed_params_name_the_file() {
        let path = std::env::temp_dir().join(format!("handsign-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = AppConfig::from_overrides(Some(&path), None, false).unwrap_err();
        assert!(matches!(err, CliError::Params { .. }));
        assert!(err.to_string().contains("handsign-bad"));
        std::fs::remove_file(&path).unwrap();
    }
}
