// TOML config adapter - Typed settings file for lp-transcode

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{TranscodeError, TranscodeResult};

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "lp-transcode.toml";

/// `[api]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSettings {
    pub host: Option<String>,
    pub key: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// `[job]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSettings {
    pub segment_length_secs: Option<f64>,
}

/// `[logging]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

/// Contents of an `lp-transcode.toml` file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub job: JobSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Loads [`FileSettings`] from disk
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse settings from TOML text
    pub fn parse(content: &str) -> TranscodeResult<FileSettings> {
        toml::from_str(content)
            .map_err(|e| TranscodeError::configuration(format!("Failed to parse TOML config: {}", e)))
    }

    /// Load an explicitly requested file; a missing file is an error
    pub fn load(path: &Path) -> TranscodeResult<FileSettings> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranscodeError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let settings = Self::parse(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(settings)
    }

    /// Load `explicit` if given, else the default file when present
    pub fn discover(explicit: Option<&Path>) -> TranscodeResult<FileSettings> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            Self::load(&default)
        } else {
            debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(FileSettings::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_all_sections() {
        let settings = TomlConfigAdapter::parse(
            r#"
            [api]
            host = "livepeer.monster"
            key = "secret"
            request_timeout_secs = 30

            [job]
            segment_length_secs = 6.5

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(settings.api.host.as_deref(), Some("livepeer.monster"));
        assert_eq!(settings.api.key.as_deref(), Some("secret"));
        assert_eq!(settings.api.request_timeout_secs, Some(30));
        assert_eq!(settings.job.segment_length_secs, Some(6.5));
        assert_eq!(settings.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_partial_file_defaults() {
        let settings = TomlConfigAdapter::parse("[job]\nsegment_length_secs = 4\n").unwrap();
        assert_eq!(settings.api, ApiSettings::default());
        assert_eq!(settings.job.segment_length_secs, Some(4.0));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(TomlConfigAdapter::parse("[api]\nhots = \"x\"\n").is_err());
        assert!(TomlConfigAdapter::parse("[render]\nthreads = 4\n").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nkey = \"from-file\"").unwrap();

        let settings = TomlConfigAdapter::discover(Some(file.path())).unwrap();
        assert_eq!(settings.api.key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = TomlConfigAdapter::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(TranscodeError::Configuration { .. })));
    }
}
