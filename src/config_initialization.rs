//! Configuration initialization and hierarchy management

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::adapters::livepeer_http::{LivepeerConfig, DEFAULT_API_HOST, DEFAULT_REQUEST_TIMEOUT};
use crate::adapters::toml_config::{FileSettings, TomlConfigAdapter};
use crate::domain::model::DEFAULT_SEGMENT_LENGTH;
use crate::error::{TranscodeError, TranscodeResult};
use crate::utils::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::utils::time::TimeParser;

/// Values supplied on the command line or through `LP_*` environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub api_key: Option<String>,
    pub api_host: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub segment_length: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api_host: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub segment_length: Duration,
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Merge following precedence: CLI/env > file > defaults
    pub fn resolve(overrides: &ConfigOverrides, file: FileSettings) -> TranscodeResult<Self> {
        let api_host = overrides
            .api_host
            .clone()
            .or(file.api.host)
            .filter(|host| !host.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string());

        let api_key = overrides
            .api_key
            .clone()
            .or(file.api.key)
            .filter(|key| !key.trim().is_empty());

        let request_timeout = match overrides.request_timeout_secs.or(file.api.request_timeout_secs) {
            Some(0) => {
                return Err(TranscodeError::configuration(
                    "Request timeout must be at least one second",
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let segment_length = match (&overrides.segment_length, file.job.segment_length_secs) {
            (Some(text), _) => TimeParser::new().parse_duration(text).ok_or_else(|| {
                TranscodeError::configuration(format!("Invalid segment length '{}'", text))
            })?,
            (None, Some(secs)) => Duration::try_from_secs_f64(secs).map_err(|_| {
                TranscodeError::configuration(format!(
                    "Invalid segment length {} in config file",
                    secs
                ))
            })?,
            (None, None) => DEFAULT_SEGMENT_LENGTH,
        };
        if segment_length.is_zero() {
            return Err(TranscodeError::configuration("Segment length must be positive"));
        }

        let mut logging = LoggingConfig::default();
        if let Some(level) = overrides.log_level.as_deref().or(file.logging.level.as_deref()) {
            logging.level = level.parse::<LogLevel>()?;
        }
        if let Some(format) = overrides.log_format.as_deref().or(file.logging.format.as_deref()) {
            logging.format = format.parse::<LogFormat>()?;
        }

        Ok(Self {
            api_host,
            api_key,
            request_timeout,
            segment_length,
            logging,
        })
    }

    /// Connection settings for the remote backend; requires an API key
    pub fn livepeer(&self) -> TranscodeResult<LivepeerConfig> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            TranscodeError::configuration("Missing API key: pass --api-key or set LP_API_KEY")
        })?;
        Ok(LivepeerConfig {
            api_host: self.api_host.clone(),
            api_key,
            request_timeout: self.request_timeout,
        })
    }
}

/// Initialize configuration hierarchy following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(overrides: &ConfigOverrides) -> TranscodeResult<RuntimeConfig> {
    let file = TomlConfigAdapter::discover(overrides.config_file.as_deref())?;
    let config = RuntimeConfig::resolve(overrides, file)?;
    debug!(
        api_host = %config.api_host,
        timeout_secs = config.request_timeout.as_secs(),
        "Segment length {:.3}s",
        config.segment_length.as_secs_f64()
    );
    Ok(config)
}
