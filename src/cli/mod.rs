//! CLI module for lp-transcode
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config_initialization::ConfigOverrides;

pub mod args;
pub mod commands;

pub use args::TranscodeArgs;

/// lp-transcode
///
/// Transcodes a media file segment by segment through the Livepeer network and
/// writes the renditions as container files or as an HLS package.
#[derive(Parser, Debug)]
#[command(name = "lp-transcode")]
#[command(about = "Segment-by-segment remote transcoding via the Livepeer API")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Livepeer API key
    #[arg(short = 'k', long, env = "LP_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Livepeer API host [default: livepeer.com]
    #[arg(short = 'a', long, env = "LP_API_HOST", global = true)]
    pub api_host: Option<String>,

    /// Settings file (defaults to ./lp-transcode.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Segment length, e.g. `18s` or `6.5` [default: 18s]
    #[arg(long, env = "LP_SEGMENT_LENGTH", global = true)]
    pub segment_length: Option<String>,

    /// HTTP request timeout in seconds [default: 120]
    #[arg(long, env = "LP_REQUEST_TIMEOUT", global = true)]
    pub request_timeout: Option<u64>,

    /// Logging level
    #[arg(long, env = "LP_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_parser = ["pretty", "compact", "json"])]
    pub log_format: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcode a file into the requested renditions
    Transcode(args::TranscodeArgs),
    /// List the preset names known to the backend
    ListPresets,
}

impl Cli {
    /// Command-line and environment layer of the configuration hierarchy
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            api_key: self.api_key.clone(),
            api_host: self.api_host.clone(),
            request_timeout_secs: self.request_timeout,
            segment_length: self.segment_length.clone(),
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
        }
    }
}
