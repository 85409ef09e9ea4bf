//! lp-transcode
//!
//! Transcodes a media file segment by segment through the Livepeer network.
//!
//! # Usage
//!
//! ```bash
//! lp-transcode transcode in.mp4 out.mp4 -r 1280x720 -b 2000 -g 2s
//! lp-transcode transcode in.ts hls/master.m3u8 -p P240p30fps16x9,P360p30fps16x9
//! lp-transcode list-presets
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use lp_transcode::cli::{commands, Cli, Commands};
use lp_transcode::config_initialization::initialize_configuration_hierarchy;
use lp_transcode::utils::logging::LoggingSystem;
use lp_transcode::TranscodeError;

/// Exit status for problems caught before any side effect
const EXIT_PREFLIGHT: u8 = 1;
/// Exit status for failures once the job started
const EXIT_JOB_FAILED: u8 = 2;

/// Main entry point for the lp-transcode CLI application
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

fn exit_status(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<TranscodeError>() {
        Some(err) if !err.is_preflight() => EXIT_JOB_FAILED,
        _ => EXIT_PREFLIGHT,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = initialize_configuration_hierarchy(&cli.overrides())
        .context("Invalid configuration")?;

    let logging = LoggingSystem::new(config.logging.clone());
    logging.initialize().context("Failed to initialize logging")?;
    logging.log_system_info();

    match cli.command {
        Commands::ListPresets => {
            commands::list_presets();
        }
        Commands::Transcode(args) => {
            info!("Executing transcode command");
            let report = commands::transcode(args, &config)
                .await
                .context("Transcoding failed")?;

            info!(
                "Stream {} done after {} segments",
                report.session_id, report.segments
            );
            for file in &report.written_files {
                info!("Wrote {}", file.display());
            }
        }
    }

    Ok(())
}
