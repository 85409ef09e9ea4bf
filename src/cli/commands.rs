//! Command implementations

use std::path::Path;

use tracing::info;

use crate::adapters::LivepeerConfig;
use crate::app::{AppContainer, DefaultAppContainer};
use crate::cli::args::TranscodeArgs;
use crate::config_initialization::RuntimeConfig;
use crate::domain::model::{ContainerFormat, OutputMode, TranscodeJob, TranscodeReport};
use crate::domain::presets;
use crate::domain::rules::ProfileResolver;
use crate::error::{TranscodeError, TranscodeResult};

/// Check the input path: supported extension, exists, not a directory
pub fn validate_input(input: &Path) -> TranscodeResult<()> {
    if ContainerFormat::from_path(input).is_none() {
        return Err(TranscodeError::configuration(format!(
            "Unsupported input type {}: expected .ts, .mp4 or .flv",
            input.display()
        )));
    }
    Ok(())
}

fn validate_input_file(input: &Path) -> TranscodeResult<()> {
    match std::fs::metadata(input) {
        Ok(meta) if meta.is_dir() => Err(TranscodeError::configuration(format!(
            "Input {} is a directory",
            input.display()
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(TranscodeError::configuration(format!(
            "Input {} is not readable: {}",
            input.display(),
            e
        ))),
    }
}

/// Every check that must pass before any network or file activity
///
/// Checks run in a fixed order so the reported problem is deterministic.
pub fn prepare_job(
    args: &TranscodeArgs,
    config: &RuntimeConfig,
) -> TranscodeResult<(TranscodeJob, LivepeerConfig)> {
    validate_input(&args.input)?;
    OutputMode::from_path(&args.output)?;
    let livepeer = config.livepeer()?;
    validate_input_file(&args.input)?;

    let renditions = ProfileResolver::resolve(&args.selection())?;
    let job = TranscodeJob::new(&args.input, &args.output, renditions, config.segment_length)?;
    Ok((job, livepeer))
}

/// Execute the transcode command
pub async fn transcode(args: TranscodeArgs, config: &RuntimeConfig) -> TranscodeResult<TranscodeReport> {
    let (job, livepeer) = prepare_job(&args, config)?;
    info!(
        "Renditions: {}",
        job.renditions.names().join(", ")
    );

    let container = DefaultAppContainer::new(livepeer)?;
    container.transcode_interactor().execute(&job).await
}

/// Execute the list-presets command
pub fn list_presets() {
    for name in presets::names() {
        println!("{}", name);
    }
}
