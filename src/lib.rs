//! lp-transcode library
//!
//! Slices a media file into segments, transcodes each segment remotely through
//! the Livepeer network and writes the renditions either as container files or
//! as an HLS package.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod output;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::ProfileError;
pub use domain::model::{RenditionProfile, RenditionSet, TranscodeJob, TranscodeReport};
pub use error::{TranscodeError, TranscodeResult};
