//! Error handling module for lp-transcode

use thiserror::Error;

use crate::domain::errors::ProfileError;

/// Main error type for transcoding jobs
#[derive(Error, Debug)]
pub enum TranscodeError {
    /// Bad or conflicting command-line / configuration input
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Rendition profile could not be resolved
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Remote session create/delete failure
    #[error("Session error: {message}")]
    Session { message: String },

    /// Segment submission failure, including timeouts
    #[error("Push of segment {seq_no} failed: {message}")]
    Push { seq_no: u64, message: String },

    /// The segment source reported a terminal error
    #[error("Segmenting failed: {message}")]
    Source { message: String },

    /// Demux, mux or segment file write failure
    #[error("Multiplexing failed: {message}")]
    Multiplex { message: String },

    /// Playlist encode/write failure
    #[error("Playlist error: {message}")]
    Playlist { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// FFmpeg error
    #[error("FFmpeg error: {0}")]
    FFmpeg(#[from] ffmpeg_next::Error),
}

impl TranscodeError {
    /// Whether the error was raised before any remote or file-system side effect
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            TranscodeError::Configuration { .. } | TranscodeError::Profile(_)
        )
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        TranscodeError::Configuration {
            message: message.into(),
        }
    }

    pub fn session(message: impl Into<String>) -> Self {
        TranscodeError::Session {
            message: message.into(),
        }
    }

    pub fn multiplex(message: impl Into<String>) -> Self {
        TranscodeError::Multiplex {
            message: message.into(),
        }
    }

    pub fn playlist(message: impl Into<String>) -> Self {
        TranscodeError::Playlist {
            message: message.into(),
        }
    }
}

/// Result type alias for transcoding operations
pub type TranscodeResult<T> = std::result::Result<T, TranscodeError>;
