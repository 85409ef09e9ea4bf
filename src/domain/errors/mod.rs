// Domain errors - Errors raised while resolving rendition profiles

use std::fmt;

/// Profile resolution errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// Preset name is not in the known preset table
    UnknownPreset(String),
    /// Resolution is not `<width>x<height>`
    InvalidResolution(String),
    /// Discrete parameters given without a bitrate
    MissingBitrate,
    /// Bitrate in Kbit/s does not fit in bits per second
    InvalidBitrate(u64),
    /// Frame rate is not `<num>` or `<num>/<den>`
    InvalidFrameRate(String),
    /// H.264 profile token outside baseline/main/high
    InvalidH264Profile(String),
    /// Keyframe interval is not a duration
    InvalidGop(String),
    /// Profile file could not be read
    ProfileFileUnreadable(String),
    /// Profile file is not a JSON list of profiles
    ProfileParseError(String),
    /// Profile file holds no profiles
    EmptyProfileList,
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::UnknownPreset(name) => write!(f, "Unknown preset name: {:?}", name),
            ProfileError::InvalidResolution(res) => {
                write!(f, "Invalid resolution {:?}, expected <width>x<height>", res)
            }
            ProfileError::MissingBitrate => write!(f, "Bitrate must be specified with resolution"),
            ProfileError::InvalidBitrate(kbps) => write!(f, "Bitrate out of range: {} Kbit/s", kbps),
            ProfileError::InvalidFrameRate(fps) => {
                write!(f, "Invalid frame rate {:?}, expected <num> or <num>/<den>", fps)
            }
            ProfileError::InvalidH264Profile(p) => {
                write!(f, "Invalid H.264 profile {:?}, expected baseline, main or high", p)
            }
            ProfileError::InvalidGop(gop) => write!(f, "Invalid GOP duration: {:?}", gop),
            ProfileError::ProfileFileUnreadable(msg) => write!(f, "Cannot read profiles file: {}", msg),
            ProfileError::ProfileParseError(msg) => write!(f, "Cannot parse profiles file: {}", msg),
            ProfileError::EmptyProfileList => write!(f, "Profiles file contains no profiles"),
        }
    }
}

impl std::error::Error for ProfileError {}
