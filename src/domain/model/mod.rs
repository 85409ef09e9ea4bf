// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{TranscodeError, TranscodeResult};

/// Length of the slices the input is cut into, unless configured otherwise
pub const DEFAULT_SEGMENT_LENGTH: Duration = Duration::from_secs(18);

/// H.264 profile tag understood by the transcoding backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum H264Profile {
    H264Baseline,
    H264Main,
    H264High,
    H264ConstrainedHigh,
}

impl H264Profile {
    /// Map a command-line token to a profile tag
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "baseline" => Some(H264Profile::H264Baseline),
            "main" => Some(H264Profile::H264Main),
            "high" => Some(H264Profile::H264High),
            _ => None,
        }
    }
}

/// Frame rate as a rational; 0/0 lets the backend choose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }
}

/// Explicit description of one output rendition
///
/// Field names follow the backend's JSON profile format, so a profiles file
/// deserializes straight into a list of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenditionProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Bits per second
    #[serde(default)]
    pub bitrate: u64,
    #[serde(default)]
    pub fps: u32,
    #[serde(default)]
    pub fps_den: u32,
    /// Keyframe interval in seconds, 4 decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<H264Profile>,
}

impl RenditionProfile {
    /// `WxH` when both dimensions are known
    pub fn resolution(&self) -> Option<String> {
        if self.width > 0 && self.height > 0 {
            Some(format!("{}x{}", self.width, self.height))
        } else {
            None
        }
    }
}

/// The renditions requested for a job
///
/// Presets are resolved by the backend, so nothing but their names is known
/// locally.
#[derive(Debug, Clone, PartialEq)]
pub enum RenditionSet {
    Presets(Vec<String>),
    Profiles(Vec<RenditionProfile>),
}

impl RenditionSet {
    pub fn len(&self) -> usize {
        match self {
            RenditionSet::Presets(presets) => presets.len(),
            RenditionSet::Profiles(profiles) => profiles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Output names, index-aligned with the renditions
    pub fn names(&self) -> Vec<String> {
        match self {
            RenditionSet::Presets(presets) => presets.clone(),
            RenditionSet::Profiles(profiles) => profiles
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    if p.name.is_empty() {
                        format!("profile_{}", i)
                    } else {
                        p.name.clone()
                    }
                })
                .collect(),
        }
    }

    /// Resolution of rendition `index`, known only for explicit profiles
    pub fn resolution(&self, index: usize) -> Option<String> {
        match self {
            RenditionSet::Presets(_) => None,
            RenditionSet::Profiles(profiles) => profiles.get(index).and_then(|p| p.resolution()),
        }
    }
}

/// One slice of the input, as produced by the segment source
#[derive(Debug, Clone)]
pub struct InputSegment {
    pub seq_no: u64,
    pub pts: Duration,
    pub duration: Duration,
    pub data: Bytes,
}

/// Item delivered on the segment channel
#[derive(Debug)]
pub enum SegmentEvent {
    Segment(InputSegment),
    /// Input exhausted cleanly
    End,
    /// Segmenting stopped on an error
    Failed(String),
}

/// Transcoded output for one input segment, one buffer per rendition
#[derive(Debug, Clone)]
pub struct TranscodedSegmentSet {
    renditions: Vec<Bytes>,
}

impl TranscodedSegmentSet {
    /// Build a set, rejecting any response that does not cover every rendition
    pub fn new(renditions: Vec<Bytes>, expected: usize, seq_no: u64) -> TranscodeResult<Self> {
        if renditions.len() != expected {
            return Err(TranscodeError::Push {
                seq_no,
                message: format!(
                    "expected {} transcoded renditions, got {}",
                    expected,
                    renditions.len()
                ),
            });
        }
        Ok(Self { renditions })
    }

    pub fn len(&self) -> usize {
        self.renditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.renditions.iter()
    }
}

/// Container flavours accepted for input and container-mode output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    MpegTs,
    Mp4,
    Flv,
}

impl ContainerFormat {
    /// Recognise a container from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ts" => Some(ContainerFormat::MpegTs),
            "mp4" => Some(ContainerFormat::Mp4),
            "flv" => Some(ContainerFormat::Flv),
            _ => None,
        }
    }
}

/// How transcoded segments are turned into output files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Remux every rendition into one container file
    Container(ContainerFormat),
    /// Write an HLS package: segment files plus media and master playlists
    Playlist,
}

impl OutputMode {
    /// Decide the mode from the destination's extension
    pub fn from_path(path: &Path) -> TranscodeResult<Self> {
        if path.extension().and_then(|e| e.to_str()) == Some("m3u8") {
            return Ok(OutputMode::Playlist);
        }
        ContainerFormat::from_path(path)
            .map(OutputMode::Container)
            .ok_or_else(|| {
                TranscodeError::configuration(format!(
                    "Unsupported output extension for file {:?}",
                    path
                ))
            })
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Container(format) => write!(f, "container ({:?})", format),
            OutputMode::Playlist => write!(f, "HLS playlist"),
        }
    }
}

/// Handle on a remote transcoding stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub rendition_count: usize,
}

/// One input-to-output transcoding run
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: OutputMode,
    pub renditions: RenditionSet,
    pub segment_length: Duration,
}

impl TranscodeJob {
    /// Create a job, fixing the output mode once from the destination
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        renditions: RenditionSet,
        segment_length: Duration,
    ) -> TranscodeResult<Self> {
        let output = output.into();
        let mode = OutputMode::from_path(&output)?;
        if renditions.is_empty() {
            return Err(TranscodeError::configuration("No renditions requested"));
        }
        if segment_length.is_zero() {
            return Err(TranscodeError::configuration("Segment length must be positive"));
        }
        Ok(Self {
            input: input.into(),
            output,
            mode,
            renditions,
            segment_length,
        })
    }
}

/// Outcome of a finished job
#[derive(Debug, Clone, Default)]
pub struct TranscodeReport {
    pub session_id: String,
    pub segments: u64,
    pub written_files: Vec<PathBuf>,
}
