//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::rules::RenditionSelection;

/// Arguments for the transcode command
#[derive(Args, Debug)]
pub struct TranscodeArgs {
    /// Input file (.ts, .mp4 or .flv)
    pub input: PathBuf,

    /// Output file (.ts, .mp4, .flv, or .m3u8 for an HLS package)
    pub output: PathBuf,

    /// Comma-separated preset names, e.g. P240p30fps16x9,P360p30fps16x9
    #[arg(short, long)]
    pub presets: Option<String>,

    /// Output resolution as WxH
    #[arg(short, long)]
    pub resolution: Option<String>,

    /// Output bitrate in Kbit/s, used with --resolution
    #[arg(short, long)]
    pub bitrate: Option<u64>,

    /// Output frame rate as N or N/D, used with --resolution
    #[arg(short = 'f', long)]
    pub framerate: Option<String>,

    /// H.264 profile (baseline, main, high), used with --resolution
    #[arg(short = 'o', long)]
    pub profile: Option<String>,

    /// GOP length, e.g. 2s or 500ms, used with --resolution
    #[arg(short, long)]
    pub gop: Option<String>,

    /// JSON file with a list of explicit profiles
    #[arg(long)]
    pub profiles: Option<PathBuf>,
}

impl TranscodeArgs {
    /// The rendition flags as handed to the profile resolver
    pub fn selection(&self) -> RenditionSelection {
        RenditionSelection {
            presets: self.presets.clone(),
            resolution: self.resolution.clone(),
            bitrate_kbps: self.bitrate,
            frame_rate: self.framerate.clone(),
            h264_profile: self.profile.clone(),
            gop: self.gop.clone(),
            profiles_file: self.profiles.clone(),
        }
    }
}
