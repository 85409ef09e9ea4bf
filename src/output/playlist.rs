//! HLS playlist structures and package assembly

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{TranscodeError, TranscodeResult};
use crate::utils::path::PathUtils;

/// One entry of a media playlist
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment {
    /// Sequence number of the input segment this was transcoded from
    pub seq_id: u64,
    /// Duration in seconds
    pub duration: f64,
    /// URI relative to the playlist
    pub uri: String,
}

/// Video-on-demand media playlist for one rendition
#[derive(Debug, Clone)]
pub struct MediaPlaylist {
    /// Target duration in whole seconds
    pub target_duration: u64,
    pub segments: Vec<MediaSegment>,
}

impl MediaPlaylist {
    /// Create a VOD playlist whose target duration is the configured segment length
    pub fn vod(segment_length: Duration, segments: Vec<MediaSegment>) -> Self {
        Self {
            target_duration: segment_length.as_secs_f64().ceil() as u64,
            segments,
        }
    }

    fn media_sequence(&self) -> u64 {
        self.segments.first().map(|s| s.seq_id).unwrap_or(0)
    }
}

impl fmt::Display for MediaPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#EXTM3U")?;
        writeln!(f, "#EXT-X-VERSION:3")?;
        writeln!(f, "#EXT-X-MEDIA-SEQUENCE:{}", self.media_sequence())?;
        writeln!(f, "#EXT-X-TARGETDURATION:{}", self.target_duration)?;
        writeln!(f, "#EXT-X-PLAYLIST-TYPE:VOD")?;
        for segment in &self.segments {
            writeln!(f, "#EXTINF:{:.3},", segment.duration)?;
            writeln!(f, "{}", segment.uri)?;
        }
        writeln!(f, "#EXT-X-ENDLIST")
    }
}

/// Variant entry of a master playlist
#[derive(Debug, Clone, PartialEq)]
pub struct VariantStream {
    pub name: String,
    pub uri: String,
    /// Bits per second
    pub bandwidth: u64,
    /// `WxH`, when known
    pub resolution: Option<String>,
}

/// Master playlist referencing one media playlist per rendition
#[derive(Debug, Clone, Default)]
pub struct MasterPlaylist {
    pub variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, variant: VariantStream) {
        self.variants.push(variant);
    }
}

impl fmt::Display for MasterPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#EXTM3U")?;
        writeln!(f, "#EXT-X-VERSION:3")?;
        for variant in &self.variants {
            write!(f, "#EXT-X-STREAM-INF:BANDWIDTH={}", variant.bandwidth)?;
            if let Some(resolution) = &variant.resolution {
                write!(f, ",RESOLUTION={}", resolution)?;
            }
            writeln!(f, ",NAME=\"{}\"", variant.name)?;
            writeln!(f, "{}", variant.uri)?;
        }
        Ok(())
    }
}

/// Everything accumulated for one rendition during a playlist-mode job
#[derive(Debug, Clone)]
pub struct RenditionPlaylist {
    /// Preset or profile name
    pub name: String,
    pub resolution: Option<String>,
    pub bandwidth: u64,
    pub segments: Vec<MediaSegment>,
}

/// Builds and writes the master and media playlists of an HLS package
pub struct PlaylistAssembler {
    paths: PathUtils,
    segment_length: Duration,
}

impl PlaylistAssembler {
    pub fn new(segment_length: Duration) -> Self {
        Self {
            paths: PathUtils::new(),
            segment_length,
        }
    }

    /// Build the master playlist for `renditions`
    pub fn master(&self, dst: &Path, renditions: &[RenditionPlaylist]) -> MasterPlaylist {
        let mut master = MasterPlaylist::new();
        for rendition in renditions {
            let name = self.paths.media_playlist_name(dst, &rendition.name);
            master.append(VariantStream {
                uri: format!("{}.m3u8", name),
                name,
                bandwidth: rendition.bandwidth,
                resolution: rendition.resolution.clone(),
            });
        }
        master
    }

    /// Write the master playlist to `dst` and each media playlist next to it
    ///
    /// Returns the written paths, master first.
    pub fn write_package(
        &self,
        dst: &Path,
        renditions: &[RenditionPlaylist],
    ) -> TranscodeResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(renditions.len() + 1);

        let master = self.master(dst, renditions);
        Self::write(dst, &master.to_string())?;
        written.push(dst.to_path_buf());

        for rendition in renditions {
            let playlist = MediaPlaylist::vod(self.segment_length, rendition.segments.clone());
            let path = self.paths.media_playlist_path(dst, &rendition.name);
            Self::write(&path, &playlist.to_string())?;
            debug!(
                rendition = %rendition.name,
                segments = playlist.segments.len(),
                "Wrote media playlist {}",
                path.display()
            );
            written.push(path);
        }

        info!(
            "Wrote master playlist {} with {} variants",
            dst.display(),
            renditions.len()
        );
        Ok(written)
    }

    fn write(path: &Path, content: &str) -> TranscodeResult<()> {
        std::fs::write(path, content).map_err(|e| {
            TranscodeError::playlist(format!("Failed to write {}: {}", path.display(), e))
        })
    }
}
