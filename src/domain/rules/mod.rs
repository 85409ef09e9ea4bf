// Domain rules - Turning user rendition parameters into a rendition list

use std::path::{Path, PathBuf};

use crate::domain::errors::ProfileError;
use crate::domain::model::*;
use crate::domain::presets;
use crate::error::{TranscodeError, TranscodeResult};
use crate::utils::time::TimeParser;

/// Rendition parameters as supplied by the user
///
/// Exactly one of `presets`, `resolution` and `profiles_file` must be set.
/// `bitrate_kbps`, `frame_rate`, `h264_profile` and `gop` only qualify
/// `resolution`.
#[derive(Debug, Clone, Default)]
pub struct RenditionSelection {
    pub presets: Option<String>,
    pub resolution: Option<String>,
    pub bitrate_kbps: Option<u64>,
    pub frame_rate: Option<String>,
    pub h264_profile: Option<String>,
    pub gop: Option<String>,
    pub profiles_file: Option<PathBuf>,
}

/// Resolves a [`RenditionSelection`] into a validated [`RenditionSet`]
pub struct ProfileResolver;

impl ProfileResolver {
    /// Resolve user input into a non-empty rendition list
    pub fn resolve(selection: &RenditionSelection) -> TranscodeResult<RenditionSet> {
        let given = [
            selection.presets.is_some(),
            selection.resolution.is_some(),
            selection.profiles_file.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if given == 0 {
            return Err(TranscodeError::configuration(
                "Should specify presets, resolution or a profiles file",
            ));
        }
        if given > 1 {
            return Err(TranscodeError::configuration(
                "Presets, resolution and profiles file are mutually exclusive",
            ));
        }

        let has_qualifiers = selection.bitrate_kbps.is_some()
            || selection.frame_rate.is_some()
            || selection.h264_profile.is_some()
            || selection.gop.is_some();
        if has_qualifiers && selection.resolution.is_none() {
            return Err(TranscodeError::configuration(
                "Bitrate, frame rate, profile and GOP can only be used with resolution",
            ));
        }

        if let Some(list) = &selection.presets {
            return Ok(RenditionSet::Presets(Self::resolve_presets(list)?));
        }

        if let Some(path) = &selection.profiles_file {
            return Ok(RenditionSet::Profiles(Self::load_profiles(path)?));
        }

        let profile = Self::params_to_profile(
            selection.resolution.as_deref().unwrap_or_default(),
            selection.h264_profile.as_deref(),
            selection.frame_rate.as_deref(),
            selection.bitrate_kbps.unwrap_or(0),
            selection.gop.as_deref(),
        )?;
        Ok(RenditionSet::Profiles(vec![profile]))
    }

    /// Split and validate a comma-separated preset list
    pub fn resolve_presets(list: &str) -> Result<Vec<String>, ProfileError> {
        let names: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            return Err(ProfileError::UnknownPreset(list.to_string()));
        }
        if let Some(unknown) = names.iter().find(|name| presets::lookup(name).is_none()) {
            return Err(ProfileError::UnknownPreset(unknown.clone()));
        }
        Ok(names)
    }

    /// Build the single `custom` profile from discrete parameters
    pub fn params_to_profile(
        resolution: &str,
        h264_profile: Option<&str>,
        frame_rate: Option<&str>,
        bitrate_kbps: u64,
        gop: Option<&str>,
    ) -> Result<RenditionProfile, ProfileError> {
        if bitrate_kbps == 0 {
            return Err(ProfileError::MissingBitrate);
        }
        let bitrate = bitrate_kbps
            .checked_mul(1000)
            .ok_or(ProfileError::InvalidBitrate(bitrate_kbps))?;

        let (width, height) = parse_resolution(resolution)?;
        let fps = parse_frame_rate(frame_rate.unwrap_or_default())?;

        let profile = match h264_profile.filter(|p| !p.is_empty()) {
            Some(token) => Some(
                H264Profile::from_token(token)
                    .ok_or_else(|| ProfileError::InvalidH264Profile(token.to_string()))?,
            ),
            None => None,
        };

        let gop = match gop.filter(|g| !g.is_empty()) {
            Some(value) => {
                let parser = TimeParser::new();
                let duration = parser
                    .parse_duration(value)
                    .ok_or_else(|| ProfileError::InvalidGop(value.to_string()))?;
                (!duration.is_zero()).then(|| parser.format_seconds_4dp(duration))
            }
            None => None,
        };

        Ok(RenditionProfile {
            name: "custom".to_string(),
            width,
            height,
            bitrate,
            fps: fps.num,
            fps_den: fps.den,
            gop,
            profile,
        })
    }

    /// Read a JSON list of profiles
    pub fn load_profiles(path: &Path) -> Result<Vec<RenditionProfile>, ProfileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProfileError::ProfileFileUnreadable(format!("{}: {}", path.display(), e))
        })?;
        let profiles: Vec<RenditionProfile> = serde_json::from_str(&content)
            .map_err(|e| ProfileError::ProfileParseError(format!("{}: {}", path.display(), e)))?;
        if profiles.is_empty() {
            return Err(ProfileError::EmptyProfileList);
        }
        Ok(profiles)
    }
}

/// Parse `<width>x<height>`
pub fn parse_resolution(resolution: &str) -> Result<(u32, u32), ProfileError> {
    let invalid = || ProfileError::InvalidResolution(resolution.to_string());
    let (w, h) = resolution.split_once('x').ok_or_else(invalid)?;
    let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
    let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
    Ok((width, height))
}

/// Parse `<num>` or `<num>/<den>`; empty means unspecified (0/0)
pub fn parse_frame_rate(fps: &str) -> Result<FrameRate, ProfileError> {
    if fps.is_empty() {
        return Ok(FrameRate::default());
    }
    let invalid = || ProfileError::InvalidFrameRate(fps.to_string());
    match fps.split_once('/') {
        Some((num, den)) => Ok(FrameRate::new(
            num.parse().map_err(|_| invalid())?,
            den.parse().map_err(|_| invalid())?,
        )),
        None => Ok(FrameRate::new(fps.parse().map_err(|_| invalid())?, 0)),
    }
}
