// Transcoding presets known to the backend

/// Immutable table of preset names resolved server-side
pub static PRESETS: &[&str] = &[
    "P720p60fps16x9",
    "P720p30fps16x9",
    "P720p25fps16x9",
    "P720p30fps4x3",
    "P576p30fps16x9",
    "P576p25fps16x9",
    "P360p30fps16x9",
    "P360p25fps16x9",
    "P360p30fps4x3",
    "P240p30fps16x9",
    "P240p25fps16x9",
    "P240p30fps4x3",
    "P144p30fps16x9",
    "P144p25fps16x9",
];

/// Look a preset up by exact name
pub fn lookup(name: &str) -> Option<&'static str> {
    PRESETS.iter().copied().find(|preset| *preset == name)
}

/// All preset names, sorted
pub fn names() -> Vec<&'static str> {
    let mut names = PRESETS.to_vec();
    names.sort_unstable();
    names
}
