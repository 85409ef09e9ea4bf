//! Output path naming helpers

use std::path::{Path, PathBuf};

/// Derives every output file name from the job's destination path
pub struct PathUtils;

impl PathUtils {
    /// Create a new path utils instance
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PathUtils {
    fn default() -> Self {
        Self::new()
    }
}

impl PathUtils {
    /// File stem of the destination (`out/movie.m3u8` -> `movie`)
    pub fn file_base(&self, dst: &Path) -> String {
        dst.file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Extension of the destination including the dot, or empty
    pub fn dotted_extension(&self, dst: &Path) -> String {
        dst.extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    }

    /// Container file for rendition `index` out of `count`
    ///
    /// A single rendition keeps the destination unmodified; otherwise
    /// `_<index>` is inserted before the extension.
    pub fn container_output(&self, dst: &Path, index: usize, count: usize) -> PathBuf {
        if count == 1 {
            return dst.to_path_buf();
        }
        dst.with_file_name(format!(
            "{}_{}{}",
            self.file_base(dst),
            index,
            self.dotted_extension(dst)
        ))
    }

    /// Place `file_name` in the destination's directory
    pub fn sibling(&self, dst: &Path, file_name: &str) -> PathBuf {
        match dst.parent() {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    /// `<base>_<rendition>_<seq>.ts`
    pub fn segment_file_name(&self, dst: &Path, rendition: &str, seq_no: u64) -> String {
        format!("{}_{}_{}.ts", self.file_base(dst), rendition, seq_no)
    }

    /// `<base>_<rendition>`, the variant name advertised in the master playlist
    pub fn media_playlist_name(&self, dst: &Path, rendition: &str) -> String {
        format!("{}_{}", self.file_base(dst), rendition)
    }

    /// Where the media playlist of `rendition` is written
    pub fn media_playlist_path(&self, dst: &Path, rendition: &str) -> PathBuf {
        self.sibling(
            dst,
            &format!(
                "{}{}",
                self.media_playlist_name(dst, rendition),
                self.dotted_extension(dst)
            ),
        )
    }
}
