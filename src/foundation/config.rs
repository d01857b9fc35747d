use std::{fs::File, io::BufReader, io::Read, path::Path, time::Duration};

use crate::foundation::error::{LayerdocError, LayerdocResult};

/// PNG compression effort used for background, thumbnail and raster payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    /// Fastest encode, larger files.
    Fast,
    /// Balanced.
    #[default]
    Default,
    /// Smallest files.
    Best,
}

/// Editor-wide options; every field has a default so partial JSON files are accepted.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorOpts {
    /// Number of history entries kept per document.
    pub history_capacity: usize,
    /// Longest thumbnail side in pixels; `0` disables thumbnails.
    pub thumbnail_max_side: u32,
    /// DEFLATE level (0-9) for vector payloads.
    pub vector_compression_level: u32,
    /// PNG effort.
    pub png_compression: PngCompression,
    /// Seconds between auto-saves; `0` disables auto-save.
    pub autosave_interval_secs: u64,
    /// Encode raster payloads on the rayon pool while saving.
    pub parallel_encode: bool,
}

impl Default for EditorOpts {
    fn default() -> Self {
        Self {
            history_capacity: 64,
            thumbnail_max_side: 256,
            vector_compression_level: 6,
            png_compression: PngCompression::Default,
            autosave_interval_secs: 300,
            parallel_encode: true,
        }
    }
}

impl EditorOpts {
    /// Load options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> LayerdocResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            LayerdocError::validation(format!("open editor options '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Load options from any JSON reader.
    pub fn from_reader(r: impl Read) -> LayerdocResult<Self> {
        let opts: Self = serde_json::from_reader(r)
            .map_err(|e| LayerdocError::serde(format!("parse editor options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Load options from a JSON string.
    pub fn from_json_str(s: &str) -> LayerdocResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Check value ranges.
    pub fn validate(&self) -> LayerdocResult<()> {
        if self.history_capacity == 0 {
            return Err(LayerdocError::validation("history_capacity must be >= 1"));
        }
        if self.vector_compression_level > 9 {
            return Err(LayerdocError::validation(
                "vector_compression_level must be in 0..=9",
            ));
        }
        Ok(())
    }

    /// Auto-save period, `None` when disabled.
    pub fn autosave_interval(&self) -> Option<Duration> {
        (self.autosave_interval_secs > 0).then(|| Duration::from_secs(self.autosave_interval_secs))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
