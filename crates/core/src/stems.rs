//! Stem naming, object-store key, and public URL conventions.
//!
//! Layout produced by the separation engine:
//!
//! ```text
//! {output_dir}/{model}/{input_file_stem}/{stem}.wav
//! ```
//!
//! Object store layout: `stems/{job_id}/{stem}.wav`, four keys per
//! completed job. Public URL: `{public_base}/{key}`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::JobId;

/// File extension of every stem artifact.
pub const STEM_EXTENSION: &str = "wav";

/// Content type set on uploaded stem artifacts.
pub const STEM_CONTENT_TYPE: &str = "audio/wav";

/// Top-level key prefix for published artifacts.
pub const KEY_PREFIX: &str = "stems";

/// One isolated component of the source audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stem {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl Stem {
    /// Every expected stem, in publishing order.
    pub const ALL: [Stem; 4] = [Stem::Vocals, Stem::Drums, Stem::Bass, Stem::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vocals => "vocals",
            Self::Drums => "drums",
            Self::Bass => "bass",
            Self::Other => "other",
        }
    }

    /// File name the engine writes for this stem (`vocals.wav`, ...).
    pub fn file_name(self) -> String {
        format!("{}.{STEM_EXTENSION}", self.as_str())
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory where the engine places the stems for `input`.
///
/// The engine names the per-track directory after the input's file name
/// with its final extension removed.
pub fn engine_stems_dir(output_dir: &Path, model: &str, input: &Path) -> PathBuf {
    let track = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    output_dir.join(model).join(track)
}

/// Object-store key for a job's stem: `stems/{job_id}/{stem}.wav`.
pub fn artifact_key(job_id: &JobId, stem: Stem) -> String {
    format!("{KEY_PREFIX}/{job_id}/{}", stem.file_name())
}

/// Join the configured public base URL and an object key.
pub fn public_url(public_base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        public_base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

// ---------------------------------------------------------------------------
// Download map
// ---------------------------------------------------------------------------

/// Public URLs for a completed job, one per stem.
///
/// The struct shape guarantees the map is never partial: it can only be
/// built once all four URLs are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemUrls {
    pub vocals: String,
    pub drums: String,
    pub bass: String,
    pub other: String,
}

impl StemUrls {
    /// Build from `(stem, url)` pairs. Fails unless every stem is present
    /// exactly once.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (Stem, String)>,
    {
        let mut slots: [Option<String>; 4] = Default::default();
        for (stem, url) in pairs {
            let slot = &mut slots[stem.index()];
            if slot.is_some() {
                return Err(CoreError::Conflict(format!("duplicate URL for stem {stem}")));
            }
            *slot = Some(url);
        }

        let [vocals, drums, bass, other] = slots;
        let missing = |stem: Stem| CoreError::Validation(format!("missing URL for stem {stem}"));
        Ok(Self {
            vocals: vocals.ok_or_else(|| missing(Stem::Vocals))?,
            drums: drums.ok_or_else(|| missing(Stem::Drums))?,
            bass: bass.ok_or_else(|| missing(Stem::Bass))?,
            other: other.ok_or_else(|| missing(Stem::Other))?,
        })
    }

    pub fn get(&self, stem: Stem) -> &str {
        match stem {
            Stem::Vocals => &self.vocals,
            Stem::Drums => &self.drums,
            Stem::Bass => &self.bass,
            Stem::Other => &self.other,
        }
    }

    /// Iterate `(stem, url)` in publishing order.
    pub fn iter(&self) -> impl Iterator<Item = (Stem, &str)> {
        Stem::ALL.into_iter().map(move |stem| (stem, self.get(stem)))
    }
}

impl Stem {
    fn index(self) -> usize {
        match self {
            Self::Vocals => 0,
            Self::Drums => 1,
            Self::Bass => 2,
            Self::Other => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
