//! Cassette document (de)serialization
//!
//! One document per file. YAML is the default; a `.json` extension selects
//! JSON. Both formats carry the same keys, so a cassette can be renamed
//! between them and re-saved.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::episode::Episode;
use crate::error::TapeError;
use crate::Result;

/// Current cassette schema version
pub const CASSETTE_VERSION: u32 = 1;

/// Complete cassette file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CassetteData {
    /// Schema version; documents without the key are read as version 1
    #[serde(default = "default_version")]
    pub version: u32,
    /// Recorded episodes in insertion order
    #[serde(default, rename = "interactions")]
    pub episodes: Vec<Episode>,
}

fn default_version() -> u32 {
    CASSETTE_VERSION
}

impl Default for CassetteData {
    fn default() -> Self {
        Self {
            version: CASSETTE_VERSION,
            episodes: Vec::new(),
        }
    }
}

/// Parse a cassette document from disk
///
/// # Errors
///
/// Returns [`TapeError::SerializationFailure`] when the file cannot be read,
/// the document is malformed, the version is unknown, or an episode's
/// response variant disagrees with its `rpc_type`.
pub fn load(path: &Path) -> Result<CassetteData> {
    let content = fs::read_to_string(path).map_err(|e| {
        TapeError::serialization(format!("failed to read cassette {}", path.display()), e)
    })?;

    let data: CassetteData = if is_json(path) {
        serde_json::from_str(&content).map_err(|e| {
            TapeError::serialization(format!("failed to parse {}", path.display()), e)
        })?
    } else {
        serde_yaml::from_str(&content).map_err(|e| {
            TapeError::serialization(format!("failed to parse {}", path.display()), e)
        })?
    };

    if data.version != CASSETTE_VERSION {
        return Err(TapeError::SerializationFailure {
            message: format!(
                "unsupported cassette version {} in {} (expected {CASSETTE_VERSION})",
                data.version,
                path.display()
            ),
            source: None,
        });
    }

    for episode in &data.episodes {
        episode.validate()?;
    }

    debug!(
        path = %path.display(),
        episodes = data.episodes.len(),
        "loaded cassette"
    );
    Ok(data)
}

/// Write a cassette document to disk, creating parent directories
///
/// # Errors
///
/// Returns [`TapeError::SerializationFailure`] when the document cannot be
/// emitted and [`TapeError::CassetteWriteFailure`] on I/O errors.
pub fn save(path: &Path, data: &CassetteData) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| TapeError::CassetteWriteFailure {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
    }

    let content = if is_json(path) {
        serde_json::to_string_pretty(data).map_err(|e| {
            TapeError::serialization(format!("failed to encode {}", path.display()), e)
        })?
    } else {
        serde_yaml::to_string(data).map_err(|e| {
            TapeError::serialization(format!("failed to encode {}", path.display()), e)
        })?
    };

    fs::write(path, content).map_err(|e| TapeError::CassetteWriteFailure {
        path: path.to_path_buf(),
        source: e,
    })?;

    debug!(
        path = %path.display(),
        episodes = data.episodes.len(),
        "saved cassette"
    );
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}
