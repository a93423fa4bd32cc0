//! Record mode definitions

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Controls how a cassette arbitrates between recording and playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    /// Playback only; a request without a recorded match fails
    None,
    /// Play back existing episodes, record new ones
    NewEpisodes,
    /// Always record, replacing previously matching episodes
    All,
    /// Record while the cassette is empty, then playback only
    Once,
}

impl RecordMode {
    /// The mode used when none is specified
    ///
    /// `NewEpisodes`, unless the `CI` environment variable is set to a
    /// non-empty value, in which case `None` so CI never hits the network.
    #[must_use]
    pub fn default_mode() -> Self {
        match std::env::var("CI") {
            Ok(value) if !value.is_empty() => Self::None,
            _ => Self::NewEpisodes,
        }
    }

    /// Wire name of this mode (`none`, `new_episodes`, `all`, `once`)
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::NewEpisodes => "new_episodes",
            Self::All => "all",
            Self::Once => "once",
        }
    }
}

impl std::fmt::Display for RecordMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown record mode string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRecordMode(pub String);

impl std::fmt::Display for InvalidRecordMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid record mode '{}' (expected none, new_episodes, all, or once)",
            self.0
        )
    }
}

impl std::error::Error for InvalidRecordMode {}

impl FromStr for RecordMode {
    type Err = InvalidRecordMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "new_episodes" => Ok(Self::NewEpisodes),
            "all" => Ok(Self::All),
            "once" => Ok(Self::Once),
            other => Err(InvalidRecordMode(other.to_string())),
        }
    }
}
