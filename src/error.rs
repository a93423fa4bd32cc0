//! Error types for grpctape

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for grpctape operations
pub type Result<T> = std::result::Result<T, TapeError>;

/// Errors that can occur while recording or replaying cassettes
///
/// Transport-level gRPC failures are not errors of this crate; they are
/// recorded into episodes and replayed as [`RpcStatus`](crate::RpcStatus)
/// values.
#[derive(Debug, Error)]
pub enum TapeError {
    /// Cassette file missing while the record mode forbids recording
    #[error("cassette not found: {path}")]
    CassetteNotFound {
        /// Path to the missing cassette file
        path: PathBuf,
    },

    /// No recorded episode matched the live request
    #[error("no matching interaction for {method} (available: {available_methods:?})")]
    NoMatchingInteraction {
        /// Full gRPC method path of the live request
        method: String,
        /// Serialized request bytes that failed to match
        body: Vec<u8>,
        /// Method paths of the episodes currently in the cassette
        available_methods: Vec<String>,
    },

    /// Recording disabled and the live request has no recorded match
    #[error("recording disabled but no matching interaction for: {method}")]
    RecordingDisabled {
        /// Full gRPC method path of the live request
        method: String,
    },

    /// Cassette could not be written to disk
    #[error("failed to write cassette {path}")]
    CassetteWriteFailure {
        /// Path where the cassette was being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Cassette document could not be parsed or emitted
    #[error("{message}")]
    SerializationFailure {
        /// What failed
        message: String,
        /// Underlying codec error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TapeError {
    /// Build a [`TapeError::SerializationFailure`] wrapping a codec error
    pub(crate) fn serialization(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SerializationFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
