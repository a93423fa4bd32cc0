//! gRPC status codes and the RPC failure value replayed to callers

use serde::{Deserialize, Serialize};

use crate::metadata::Metadata;

/// Canonical gRPC status codes
///
/// Serialized by canonical name (`OK`, `NOT_FOUND`, ...) so cassettes stay
/// reviewable in diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// Call completed successfully
    Ok,
    /// Operation cancelled by the caller
    Cancelled,
    /// Unknown error
    Unknown,
    /// Client supplied an invalid argument
    InvalidArgument,
    /// Deadline expired before the operation completed
    DeadlineExceeded,
    /// Requested entity not found
    NotFound,
    /// Entity already exists
    AlreadyExists,
    /// Caller lacks permission
    PermissionDenied,
    /// Resource quota or rate limit exhausted
    ResourceExhausted,
    /// System not in a state required for the operation
    FailedPrecondition,
    /// Operation aborted, typically a concurrency conflict
    Aborted,
    /// Operation attempted past the valid range
    OutOfRange,
    /// Operation not implemented by the server
    Unimplemented,
    /// Internal server error
    Internal,
    /// Service unavailable, usually transient
    Unavailable,
    /// Unrecoverable data loss or corruption
    DataLoss,
    /// Request lacks valid authentication credentials
    Unauthenticated,
}

impl StatusCode {
    /// Canonical name of this code (e.g. `NOT_FOUND`)
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
        }
    }

    /// Look up a code by canonical name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "OK" => Self::Ok,
            "CANCELLED" => Self::Cancelled,
            "UNKNOWN" => Self::Unknown,
            "INVALID_ARGUMENT" => Self::InvalidArgument,
            "DEADLINE_EXCEEDED" => Self::DeadlineExceeded,
            "NOT_FOUND" => Self::NotFound,
            "ALREADY_EXISTS" => Self::AlreadyExists,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "RESOURCE_EXHAUSTED" => Self::ResourceExhausted,
            "FAILED_PRECONDITION" => Self::FailedPrecondition,
            "ABORTED" => Self::Aborted,
            "OUT_OF_RANGE" => Self::OutOfRange,
            "UNIMPLEMENTED" => Self::Unimplemented,
            "INTERNAL" => Self::Internal,
            "UNAVAILABLE" => Self::Unavailable,
            "DATA_LOSS" => Self::DataLoss,
            "UNAUTHENTICATED" => Self::Unauthenticated,
            _ => return None,
        })
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A terminal gRPC failure, as observed on the wire or replayed from a cassette
///
/// This is the error value surfaced by fake calls; it is deliberately not a
/// [`TapeError`](crate::TapeError) because a recorded server failure is a
/// successful replay.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcStatus {
    /// Status code of the failure
    pub code: StatusCode,
    /// Human-readable detail message, if the server supplied one
    pub details: Option<String>,
    /// Trailing metadata attached to the failure
    pub trailing_metadata: Metadata,
}

impl RpcStatus {
    /// Create a status with no trailing metadata
    #[must_use]
    pub fn new(code: StatusCode, details: Option<String>) -> Self {
        Self {
            code,
            details,
            trailing_metadata: Metadata::new(),
        }
    }

    /// Attach trailing metadata
    #[must_use]
    pub fn with_trailing_metadata(mut self, trailing_metadata: Metadata) -> Self {
        self.trailing_metadata = trailing_metadata;
        self
    }
}

impl std::fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rpc failed with {}", self.code)?;
        if let Some(details) = &self.details {
            write!(f, ": {details}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcStatus {}
