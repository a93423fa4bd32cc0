//! The message capability the core requires from callers
//!
//! The crate never inspects message schemas. It only needs each message
//! type to serialize itself to the bytes the transport would send and to
//! rebuild itself from recorded bytes. Protobuf code generators emit
//! exactly this surface; hand-written adapters work just as well in tests.

/// A request or response message handle
pub trait Message: Sized + Send + 'static {
    /// Serialize to the transport byte representation
    fn to_bytes(&self) -> Vec<u8>;

    /// Rebuild a message from recorded bytes
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the bytes do not describe a valid
    /// message of this type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError>;
}

/// Failure to decode recorded bytes into a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(String);

impl DecodeError {
    /// Describe what failed to decode
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to decode message: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}
