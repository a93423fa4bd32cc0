//! Synthesized call objects returned during playback
//!
//! These reproduce the observable surface of a real client call from
//! recorded data: results, status, details, and trailing metadata are
//! identical to what the live call produced, so stub-level code runs
//! unmodified against a cassette.

mod aio;
mod blocking;

pub use aio::{AsyncStreamingCall, AsyncUnaryCall};
pub use blocking::{StreamingCall, UnaryCall};

use crate::error::TapeError;
use crate::message::Message;

/// Decode one recorded message body with the caller's response type
pub(crate) fn decode_message<T: Message>(bytes: &[u8]) -> crate::Result<T> {
    T::from_bytes(bytes)
        .map_err(|e| TapeError::serialization("failed to decode recorded message", e))
}
