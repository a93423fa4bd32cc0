//! User-facing channel wrappers composing a transport, the interceptor
//! stack, and a cassette

mod aio;
mod blocking;

pub use aio::AsyncRecordingChannel;
pub use blocking::RecordingChannel;
