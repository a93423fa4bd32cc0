//! Grpctape - Record and replay client-side gRPC interactions
//!
//! Wraps a gRPC channel so test suites run against a cassette file instead
//! of a live server: cache misses forward to the real transport and append
//! the observed exchange; hits synthesize call objects whose results,
//! status, and trailing metadata match the recording exactly.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::multiple_crate_versions
)]

pub mod call;
pub mod cassette;
pub mod channel;
pub mod error;
pub mod intercept;
pub mod matchers;
pub mod message;
pub mod metadata;
pub mod record_mode;
pub mod status;
pub mod transport;

pub use call::{AsyncStreamingCall, AsyncUnaryCall, StreamingCall, UnaryCall};
pub use cassette::{
    Cassette, CassetteData, Episode, EpisodeResponse, RequestRecord, ResponseRecord, RpcType,
    StreamingResponseRecord,
};
pub use channel::{AsyncRecordingChannel, RecordingChannel};
pub use error::{Result, TapeError};
pub use matchers::{
    default_matcher, AllMatcher, CustomMatcher, Matcher, MatcherExt, MetadataMatcher,
    MethodMatcher, RequestMatcher,
};
pub use message::{DecodeError, Message};
pub use metadata::Metadata;
pub use record_mode::{InvalidRecordMode, RecordMode};
pub use status::{RpcStatus, StatusCode};
pub use transport::{
    AsyncMessageStream, AsyncTransport, BlockingTransport, DialOptions, MessageStream,
    UnaryExchange,
};
