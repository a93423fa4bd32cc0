//! Call-shape handlers wiring live calls, the cassette, and fake calls
//!
//! One handler per gRPC call shape per execution model. Every handler
//! follows the same skeleton: build a request record, consult the cassette
//! (skipped in `all` mode), fail the call when recording is unavailable,
//! otherwise forward to the real transport, observe the exchange to its
//! terminal state, append the episode, and hand the caller a fake call
//! that replays the just-recorded data.

pub mod aio;
pub mod blocking;

use crate::cassette::episode::{Episode, ResponseRecord};
use crate::cassette::Cassette;
use crate::error::TapeError;
use crate::message::Message;
use crate::metadata::Metadata;
use crate::status::{RpcStatus, StatusCode};
use crate::transport::UnaryExchange;
use crate::Result;

/// Serialize an outgoing message sequence, returning the per-message bodies
/// and their concatenation
///
/// The concatenation is the request identity of client-streamed calls: it
/// is what gets matched against recorded episodes.
pub(crate) fn drain_requests<Req: Message>(
    requests: impl IntoIterator<Item = Req>,
) -> (Vec<Vec<u8>>, Vec<u8>) {
    let bodies: Vec<Vec<u8>> = requests.into_iter().map(|r| r.to_bytes()).collect();
    let combined = bodies.concat();
    (bodies, combined)
}

/// Turn an observed unary exchange into a response record
pub(crate) fn unary_response_record(exchange: &UnaryExchange) -> ResponseRecord {
    match &exchange.result {
        Ok(body) => ResponseRecord::ok(body, exchange.trailing_metadata.clone()),
        Err(status) => ResponseRecord {
            body: String::new(),
            code: status.code,
            details: status.details.clone(),
            trailing_metadata: exchange.trailing_metadata.clone(),
        },
    }
}

/// Terminal state of a drained response stream
pub(crate) struct StreamTerminal {
    pub messages: Vec<Vec<u8>>,
    pub code: StatusCode,
    pub details: Option<String>,
    pub trailing_metadata: Metadata,
}

impl StreamTerminal {
    pub(crate) fn new(messages: Vec<Vec<u8>>, failure: Option<RpcStatus>, trailing: Metadata) -> Self {
        match failure {
            Some(status) => Self {
                messages,
                code: status.code,
                details: status.details,
                trailing_metadata: trailing,
            },
            None => Self {
                messages,
                code: StatusCode::Ok,
                details: None,
                trailing_metadata: trailing,
            },
        }
    }
}

/// Fail the call when the cassette cannot accept a new episode
pub(crate) fn gate_recording(cassette: &Cassette, method: &str) -> Result<()> {
    if cassette.replay_only() {
        return Err(TapeError::RecordingDisabled {
            method: method.to_string(),
        });
    }
    Ok(())
}

/// A matched episode whose response variant does not fit the call shape
pub(crate) fn mismatched_episode(episode: &Episode) -> TapeError {
    TapeError::SerializationFailure {
        message: format!(
            "recorded episode for {} has the wrong response variant for this call shape",
            episode.method()
        ),
        source: None,
    }
}
