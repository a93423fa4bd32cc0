//! Blocking call-shape handlers

use tracing::debug;

use crate::call::{StreamingCall, UnaryCall};
use crate::cassette::episode::{
    Episode, EpisodeResponse, RequestRecord, RpcType, StreamingResponseRecord,
};
use crate::cassette::Cassette;
use crate::message::Message;
use crate::metadata::Metadata;
use crate::record_mode::RecordMode;
use crate::transport::{BlockingTransport, MessageStream};
use crate::Result;

use super::{
    drain_requests, gate_recording, mismatched_episode, unary_response_record, StreamTerminal,
};

/// Handle a unary/unary call
///
/// # Errors
///
/// Returns [`RecordingDisabled`](crate::TapeError::RecordingDisabled) on a
/// miss when the cassette is playback-only, and
/// [`SerializationFailure`](crate::TapeError::SerializationFailure) when
/// recorded data cannot be decoded.
pub fn unary<T, Req, Resp>(
    cassette: &Cassette,
    transport: &T,
    method: &str,
    request: &Req,
    metadata: Metadata,
) -> Result<UnaryCall<Resp>>
where
    T: BlockingTransport + ?Sized,
    Req: Message,
    Resp: Message,
{
    let request_bytes = request.to_bytes();
    let record = RequestRecord::from_wire(method, &request_bytes, metadata);

    if cassette.record_mode() != RecordMode::All {
        if let Some(episode) = cassette.find(&record) {
            return replay_unary(&episode);
        }
    }
    gate_recording(cassette, method)?;

    debug!(method, "forwarding live unary call");
    let exchange = transport.unary(method, &request_bytes, &record.metadata);
    let response = unary_response_record(&exchange);

    cassette.record(Episode {
        request: record,
        response: EpisodeResponse::Unary(response.clone()),
        rpc_type: RpcType::Unary,
    });

    UnaryCall::from_record(&response)
}

/// Handle a unary/stream (server-streaming) call
///
/// The live response stream is consumed to completion while recording, so
/// the returned fake call can still be iterated by the caller.
///
/// # Errors
///
/// As [`unary`].
pub fn server_streaming<T, Req, Resp>(
    cassette: &Cassette,
    transport: &T,
    method: &str,
    request: &Req,
    metadata: Metadata,
) -> Result<StreamingCall<Resp>>
where
    T: BlockingTransport + ?Sized,
    Req: Message,
    Resp: Message,
{
    let request_bytes = request.to_bytes();
    let record = RequestRecord::from_wire(method, &request_bytes, metadata);

    if cassette.record_mode() != RecordMode::All {
        if let Some(episode) = cassette.find(&record) {
            return replay_streaming(&episode);
        }
    }
    gate_recording(cassette, method)?;

    debug!(method, "forwarding live server-streaming call");
    let stream = transport.server_streaming(method, &request_bytes, &record.metadata);
    let response = drain_stream(stream);

    record_streaming(cassette, record, response, RpcType::ServerStreaming)
}

/// Handle a stream/unary (client-streaming) call
///
/// The outgoing message sequence is drained first; the concatenation of the
/// serialized messages is the request identity used for matching.
///
/// # Errors
///
/// As [`unary`].
pub fn client_streaming<T, Req, Resp>(
    cassette: &Cassette,
    transport: &T,
    method: &str,
    requests: impl IntoIterator<Item = Req>,
    metadata: Metadata,
) -> Result<UnaryCall<Resp>>
where
    T: BlockingTransport + ?Sized,
    Req: Message,
    Resp: Message,
{
    let (bodies, combined) = drain_requests(requests);
    let record = RequestRecord::from_wire(method, &combined, metadata);

    if cassette.record_mode() != RecordMode::All {
        if let Some(episode) = cassette.find(&record) {
            return replay_unary(&episode);
        }
    }
    gate_recording(cassette, method)?;

    debug!(method, messages = bodies.len(), "forwarding live client-streaming call");
    let exchange = transport.client_streaming(method, &bodies, &record.metadata);
    let response = unary_response_record(&exchange);

    cassette.record(Episode {
        request: record,
        response: EpisodeResponse::Unary(response.clone()),
        rpc_type: RpcType::ClientStreaming,
    });

    UnaryCall::from_record(&response)
}

/// Handle a stream/stream (bidirectional) call
///
/// # Errors
///
/// As [`unary`].
pub fn bidi_streaming<T, Req, Resp>(
    cassette: &Cassette,
    transport: &T,
    method: &str,
    requests: impl IntoIterator<Item = Req>,
    metadata: Metadata,
) -> Result<StreamingCall<Resp>>
where
    T: BlockingTransport + ?Sized,
    Req: Message,
    Resp: Message,
{
    let (bodies, combined) = drain_requests(requests);
    let record = RequestRecord::from_wire(method, &combined, metadata);

    if cassette.record_mode() != RecordMode::All {
        if let Some(episode) = cassette.find(&record) {
            return replay_streaming(&episode);
        }
    }
    gate_recording(cassette, method)?;

    debug!(method, messages = bodies.len(), "forwarding live bidi-streaming call");
    let stream = transport.bidi_streaming(method, &bodies, &record.metadata);
    let response = drain_stream(stream);

    record_streaming(cassette, record, response, RpcType::BidiStreaming)
}

/// Consume a live response stream to its terminal state
///
/// Messages received before an error are kept; the terminal status and
/// trailing metadata are captured once the stream ends.
fn drain_stream(mut stream: Box<dyn MessageStream>) -> StreamTerminal {
    let mut messages = Vec::new();
    let failure = loop {
        match stream.next_message() {
            Ok(Some(message)) => messages.push(message),
            Ok(None) => break None,
            Err(status) => break Some(status),
        }
    };
    let trailing = stream.trailing_metadata();
    StreamTerminal::new(messages, failure, trailing)
}

fn record_streaming<Resp: Message>(
    cassette: &Cassette,
    request: RequestRecord,
    terminal: StreamTerminal,
    rpc_type: RpcType,
) -> Result<StreamingCall<Resp>> {
    let response = StreamingResponseRecord::from_wire(
        &terminal.messages,
        terminal.code,
        terminal.details,
        terminal.trailing_metadata,
    );

    cassette.record(Episode {
        request,
        response: EpisodeResponse::Streaming(response.clone()),
        rpc_type,
    });

    StreamingCall::from_record(&response)
}

fn replay_unary<Resp: Message>(episode: &Episode) -> Result<UnaryCall<Resp>> {
    match &episode.response {
        EpisodeResponse::Unary(record) => UnaryCall::from_record(record),
        EpisodeResponse::Streaming(_) => Err(mismatched_episode(episode)),
    }
}

fn replay_streaming<Resp: Message>(episode: &Episode) -> Result<StreamingCall<Resp>> {
    match &episode.response {
        EpisodeResponse::Streaming(record) => StreamingCall::from_record(record),
        EpisodeResponse::Unary(_) => Err(mismatched_episode(episode)),
    }
}
