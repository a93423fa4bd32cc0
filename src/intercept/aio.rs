//! Cooperative call-shape handlers
//!
//! Mirrors the blocking handlers with suspension points at every transport
//! boundary: awaiting the forwarded response, awaiting each live stream
//! message, and draining trailing metadata all yield to the scheduler.

use futures_util::{Stream, StreamExt};
use tracing::debug;

use crate::call::{AsyncStreamingCall, AsyncUnaryCall};
use crate::cassette::episode::{
    Episode, EpisodeResponse, RequestRecord, RpcType, StreamingResponseRecord,
};
use crate::cassette::Cassette;
use crate::message::Message;
use crate::metadata::Metadata;
use crate::record_mode::RecordMode;
use crate::transport::{AsyncMessageStream, AsyncTransport};
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
pub async fn unary<T, Req, Resp>(
    cassette: &Cassette,
    transport: &T,
    method: &str,
    request: &Req,
    metadata: Metadata,
) -> Result<AsyncUnaryCall<Resp>>
where
    T: AsyncTransport + ?Sized,
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
    let exchange = transport.unary(method, &request_bytes, &record.metadata).await;
    let response = unary_response_record(&exchange);

    cassette.record(Episode {
        request: record,
        response: EpisodeResponse::Unary(response.clone()),
        rpc_type: RpcType::Unary,
    });

    AsyncUnaryCall::from_record(&response)
}

/// Handle a unary/stream (server-streaming) call
///
/// The live stream is consumed to completion while recording, one await per
/// message, so the returned fake call can still be iterated by the caller.
///
/// # Errors
///
/// As [`unary`].
pub async fn server_streaming<T, Req, Resp>(
    cassette: &Cassette,
    transport: &T,
    method: &str,
    request: &Req,
    metadata: Metadata,
) -> Result<AsyncStreamingCall<Resp>>
where
    T: AsyncTransport + ?Sized,
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
    let stream = transport
        .server_streaming(method, &request_bytes, &record.metadata)
        .await;
    let response = drain_stream(stream).await;

    record_streaming(cassette, record, response, RpcType::ServerStreaming)
}

/// Handle a stream/unary (client-streaming) call
///
/// The outgoing message stream is drained first; the concatenation of the
/// serialized messages is the request identity used for matching.
///
/// # Errors
///
/// As [`unary`].
pub async fn client_streaming<T, Req, Resp>(
    cassette: &Cassette,
    transport: &T,
    method: &str,
    requests: impl Stream<Item = Req> + Send,
    metadata: Metadata,
) -> Result<AsyncUnaryCall<Resp>>
where
    T: AsyncTransport + ?Sized,
    Req: Message,
    Resp: Message,
{
    let (bodies, combined) = drain_requests(requests.collect::<Vec<_>>().await);
    let record = RequestRecord::from_wire(method, &combined, metadata);

    if cassette.record_mode() != RecordMode::All {
        if let Some(episode) = cassette.find(&record) {
            return replay_unary(&episode);
        }
    }
    gate_recording(cassette, method)?;

    debug!(method, messages = bodies.len(), "forwarding live client-streaming call");
    let exchange = transport
        .client_streaming(method, &bodies, &record.metadata)
        .await;
    let response = unary_response_record(&exchange);

    cassette.record(Episode {
        request: record,
        response: EpisodeResponse::Unary(response.clone()),
        rpc_type: RpcType::ClientStreaming,
    });

    AsyncUnaryCall::from_record(&response)
}

/// Handle a stream/stream (bidirectional) call
///
/// # Errors
///
/// As [`unary`].
pub async fn bidi_streaming<T, Req, Resp>(
    cassette: &Cassette,
    transport: &T,
    method: &str,
    requests: impl Stream<Item = Req> + Send,
    metadata: Metadata,
) -> Result<AsyncStreamingCall<Resp>>
where
    T: AsyncTransport + ?Sized,
    Req: Message,
    Resp: Message,
{
    let (bodies, combined) = drain_requests(requests.collect::<Vec<_>>().await);
    let record = RequestRecord::from_wire(method, &combined, metadata);

    if cassette.record_mode() != RecordMode::All {
        if let Some(episode) = cassette.find(&record) {
            return replay_streaming(&episode);
        }
    }
    gate_recording(cassette, method)?;

    debug!(method, messages = bodies.len(), "forwarding live bidi-streaming call");
    let stream = transport
        .bidi_streaming(method, &bodies, &record.metadata)
        .await;
    let response = drain_stream(stream).await;

    record_streaming(cassette, record, response, RpcType::BidiStreaming)
}

/// Consume a live response stream to its terminal state
///
/// Messages received before an error are kept. Each message is its own
/// await, so sibling tasks run while the live call is recorded.
async fn drain_stream(mut stream: Box<dyn AsyncMessageStream>) -> StreamTerminal {
    let mut messages = Vec::new();
    let failure = loop {
        match stream.next_message().await {
            Ok(Some(message)) => messages.push(message),
            Ok(None) => break None,
            Err(status) => break Some(status),
        }
    };
    let trailing = stream.trailing_metadata().await;
    StreamTerminal::new(messages, failure, trailing)
}

fn record_streaming<Resp: Message>(
    cassette: &Cassette,
    request: RequestRecord,
    terminal: StreamTerminal,
    rpc_type: RpcType,
) -> Result<AsyncStreamingCall<Resp>> {
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

    AsyncStreamingCall::from_record(&response)
}

fn replay_unary<Resp: Message>(episode: &Episode) -> Result<AsyncUnaryCall<Resp>> {
    match &episode.response {
        EpisodeResponse::Unary(record) => AsyncUnaryCall::from_record(record),
        EpisodeResponse::Streaming(_) => Err(mismatched_episode(episode)),
    }
}

fn replay_streaming<Resp: Message>(episode: &Episode) -> Result<AsyncStreamingCall<Resp>> {
    match &episode.response {
        EpisodeResponse::Streaming(record) => AsyncStreamingCall::from_record(record),
        EpisodeResponse::Unary(_) => Err(mismatched_episode(episode)),
    }
}
