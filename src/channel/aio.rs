//! Cooperative recording channel

use std::sync::Arc;

use futures_util::Stream;
use tracing::error;

use crate::call::{AsyncStreamingCall, AsyncUnaryCall};
use crate::cassette::Cassette;
use crate::intercept::aio as intercept;
use crate::message::Message;
use crate::metadata::Metadata;
use crate::transport::{AsyncTransport, DialOptions};
use crate::Result;

/// An async gRPC channel that records and plays back interactions
///
/// Async counterpart of [`RecordingChannel`](crate::RecordingChannel):
/// calls suspend at transport boundaries, and streaming playback yields to
/// sibling tasks between messages. Dropping the channel saves the cassette
/// on every exit path; use [`AsyncRecordingChannel::close`] where a save
/// failure must be observed.
pub struct AsyncRecordingChannel<T: AsyncTransport> {
    cassette: Arc<Cassette>,
    transport: T,
    closed: bool,
}

impl<T: AsyncTransport> AsyncRecordingChannel<T> {
    /// Wrap an already-built transport
    #[must_use]
    pub fn new(cassette: Arc<Cassette>, transport: T) -> Self {
        Self {
            cassette,
            transport,
            closed: false,
        }
    }

    /// Build the transport from dial settings and wrap it
    ///
    /// `connect` receives the target address and the opaque
    /// [`DialOptions`] (credentials, channel options) untouched.
    ///
    /// # Errors
    ///
    /// Propagates the connector's error.
    pub fn connect<F>(
        cassette: Arc<Cassette>,
        target: &str,
        options: &DialOptions,
        connect: F,
    ) -> Result<Self>
    where
        F: FnOnce(&str, &DialOptions) -> Result<T>,
    {
        Ok(Self::new(cassette, connect(target, options)?))
    }

    /// The cassette backing this channel
    #[must_use]
    pub fn cassette(&self) -> &Arc<Cassette> {
        &self.cassette
    }

    /// Issue a unary/unary call
    ///
    /// # Errors
    ///
    /// See [`intercept::unary`](crate::intercept::aio::unary).
    pub async fn unary<Req, Resp>(
        &self,
        method: &str,
        request: &Req,
        metadata: Metadata,
    ) -> Result<AsyncUnaryCall<Resp>>
    where
        Req: Message,
        Resp: Message,
    {
        intercept::unary(&self.cassette, &self.transport, method, request, metadata).await
    }

    /// Issue a unary/stream (server-streaming) call
    ///
    /// # Errors
    ///
    /// See [`intercept::server_streaming`](crate::intercept::aio::server_streaming).
    pub async fn server_streaming<Req, Resp>(
        &self,
        method: &str,
        request: &Req,
        metadata: Metadata,
    ) -> Result<AsyncStreamingCall<Resp>>
    where
        Req: Message,
        Resp: Message,
    {
        intercept::server_streaming(&self.cassette, &self.transport, method, request, metadata)
            .await
    }

    /// Issue a stream/unary (client-streaming) call
    ///
    /// # Errors
    ///
    /// See [`intercept::client_streaming`](crate::intercept::aio::client_streaming).
    pub async fn client_streaming<Req, Resp>(
        &self,
        method: &str,
        requests: impl Stream<Item = Req> + Send,
        metadata: Metadata,
    ) -> Result<AsyncUnaryCall<Resp>>
    where
        Req: Message,
        Resp: Message,
    {
        intercept::client_streaming(&self.cassette, &self.transport, method, requests, metadata)
            .await
    }

    /// Issue a stream/stream (bidirectional) call
    ///
    /// # Errors
    ///
    /// See [`intercept::bidi_streaming`](crate::intercept::aio::bidi_streaming).
    pub async fn bidi_streaming<Req, Resp>(
        &self,
        method: &str,
        requests: impl Stream<Item = Req> + Send,
        metadata: Metadata,
    ) -> Result<AsyncStreamingCall<Resp>>
    where
        Req: Message,
        Resp: Message,
    {
        intercept::bidi_streaming(&self.cassette, &self.transport, method, requests, metadata)
            .await
    }

    /// Close the channel and save the cassette
    ///
    /// Saving a clean cassette is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the cassette save failure.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.cassette.save()
    }
}

impl<T: AsyncTransport> Drop for AsyncRecordingChannel<T> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.cassette.save() {
                error!(error = %e, path = %self.cassette.path().display(),
                    "failed to save cassette while dropping channel");
            }
        }
    }
}
