//! Blocking recording channel

use std::sync::Arc;

use tracing::error;

use crate::call::{StreamingCall, UnaryCall};
use crate::cassette::Cassette;
use crate::intercept::blocking as intercept;
use crate::message::Message;
use crate::metadata::Metadata;
use crate::transport::{BlockingTransport, DialOptions};
use crate::Result;

/// A blocking gRPC channel that records and plays back interactions
///
/// The wrapper is the channel: stubs issue calls through the four
/// call-shape methods, each of which consults the cassette before touching
/// the real transport. Dropping the channel saves the cassette on every
/// exit path; use [`RecordingChannel::close`] where a save failure must be
/// observed.
pub struct RecordingChannel<T: BlockingTransport> {
    cassette: Arc<Cassette>,
    transport: T,
    closed: bool,
}

impl<T: BlockingTransport> RecordingChannel<T> {
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
    /// See [`intercept::unary`](crate::intercept::blocking::unary).
    pub fn unary<Req, Resp>(
        &self,
        method: &str,
        request: &Req,
        metadata: Metadata,
    ) -> Result<UnaryCall<Resp>>
    where
        Req: Message,
        Resp: Message,
    {
        intercept::unary(&self.cassette, &self.transport, method, request, metadata)
    }

    /// Issue a unary/stream (server-streaming) call
    ///
    /// # Errors
    ///
    /// See [`intercept::server_streaming`](crate::intercept::blocking::server_streaming).
    pub fn server_streaming<Req, Resp>(
        &self,
        method: &str,
        request: &Req,
        metadata: Metadata,
    ) -> Result<StreamingCall<Resp>>
    where
        Req: Message,
        Resp: Message,
    {
        intercept::server_streaming(&self.cassette, &self.transport, method, request, metadata)
    }

    /// Issue a stream/unary (client-streaming) call
    ///
    /// # Errors
    ///
    /// See [`intercept::client_streaming`](crate::intercept::blocking::client_streaming).
    pub fn client_streaming<Req, Resp>(
        &self,
        method: &str,
        requests: impl IntoIterator<Item = Req>,
        metadata: Metadata,
    ) -> Result<UnaryCall<Resp>>
    where
        Req: Message,
        Resp: Message,
    {
        intercept::client_streaming(&self.cassette, &self.transport, method, requests, metadata)
    }

    /// Issue a stream/stream (bidirectional) call
    ///
    /// # Errors
    ///
    /// See [`intercept::bidi_streaming`](crate::intercept::blocking::bidi_streaming).
    pub fn bidi_streaming<Req, Resp>(
        &self,
        method: &str,
        requests: impl IntoIterator<Item = Req>,
        metadata: Metadata,
    ) -> Result<StreamingCall<Resp>>
    where
        Req: Message,
        Resp: Message,
    {
        intercept::bidi_streaming(&self.cassette, &self.transport, method, requests, metadata)
    }

    /// Close the channel and save the cassette
    ///
    /// Saving a clean cassette is a no-op, so closing an untouched channel
    /// never rewrites the file.
    ///
    /// # Errors
    ///
    /// Returns the cassette save failure.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.cassette.save()
    }
}

impl<T: BlockingTransport> Drop for RecordingChannel<T> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.cassette.save() {
                error!(error = %e, path = %self.cassette.path().display(),
                    "failed to save cassette while dropping channel");
            }
        }
    }
}
