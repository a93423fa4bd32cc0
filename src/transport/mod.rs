//! Transport abstraction over the real gRPC channel
//!
//! The crate never links a gRPC implementation. A caller hands the channel
//! wrappers a transport implementing one of these traits (or a connector
//! closure that builds one from dial settings); the interceptors forward
//! cache misses through it and observe the wire-level outcome.

use async_trait::async_trait;

use crate::metadata::Metadata;
use crate::status::RpcStatus;

/// Opaque dial settings passed through to the caller's connector
///
/// The core never interprets these; they exist so recording channels can be
/// constructed from the same `(target, credentials, options)` triple a real
/// channel builder takes.
#[derive(Debug, Clone, Default)]
pub struct DialOptions {
    /// Credential material for a secure channel, if any
    pub credentials: Option<Vec<u8>>,
    /// Channel option key/value pairs
    pub options: Vec<(String, String)>,
}

/// Terminal outcome of an exchange with a single response message
#[derive(Debug, Clone)]
pub struct UnaryExchange {
    /// The serialized response message, or the RPC failure
    pub result: Result<Vec<u8>, RpcStatus>,
    /// Trailing metadata observed with the outcome
    pub trailing_metadata: Metadata,
}

/// A live server-to-client message stream being observed
///
/// `next_message` returns `Ok(None)` at end of stream and `Err` on an RPC
/// failure; messages already yielded stay valid either way.
/// `trailing_metadata` is drained once the stream reaches a terminal state.
pub trait MessageStream: Send {
    /// Next serialized message, end of stream, or the RPC failure
    fn next_message(&mut self) -> Result<Option<Vec<u8>>, RpcStatus>;

    /// Trailing metadata, available after the terminal state
    fn trailing_metadata(&mut self) -> Metadata;
}

/// A blocking channel to a real gRPC server
pub trait BlockingTransport: Send + Sync {
    /// Single request, single response
    fn unary(&self, method: &str, request: &[u8], metadata: &Metadata) -> UnaryExchange;

    /// Single request, streamed response
    fn server_streaming(
        &self,
        method: &str,
        request: &[u8],
        metadata: &Metadata,
    ) -> Box<dyn MessageStream>;

    /// Streamed request (already drained by the interceptor), single response
    fn client_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        metadata: &Metadata,
    ) -> UnaryExchange;

    /// Streamed request, streamed response
    fn bidi_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        metadata: &Metadata,
    ) -> Box<dyn MessageStream>;
}

/// Async counterpart of [`MessageStream`]
///
/// Each call is a suspension point; awaiting the next message or the
/// trailing metadata lets other tasks run.
#[async_trait]
pub trait AsyncMessageStream: Send {
    /// Next serialized message, end of stream, or the RPC failure
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>, RpcStatus>;

    /// Trailing metadata, available after the terminal state
    async fn trailing_metadata(&mut self) -> Metadata;
}

impl<T: BlockingTransport + ?Sized> BlockingTransport for std::sync::Arc<T> {
    fn unary(&self, method: &str, request: &[u8], metadata: &Metadata) -> UnaryExchange {
        (**self).unary(method, request, metadata)
    }

    fn server_streaming(
        &self,
        method: &str,
        request: &[u8],
        metadata: &Metadata,
    ) -> Box<dyn MessageStream> {
        (**self).server_streaming(method, request, metadata)
    }

    fn client_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        metadata: &Metadata,
    ) -> UnaryExchange {
        (**self).client_streaming(method, requests, metadata)
    }

    fn bidi_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        metadata: &Metadata,
    ) -> Box<dyn MessageStream> {
        (**self).bidi_streaming(method, requests, metadata)
    }
}

/// An async channel to a real gRPC server
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    /// Single request, single response
    async fn unary(&self, method: &str, request: &[u8], metadata: &Metadata) -> UnaryExchange;

    /// Single request, streamed response
    async fn server_streaming(
        &self,
        method: &str,
        request: &[u8],
        metadata: &Metadata,
    ) -> Box<dyn AsyncMessageStream>;

    /// Streamed request (already drained by the interceptor), single response
    async fn client_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        metadata: &Metadata,
    ) -> UnaryExchange;

    /// Streamed request, streamed response
    async fn bidi_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        metadata: &Metadata,
    ) -> Box<dyn AsyncMessageStream>;
}

#[async_trait]
impl<T: AsyncTransport + ?Sized> AsyncTransport for std::sync::Arc<T> {
    async fn unary(&self, method: &str, request: &[u8], metadata: &Metadata) -> UnaryExchange {
        (**self).unary(method, request, metadata).await
    }

    async fn server_streaming(
        &self,
        method: &str,
        request: &[u8],
        metadata: &Metadata,
    ) -> Box<dyn AsyncMessageStream> {
        (**self).server_streaming(method, request, metadata).await
    }

    async fn client_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        metadata: &Metadata,
    ) -> UnaryExchange {
        (**self).client_streaming(method, requests, metadata).await
    }

    async fn bidi_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        metadata: &Metadata,
    ) -> Box<dyn AsyncMessageStream> {
        (**self).bidi_streaming(method, requests, metadata).await
    }
}
