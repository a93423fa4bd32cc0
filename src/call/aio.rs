//! Cooperative fake calls
//!
//! Playback suspends where a real async call would: awaiting the unary
//! result yields to the scheduler once before resolving, and the streaming
//! fake yields between consecutive messages so sibling tasks make progress
//! during replay.

use std::collections::VecDeque;
use std::future::{Future, IntoFuture};
use std::pin::Pin;

use futures_util::Stream;

use crate::cassette::episode::{ResponseRecord, StreamingResponseRecord};
use crate::message::Message;
use crate::metadata::Metadata;
use crate::status::{RpcStatus, StatusCode};

use super::decode_message;

/// A completed unary call replayed from recorded data (async)
///
/// Awaiting the call resolves to the recorded message or the recorded RPC
/// failure.
#[derive(Debug)]
pub struct AsyncUnaryCall<T> {
    outcome: Result<T, RpcStatus>,
    trailing_metadata: Metadata,
}

impl<T: Message> AsyncUnaryCall<T> {
    pub(crate) fn from_record(record: &ResponseRecord) -> crate::Result<Self> {
        let outcome = if record.code == StatusCode::Ok {
            Ok(decode_message(&record.body_bytes()?)?)
        } else {
            Err(record.rpc_status())
        };
        Ok(Self {
            outcome,
            trailing_metadata: record.trailing_metadata.clone(),
        })
    }
}

impl<T> AsyncUnaryCall<T> {
    /// Status code of the recorded outcome
    #[must_use]
    pub fn code(&self) -> StatusCode {
        match &self.outcome {
            Ok(_) => StatusCode::Ok,
            Err(status) => status.code,
        }
    }

    /// Error details of the recorded outcome, if any
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        match &self.outcome {
            Ok(_) => None,
            Err(status) => status.details.as_deref(),
        }
    }

    /// Trailing metadata of the recorded outcome
    #[must_use]
    pub fn trailing_metadata(&self) -> &Metadata {
        &self.trailing_metadata
    }

    /// Initial metadata; always empty on replay
    #[must_use]
    pub fn initial_metadata(&self) -> Metadata {
        Metadata::new()
    }

    /// A replayed call is never cancelled
    #[must_use]
    pub fn cancelled(&self) -> bool {
        false
    }

    /// A replayed call is already complete
    #[must_use]
    pub fn done(&self) -> bool {
        true
    }

    /// Register a completion callback; fires immediately
    pub fn on_done(&self, callback: impl FnOnce(&Self)) {
        callback(self);
    }
}

impl<T: Send + 'static> IntoFuture for AsyncUnaryCall<T> {
    type Output = Result<T, RpcStatus>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            // Suspension point before the first read of the response.
            tokio::task::yield_now().await;
            self.outcome
        })
    }
}

/// A completed streaming call replayed from recorded data (async)
#[derive(Debug)]
pub struct AsyncStreamingCall<T> {
    messages: VecDeque<T>,
    code: StatusCode,
    details: Option<String>,
    trailing_metadata: Metadata,
    error_raised: bool,
}

impl<T: Message> AsyncStreamingCall<T> {
    pub(crate) fn from_record(record: &StreamingResponseRecord) -> crate::Result<Self> {
        let messages = record
            .message_bytes()?
            .iter()
            .map(|bytes| decode_message(bytes))
            .collect::<crate::Result<VecDeque<T>>>()?;
        Ok(Self {
            messages,
            code: record.code,
            details: record.details.clone(),
            trailing_metadata: record.trailing_metadata.clone(),
            error_raised: false,
        })
    }
}

impl<T> AsyncStreamingCall<T> {
    fn rpc_status(&self) -> RpcStatus {
        RpcStatus {
            code: self.code,
            details: self.details.clone(),
            trailing_metadata: self.trailing_metadata.clone(),
        }
    }

    /// Next recorded message in wire order
    ///
    /// Yields to the scheduler before producing each item. Returns
    /// `Ok(None)` after the stream ends cleanly.
    ///
    /// # Errors
    ///
    /// After the last message of a non-OK episode, returns the replayed
    /// [`RpcStatus`] once; further calls return `Ok(None)`.
    pub async fn message(&mut self) -> Result<Option<T>, RpcStatus> {
        tokio::task::yield_now().await;
        if let Some(message) = self.messages.pop_front() {
            return Ok(Some(message));
        }
        if self.code != StatusCode::Ok && !self.error_raised {
            self.error_raised = true;
            return Err(self.rpc_status());
        }
        Ok(None)
    }

    /// Adapt into a [`Stream`] of message results
    pub fn into_stream(self) -> impl Stream<Item = Result<T, RpcStatus>> + Send
    where
        T: Send + 'static,
    {
        futures_util::stream::unfold(self, |mut call| async move {
            match call.message().await {
                Ok(Some(message)) => Some((Ok(message), call)),
                Ok(None) => None,
                Err(status) => Some((Err(status), call)),
            }
        })
    }

    /// Status code of the recorded outcome
    #[must_use]
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// Error details of the recorded outcome, if any
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Trailing metadata of the recorded outcome
    #[must_use]
    pub fn trailing_metadata(&self) -> &Metadata {
        &self.trailing_metadata
    }

    /// Initial metadata; always empty on replay
    #[must_use]
    pub fn initial_metadata(&self) -> Metadata {
        Metadata::new()
    }

    /// A replayed call is never cancelled
    #[must_use]
    pub fn cancelled(&self) -> bool {
        false
    }

    /// A replayed call is already complete
    #[must_use]
    pub fn done(&self) -> bool {
        true
    }

    /// Register a completion callback; fires immediately
    pub fn on_done(&self, callback: impl FnOnce(&Self)) {
        callback(self);
    }
}
