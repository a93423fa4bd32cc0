//! Blocking fake calls

use std::collections::VecDeque;

use crate::cassette::episode::{ResponseRecord, StreamingResponseRecord};
use crate::message::Message;
use crate::metadata::Metadata;
use crate::status::{RpcStatus, StatusCode};

use super::decode_message;

/// A completed unary call replayed from recorded data
///
/// Blocking for the result returns the recorded message, or the recorded
/// RPC failure when the episode ended with a non-OK status.
#[derive(Debug)]
pub struct UnaryCall<T> {
    outcome: Result<T, RpcStatus>,
    trailing_metadata: Metadata,
}

impl<T: Message> UnaryCall<T> {
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

impl<T> UnaryCall<T> {
    /// The recorded result, or the recorded RPC failure
    ///
    /// # Errors
    ///
    /// Returns the replayed [`RpcStatus`] when the call did not end OK.
    pub fn into_result(self) -> Result<T, RpcStatus> {
        self.outcome
    }

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

/// A completed streaming call replayed from recorded data
///
/// Iteration yields each recorded message in wire order; after the last
/// message a non-OK episode yields its RPC failure once, then the iterator
/// is exhausted.
#[derive(Debug)]
pub struct StreamingCall<T> {
    messages: VecDeque<T>,
    code: StatusCode,
    details: Option<String>,
    trailing_metadata: Metadata,
    error_raised: bool,
}

impl<T: Message> StreamingCall<T> {
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

impl<T> StreamingCall<T> {
    fn rpc_status(&self) -> RpcStatus {
        RpcStatus {
            code: self.code,
            details: self.details.clone(),
            trailing_metadata: self.trailing_metadata.clone(),
        }
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

impl<T> Iterator for StreamingCall<T> {
    type Item = Result<T, RpcStatus>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(message) = self.messages.pop_front() {
            return Some(Ok(message));
        }
        if self.code != StatusCode::Ok && !self.error_raised {
            self.error_raised = true;
            return Some(Err(self.rpc_status()));
        }
        None
    }
}
