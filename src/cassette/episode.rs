//! Episode model: the recorded request/response pairs a cassette stores

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TapeError;
use crate::metadata::Metadata;
use crate::status::{RpcStatus, StatusCode};

/// One recorded request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Full gRPC method path (`/package.Service/Method`)
    pub method: String,
    /// Base64 of the serialized request payload
    ///
    /// For client-streamed calls this is the concatenation of every
    /// serialized message in send order.
    #[serde(default, deserialize_with = "nullable_string")]
    pub body: String,
    /// Request metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl RequestRecord {
    /// Build a record from the wire-level pieces of a live call
    #[must_use]
    pub fn from_wire(method: impl Into<String>, body: &[u8], metadata: Metadata) -> Self {
        Self {
            method: method.into(),
            body: BASE64.encode(body),
            metadata,
        }
    }

    /// Decode the body back to the raw payload bytes
    ///
    /// # Errors
    ///
    /// Returns [`TapeError::SerializationFailure`] if the stored text is not
    /// valid base64.
    pub fn body_bytes(&self) -> crate::Result<Vec<u8>> {
        decode_body(&self.body, &self.method)
    }
}

/// A recorded non-streaming outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Base64 of the response payload; empty when the status is not OK
    ///
    /// Required in the document (distinguishes the unary shape from the
    /// streaming one), though `null` is accepted and read as empty.
    #[serde(deserialize_with = "nullable_string")]
    pub body: String,
    /// Terminal status code
    pub code: StatusCode,
    /// Error detail string, absent on success
    #[serde(default)]
    pub details: Option<String>,
    /// Trailing metadata observed with the status
    #[serde(default)]
    pub trailing_metadata: Metadata,
}

impl ResponseRecord {
    /// Build a success record from a response payload
    #[must_use]
    pub fn ok(body: &[u8], trailing_metadata: Metadata) -> Self {
        Self {
            body: BASE64.encode(body),
            code: StatusCode::Ok,
            details: None,
            trailing_metadata,
        }
    }

    /// Build a failure record from an observed status
    #[must_use]
    pub fn failed(status: &RpcStatus) -> Self {
        Self {
            body: String::new(),
            code: status.code,
            details: status.details.clone(),
            trailing_metadata: status.trailing_metadata.clone(),
        }
    }

    /// Decode the body back to the raw payload bytes
    ///
    /// # Errors
    ///
    /// Returns [`TapeError::SerializationFailure`] if the stored text is not
    /// valid base64.
    pub fn body_bytes(&self) -> crate::Result<Vec<u8>> {
        decode_body(&self.body, "response")
    }

    /// The replayed status for a non-OK record
    #[must_use]
    pub fn rpc_status(&self) -> RpcStatus {
        RpcStatus {
            code: self.code,
            details: self.details.clone(),
            trailing_metadata: self.trailing_metadata.clone(),
        }
    }
}

/// A recorded streamed outcome
///
/// Messages received before a terminal error are preserved; replay yields
/// them all and raises the error afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingResponseRecord {
    /// Base64 message bodies in wire order
    ///
    /// Required in the document (distinguishes the streaming shape from the
    /// unary one).
    pub messages: Vec<String>,
    /// Terminal status code
    pub code: StatusCode,
    /// Error detail string, absent on success
    #[serde(default)]
    pub details: Option<String>,
    /// Trailing metadata observed with the status
    #[serde(default)]
    pub trailing_metadata: Metadata,
}

impl StreamingResponseRecord {
    /// Build a record from observed messages and the terminal status
    #[must_use]
    pub fn from_wire(
        messages: &[Vec<u8>],
        code: StatusCode,
        details: Option<String>,
        trailing_metadata: Metadata,
    ) -> Self {
        Self {
            messages: messages.iter().map(|m| BASE64.encode(m)).collect(),
            code,
            details,
            trailing_metadata,
        }
    }

    /// Decode every message back to raw bytes, preserving order
    ///
    /// # Errors
    ///
    /// Returns [`TapeError::SerializationFailure`] if any stored message is
    /// not valid base64.
    pub fn message_bytes(&self) -> crate::Result<Vec<Vec<u8>>> {
        self.messages
            .iter()
            .map(|m| decode_body(m, "stream message"))
            .collect()
    }

    /// The replayed status for a non-OK record
    #[must_use]
    pub fn rpc_status(&self) -> RpcStatus {
        RpcStatus {
            code: self.code,
            details: self.details.clone(),
            trailing_metadata: self.trailing_metadata.clone(),
        }
    }
}

/// The response half of an episode
///
/// Untagged on the wire: the unary and streaming document shapes are
/// disjoint (`body` vs `messages`), and [`Episode::validate`] enforces
/// agreement with `rpc_type` after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpisodeResponse {
    /// Streamed outcome (`server_streaming`, `bidi_streaming`)
    Streaming(StreamingResponseRecord),
    /// Single-message outcome (`unary`, `client_streaming`)
    Unary(ResponseRecord),
}

/// The four gRPC call shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcType {
    /// Single request, single response
    Unary,
    /// Single request, streamed response
    ServerStreaming,
    /// Streamed request, single response
    ClientStreaming,
    /// Streamed request, streamed response
    BidiStreaming,
}

impl RpcType {
    /// Whether this shape produces a streamed response record
    #[must_use]
    pub fn is_response_streaming(self) -> bool {
        matches!(self, Self::ServerStreaming | Self::BidiStreaming)
    }
}

/// One recorded interaction: request, response, and call shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// The recorded request
    pub request: RequestRecord,
    /// The recorded response, variant matching `rpc_type`
    pub response: EpisodeResponse,
    /// The call shape of the interaction
    pub rpc_type: RpcType,
}

impl Episode {
    /// The gRPC method path of the recorded request
    #[must_use]
    pub fn method(&self) -> &str {
        &self.request.method
    }

    /// Check that the response variant agrees with the call shape
    ///
    /// # Errors
    ///
    /// Returns [`TapeError::SerializationFailure`] on disagreement or an
    /// empty method path.
    pub fn validate(&self) -> crate::Result<()> {
        if self.request.method.is_empty() {
            return Err(TapeError::SerializationFailure {
                message: "episode has an empty method path".to_string(),
                source: None,
            });
        }
        let streaming = matches!(self.response, EpisodeResponse::Streaming(_));
        if streaming != self.rpc_type.is_response_streaming() {
            return Err(TapeError::SerializationFailure {
                message: format!(
                    "episode for {} has a response variant inconsistent with rpc_type",
                    self.request.method
                ),
                source: None,
            });
        }
        Ok(())
    }
}

fn decode_body(text: &str, context: &str) -> crate::Result<Vec<u8>> {
    BASE64
        .decode(text)
        .map_err(|e| TapeError::serialization(format!("invalid base64 body in {context}"), e))
}

/// Accept `null` where a base64 string is expected, reading it as empty
fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
