//! Shared fixtures: JSON-encoded test messages and scripted transports
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use grpctape::transport::{
    AsyncMessageStream, AsyncTransport, BlockingTransport, MessageStream, UnaryExchange,
};
use grpctape::{DecodeError, Message, Metadata, RpcStatus, StatusCode};

pub const GET_USER: &str = "/test.TestService/GetUser";
pub const LIST_USERS: &str = "/test.TestService/ListUsers";
pub const CREATE_USERS: &str = "/test.TestService/CreateUsers";
pub const CHAT: &str = "/test.TestService/Chat";

macro_rules! json_message {
    ($ty:ty) => {
        impl Message for $ty {
            fn to_bytes(&self) -> Vec<u8> {
                serde_json::to_vec(self).expect("test message encodes")
            }

            fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
                serde_json::from_slice(bytes).map_err(|e| DecodeError::new(e.to_string()))
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetUserRequest {
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUsersRequest {
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSummary {
    pub created: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatNote {
    pub text: String,
}

json_message!(GetUserRequest);
json_message!(User);
json_message!(ListUsersRequest);
json_message!(CreateSummary);
json_message!(ChatNote);

pub fn user(id: u32, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}

fn roster() -> Vec<User> {
    vec![user(1, "Alice"), user(2, "Bob"), user(3, "Carol")]
}

/// In-process responder standing in for a live gRPC server
///
/// Counts every live call so tests can prove replay never reached it.
#[derive(Default)]
pub struct TestServer {
    calls: AtomicUsize,
}

impl TestServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond_unary(&self, method: &str, request: &[u8]) -> UnaryExchange {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match method {
            GET_USER => {
                let req: GetUserRequest =
                    serde_json::from_slice(request).expect("well-formed GetUserRequest");
                match roster().into_iter().find(|u| u.id == req.id) {
                    Some(found) => UnaryExchange {
                        result: Ok(found.to_bytes()),
                        trailing_metadata: Metadata::from_pairs([("x-served-by", "test-server")]),
                    },
                    None => UnaryExchange {
                        result: Err(RpcStatus::new(
                            StatusCode::NotFound,
                            Some(format!("User {} not found", req.id)),
                        )),
                        trailing_metadata: Metadata::new(),
                    },
                }
            }
            other => UnaryExchange {
                result: Err(RpcStatus::new(
                    StatusCode::Unimplemented,
                    Some(format!("unknown method {other}")),
                )),
                trailing_metadata: Metadata::new(),
            },
        }
    }

    fn respond_client_streaming(&self, method: &str, requests: &[Vec<u8>]) -> UnaryExchange {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match method {
            CREATE_USERS => UnaryExchange {
                result: Ok(CreateSummary {
                    created: u32::try_from(requests.len()).expect("test stream fits"),
                }
                .to_bytes()),
                trailing_metadata: Metadata::new(),
            },
            other => UnaryExchange {
                result: Err(RpcStatus::new(
                    StatusCode::Unimplemented,
                    Some(format!("unknown method {other}")),
                )),
                trailing_metadata: Metadata::new(),
            },
        }
    }

    fn respond_server_streaming(&self, method: &str, request: &[u8]) -> ScriptedStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match method {
            LIST_USERS => {
                let req: ListUsersRequest =
                    serde_json::from_slice(request).expect("well-formed ListUsersRequest");
                // limit 99 simulates a backend dying mid-stream.
                if req.limit == 99 {
                    return ScriptedStream::failing(
                        vec![user(1, "Alice").to_bytes()],
                        RpcStatus::new(
                            StatusCode::Unavailable,
                            Some("backend hiccup".to_string()),
                        ),
                    );
                }
                let messages = roster()
                    .into_iter()
                    .take(req.limit as usize)
                    .map(|u| u.to_bytes())
                    .collect();
                ScriptedStream::ok(messages)
            }
            other => ScriptedStream::failing(
                Vec::new(),
                RpcStatus::new(
                    StatusCode::Unimplemented,
                    Some(format!("unknown method {other}")),
                ),
            ),
        }
    }

    fn respond_bidi(&self, method: &str, requests: &[Vec<u8>]) -> ScriptedStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match method {
            CHAT => {
                let replies = requests
                    .iter()
                    .map(|bytes| {
                        let note: ChatNote =
                            serde_json::from_slice(bytes).expect("well-formed ChatNote");
                        ChatNote {
                            text: format!("ack: {}", note.text),
                        }
                        .to_bytes()
                    })
                    .collect();
                ScriptedStream::ok(replies)
            }
            other => ScriptedStream::failing(
                Vec::new(),
                RpcStatus::new(
                    StatusCode::Unimplemented,
                    Some(format!("unknown method {other}")),
                ),
            ),
        }
    }
}

impl BlockingTransport for TestServer {
    fn unary(&self, method: &str, request: &[u8], _metadata: &Metadata) -> UnaryExchange {
        self.respond_unary(method, request)
    }

    fn server_streaming(
        &self,
        method: &str,
        request: &[u8],
        _metadata: &Metadata,
    ) -> Box<dyn MessageStream> {
        Box::new(self.respond_server_streaming(method, request))
    }

    fn client_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        _metadata: &Metadata,
    ) -> UnaryExchange {
        self.respond_client_streaming(method, requests)
    }

    fn bidi_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        _metadata: &Metadata,
    ) -> Box<dyn MessageStream> {
        Box::new(self.respond_bidi(method, requests))
    }
}

#[async_trait]
impl AsyncTransport for TestServer {
    async fn unary(&self, method: &str, request: &[u8], _metadata: &Metadata) -> UnaryExchange {
        self.respond_unary(method, request)
    }

    async fn server_streaming(
        &self,
        method: &str,
        request: &[u8],
        _metadata: &Metadata,
    ) -> Box<dyn AsyncMessageStream> {
        Box::new(self.respond_server_streaming(method, request))
    }

    async fn client_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        _metadata: &Metadata,
    ) -> UnaryExchange {
        self.respond_client_streaming(method, requests)
    }

    async fn bidi_streaming(
        &self,
        method: &str,
        requests: &[Vec<u8>],
        _metadata: &Metadata,
    ) -> Box<dyn AsyncMessageStream> {
        Box::new(self.respond_bidi(method, requests))
    }
}

/// A pre-scripted response stream
pub struct ScriptedStream {
    messages: VecDeque<Vec<u8>>,
    failure: Option<RpcStatus>,
    trailing: Metadata,
}

impl ScriptedStream {
    pub fn ok(messages: Vec<Vec<u8>>) -> Self {
        Self {
            messages: messages.into(),
            failure: None,
            trailing: Metadata::new(),
        }
    }

    pub fn failing(messages: Vec<Vec<u8>>, failure: RpcStatus) -> Self {
        Self {
            messages: messages.into(),
            failure: Some(failure),
            trailing: Metadata::new(),
        }
    }
}

impl MessageStream for ScriptedStream {
    fn next_message(&mut self) -> Result<Option<Vec<u8>>, RpcStatus> {
        if let Some(message) = self.messages.pop_front() {
            return Ok(Some(message));
        }
        match self.failure.take() {
            Some(status) => Err(status),
            None => Ok(None),
        }
    }

    fn trailing_metadata(&mut self) -> Metadata {
        self.trailing.clone()
    }
}

#[async_trait]
impl AsyncMessageStream for ScriptedStream {
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>, RpcStatus> {
        tokio::task::yield_now().await;
        MessageStream::next_message(self)
    }

    async fn trailing_metadata(&mut self) -> Metadata {
        self.trailing.clone()
    }
}

/// A responder that fails every call; proves replay never goes live
#[derive(Default)]
pub struct DeadServer;

impl DeadServer {
    fn refuse(&self) -> RpcStatus {
        RpcStatus::new(
            StatusCode::Unavailable,
            Some("transport must not be reached during replay".to_string()),
        )
    }
}

impl BlockingTransport for DeadServer {
    fn unary(&self, _method: &str, _request: &[u8], _metadata: &Metadata) -> UnaryExchange {
        UnaryExchange {
            result: Err(self.refuse()),
            trailing_metadata: Metadata::new(),
        }
    }

    fn server_streaming(
        &self,
        _method: &str,
        _request: &[u8],
        _metadata: &Metadata,
    ) -> Box<dyn MessageStream> {
        Box::new(ScriptedStream::failing(Vec::new(), self.refuse()))
    }

    fn client_streaming(
        &self,
        _method: &str,
        _requests: &[Vec<u8>],
        _metadata: &Metadata,
    ) -> UnaryExchange {
        UnaryExchange {
            result: Err(self.refuse()),
            trailing_metadata: Metadata::new(),
        }
    }

    fn bidi_streaming(
        &self,
        _method: &str,
        _requests: &[Vec<u8>],
        _metadata: &Metadata,
    ) -> Box<dyn MessageStream> {
        Box::new(ScriptedStream::failing(Vec::new(), self.refuse()))
    }
}

#[async_trait]
impl AsyncTransport for DeadServer {
    async fn unary(&self, _method: &str, _request: &[u8], _metadata: &Metadata) -> UnaryExchange {
        UnaryExchange {
            result: Err(self.refuse()),
            trailing_metadata: Metadata::new(),
        }
    }

    async fn server_streaming(
        &self,
        _method: &str,
        _request: &[u8],
        _metadata: &Metadata,
    ) -> Box<dyn AsyncMessageStream> {
        Box::new(ScriptedStream::failing(Vec::new(), self.refuse()))
    }

    async fn client_streaming(
        &self,
        _method: &str,
        _requests: &[Vec<u8>],
        _metadata: &Metadata,
    ) -> UnaryExchange {
        UnaryExchange {
            result: Err(self.refuse()),
            trailing_metadata: Metadata::new(),
        }
    }

    async fn bidi_streaming(
        &self,
        _method: &str,
        _requests: &[Vec<u8>],
        _metadata: &Metadata,
    ) -> Box<dyn AsyncMessageStream> {
        Box::new(ScriptedStream::failing(Vec::new(), self.refuse()))
    }
}
