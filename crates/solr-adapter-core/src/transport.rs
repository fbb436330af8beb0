//! The outbound HTTP seam.
//!
//! The core crate never performs I/O. A [`Transport`] receives a fully
//! built [`Request`] and returns the decoded JSON body, or a
//! [`TransportFailure`] describing a non-success response or network
//! error. Classification of that failure happens afterwards in
//! [`classify_failure`](crate::classify::classify_failure).
//!
//! [`ScriptedTransport`] replays canned responses and records every
//! request it sees; it backs the protocol tests and dry runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportFailure;
use crate::request::Request;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request and return the response body.
    ///
    /// Reads are sent as query parameters ([`Request::query_pairs`]),
    /// writes as a JSON body ([`Request::body`]). Implementations should
    /// return a [`TransportFailure`] carrying the status and decoded body
    /// for any non-2xx response.
    async fn execute(&self, request: &Request) -> Result<Value, TransportFailure>;
}

/// In-memory transport that answers from a queue of scripted responses.
///
/// When the queue is empty every request fails with a message-only
/// [`TransportFailure`].
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value, TransportFailure>>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response body.
    pub fn respond(self, body: Value) -> Self {
        self.push(Ok(body));
        self
    }

    /// Queue a failure.
    pub fn fail(self, failure: TransportFailure) -> Self {
        self.push(Err(failure));
        self
    }

    pub fn push(&self, response: Result<Value, TransportFailure>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &Request) -> Result<Value, TransportFailure> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| {
                Err(TransportFailure::message(format!(
                    "no scripted response for {} {}",
                    request.method(),
                    request.relative_url()
                )))
            })
    }
}
