//! Mock implementations for testing.
//!
//! [`MockHttpTransport`] replays queued responses and records every request
//! so tests can assert on attempt counts and headers without a network.

use crate::errors::{NetworkError, NetworkResult};
use crate::transport::{HttpTransport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Mock response configuration
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Response body
    pub body: Bytes,
    /// HTTP status code
    pub status: u16,
    /// Delay before response
    pub delay: Option<Duration>,
    /// Error to return instead of a response
    pub error: Option<NetworkError>,
}

impl MockResponse {
    /// Create a successful JSON response
    pub fn json<T: Serialize>(data: &T) -> Self {
        Self::ok(serde_json::to_vec(data).unwrap_or_default())
    }

    /// Create a successful response with raw body
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::status(200).with_body(body)
    }

    /// Create an empty response with the given status
    pub fn status(status: u16) -> Self {
        Self {
            body: Bytes::new(),
            status,
            delay: None,
            error: None,
        }
    }

    /// Fail at the transport level instead of responding
    pub fn error(error: NetworkError) -> Self {
        Self {
            error: Some(error),
            ..Self::status(0)
        }
    }

    /// Replace the body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add delay to response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Recorded request for verification
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request URL
    pub url: String,
    /// Request method
    pub method: http::Method,
    /// Request body
    pub body: Option<Bytes>,
    /// Request headers
    pub headers: HeaderMap,
}

impl RecordedRequest {
    /// Header value as text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Mock HTTP transport for testing
#[derive(Clone, Default)]
pub struct MockHttpTransport {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    default_response: Option<MockResponse>,
}

impl MockHttpTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response to the queue
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.lock().push_back(response);
        self
    }

    /// Add multiple responses
    pub fn add_responses(self, responses: impl IntoIterator<Item = MockResponse>) -> Self {
        self.responses.lock().extend(responses);
        self
    }

    /// Add a JSON response
    pub fn add_json_response<T: Serialize>(self, data: &T) -> Self {
        self.add_response(MockResponse::json(data))
    }

    /// Set default response when queue is empty
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests sent so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Get the last recorded request
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// Clear recorded requests
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    /// Get remaining response count
    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().len()
    }

    fn next_response(&self) -> Option<MockResponse> {
        self.responses
            .lock()
            .pop_front()
            .or_else(|| self.default_response.clone())
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: TransportRequest) -> NetworkResult<TransportResponse> {
        self.requests.lock().push(RecordedRequest {
            url: request.url,
            method: request.method,
            body: request.body,
            headers: request.headers,
        });

        // An exhausted queue behaves like an unreachable host
        let response = self.next_response().ok_or(NetworkError::NoConnection)?;

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = response.error {
            return Err(error);
        }

        Ok(TransportResponse {
            status: response.status,
            headers: HeaderMap::new(),
            body: response.body,
        })
    }
}

impl std::fmt::Debug for MockHttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHttpTransport")
            .field("remaining_responses", &self.remaining_responses())
            .field("recorded_requests", &self.request_count())
            .finish()
    }
}
