//! Request executor tests.

use super::{credentials, mock_client};
use crate::auth::InMemoryCredentialStore;
use crate::client::RequestDescriptor;
use crate::errors::{NetworkError, NetworkResult};
use crate::mocks::{MockHttpTransport, MockResponse};
use crate::resilience::RetryPolicy;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;

#[derive(Debug, Deserialize, PartialEq)]
struct Count {
    count: u32,
}

fn anonymous() -> Arc<InMemoryCredentialStore> {
    Arc::new(InMemoryCredentialStore::new())
}

#[tokio::test]
async fn test_success_decodes_body_and_sets_wire_headers() {
    let transport = MockHttpTransport::new().add_response(MockResponse::ok(r#"{"count":7}"#));
    let client = mock_client(&transport, anonymous());

    let result: Count = client.request(&RequestDescriptor::get("/users/7/unread")).await.unwrap();

    assert_eq!(result, Count { count: 7 });
    let request = transport.last_request().unwrap();
    assert_eq!(request.url, "http://localhost:8080/api/v1/users/7/unread");
    assert_eq!(request.method, http::Method::GET);
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("accept"), Some("application/json"));
}

#[tokio::test]
async fn test_bearer_attached_for_valid_credentials() {
    let transport = MockHttpTransport::new().add_response(MockResponse::ok("{}"));
    let client = mock_client(&transport, credentials(chrono::Duration::minutes(10)));

    let _: serde_json::Value = client.request(&RequestDescriptor::get("me")).await.unwrap();

    assert_eq!(
        transport.last_request().unwrap().header("authorization"),
        Some("Bearer access-token-123")
    );
}

#[tokio::test]
async fn test_bearer_omitted_for_expired_credentials() {
    let transport = MockHttpTransport::new().add_response(MockResponse::ok("{}"));
    let client = mock_client(&transport, credentials(chrono::Duration::minutes(-1)));

    let _: serde_json::Value = client.request(&RequestDescriptor::get("me")).await.unwrap();

    assert_eq!(transport.last_request().unwrap().header("authorization"), None);
}

#[tokio::test]
async fn test_bearer_omitted_when_auth_not_requested() {
    let transport = MockHttpTransport::new().add_response(MockResponse::ok("{}"));
    let client = mock_client(&transport, credentials(chrono::Duration::minutes(10)));

    let _: serde_json::Value = client
        .request(&RequestDescriptor::post("auth/login").without_auth())
        .await
        .unwrap();

    assert_eq!(transport.last_request().unwrap().header("authorization"), None);
}

#[tokio::test]
async fn test_body_is_forwarded() {
    let transport = MockHttpTransport::new().add_response(MockResponse::status(204));
    let client = mock_client(&transport, anonymous());

    let descriptor = RequestDescriptor::patch("messages/m1")
        .with_json(&serde_json::json!({"isRead": true}))
        .unwrap();
    let _: () = client.request(&descriptor).await.unwrap();

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, http::Method::PATCH);
    assert_eq!(request.body.unwrap().as_ref(), br#"{"isRead":true}"#);
}

#[test_case(404, NetworkError::ServerError { code: 404 }; "not found")]
#[test_case(401, NetworkError::ServerError { code: 401 }; "unauthorized")]
#[test_case(500, NetworkError::ServerError { code: 500 }; "internal error")]
#[test_case(302, NetworkError::ServerError { code: 302 }; "redirect")]
#[test_case(0, NetworkError::InvalidResponse; "missing status")]
#[test_case(600, NetworkError::InvalidResponse; "status out of range")]
#[tokio::test]
async fn test_status_classification(status: u16, expected: NetworkError) {
    let transport = MockHttpTransport::new().add_response(MockResponse::status(status));
    let client = mock_client(&transport, anonymous());

    let result: NetworkResult<Count> = client.request(&RequestDescriptor::get("users")).await;

    assert_eq!(result, Err(expected));
}

#[tokio::test]
async fn test_shape_mismatch_is_decoding_failed() {
    let transport = MockHttpTransport::new().add_response(MockResponse::ok(r#"{"total":1}"#));
    let client = mock_client(&transport, anonymous());

    let result: NetworkResult<Count> = client.request(&RequestDescriptor::get("users")).await;

    assert_eq!(result, Err(NetworkError::DecodingFailed));
}

#[tokio::test(start_paused = true)]
async fn test_per_attempt_timeout() {
    let transport = MockHttpTransport::new()
        .add_response(MockResponse::ok("{}").with_delay(Duration::from_secs(120)));
    let client = mock_client(&transport, anonymous());

    let result: NetworkResult<serde_json::Value> =
        client.request(&RequestDescriptor::get("slow")).await;

    assert_eq!(result, Err(NetworkError::Timeout));
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_exhausted_on_503() {
    let transport =
        MockHttpTransport::new().with_default_response(MockResponse::status(503));
    let client = mock_client(&transport, anonymous());

    let result: NetworkResult<Count> = client
        .request_with_retry(&RequestDescriptor::get("users"), &RetryPolicy::standard())
        .await;

    assert_eq!(result, Err(NetworkError::ServerError { code: 503 }));
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_decoding_failure_is_not_retried() {
    let transport = MockHttpTransport::new().with_default_response(MockResponse::ok("[]"));
    let client = mock_client(&transport, anonymous());

    let result: NetworkResult<Count> = client
        .request_with_retry(&RequestDescriptor::get("users"), &RetryPolicy::aggressive())
        .await;

    assert_eq!(result, Err(NetworkError::DecodingFailed));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_client_error_is_not_retried() {
    let transport =
        MockHttpTransport::new().with_default_response(MockResponse::status(404));
    let client = mock_client(&transport, anonymous());

    let result: NetworkResult<Count> = client
        .request_with_retry(&RequestDescriptor::get("users/x"), &RetryPolicy::aggressive())
        .await;

    assert_eq!(result, Err(NetworkError::ServerError { code: 404 }));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_transient_failures() {
    let transport = MockHttpTransport::new().add_responses([
        MockResponse::error(NetworkError::NoConnection),
        MockResponse::status(500),
        MockResponse::ok(r#"{"count":1}"#),
    ]);
    let client = mock_client(&transport, anonymous());
    let started = tokio::time::Instant::now();

    let result: Count = client
        .request_with_retry(&RequestDescriptor::get("users"), &RetryPolicy::standard())
        .await
        .unwrap();

    assert_eq!(result, Count { count: 1 });
    assert_eq!(transport.request_count(), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_are_retried() {
    let transport = MockHttpTransport::new().add_responses([
        MockResponse::ok("{}").with_delay(Duration::from_secs(120)),
        MockResponse::ok(r#"{"count":2}"#),
    ]);
    let client = mock_client(&transport, anonymous());

    let result: Count = client
        .request_with_retry(&RequestDescriptor::get("users"), &RetryPolicy::conservative())
        .await
        .unwrap();

    assert_eq!(result, Count { count: 2 });
    assert_eq!(transport.request_count(), 2);
}
