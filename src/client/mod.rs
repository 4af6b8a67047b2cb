//! Resilient request executor.
//!
//! [`ApiClient`] performs one logical request/response exchange against the
//! configured base URL and classifies every failure into [`NetworkError`]
//! before it reaches the caller. Retries happen only through
//! [`ApiClient::request_with_retry`].

use crate::auth::CredentialStore;
use crate::config::ClientConfig;
use crate::errors::{ConfigResult, NetworkError, NetworkResult};
use crate::observability::redact_token;
use crate::resilience::RetryPolicy;
use crate::transport::{HttpTransport, ReqwestTransport, TransportRequest};
use bytes::Bytes;
use http::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

const JSON: &str = "application/json";

/// Description of a single API call
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Endpoint path relative to the base URL
    pub path: String,
    /// HTTP method
    pub method: Method,
    /// Encoded request body
    pub body: Option<Bytes>,
    /// Attach the bearer token when a valid one exists
    pub include_auth: bool,
}

impl RequestDescriptor {
    /// Create a descriptor for the given method and path
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            body: None,
            include_auth: true,
        }
    }

    /// GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// PUT request
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// PATCH request
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach raw body bytes
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize a value as the JSON body
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> serde_json::Result<Self> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    /// Never attach an `Authorization` header
    pub fn without_auth(mut self) -> Self {
        self.include_auth = false;
        self
    }
}

/// Executor for API requests
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ClientConfig>,
    credentials: Arc<dyn CredentialStore>,
    transport: Arc<dyn HttpTransport>,
}

impl ApiClient {
    /// Create a new client backed by reqwest
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> ConfigResult<Self> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(config.timeout)?);
        Ok(Self::with_transport(config, credentials, transport))
    }

    /// Create a new client with a custom transport
    pub fn with_transport(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            credentials,
            transport,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the credential source
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Perform a single attempt and decode the response body into `T`
    pub async fn request<T>(&self, descriptor: &RequestDescriptor) -> NetworkResult<T>
    where
        T: DeserializeOwned,
    {
        let span = info_span!(
            "api_request",
            request_id = %Uuid::new_v4(),
            method = %descriptor.method,
            path = %descriptor.path,
        );

        self.execute_once(descriptor).instrument(span).await
    }

    /// Perform the request, retrying transient failures under `policy`
    pub async fn request_with_retry<T>(
        &self,
        descriptor: &RequestDescriptor,
        policy: &RetryPolicy,
    ) -> NetworkResult<T>
    where
        T: DeserializeOwned,
    {
        policy.execute(|| self.request(descriptor)).await
    }

    async fn execute_once<T>(&self, descriptor: &RequestDescriptor) -> NetworkResult<T>
    where
        T: DeserializeOwned,
    {
        let request = self.build_request(descriptor);
        let timeout = self.config.timeout;

        let response = tokio::time::timeout(timeout, self.transport.send(request))
            .await
            .map_err(NetworkError::from)
            .and_then(|result| result)
            .map_err(|error| {
                warn!(error_code = error.error_code(), "Request failed before a response");
                error
            })?;

        let status = response.status;
        debug!(status, body_len = response.body.len(), "Response received");

        if !(100..=599).contains(&status) {
            return Err(NetworkError::InvalidResponse);
        }

        if !response.is_success() {
            return Err(NetworkError::ServerError { code: status });
        }

        decode_body(&response.body)
    }

    fn build_request(&self, descriptor: &RequestDescriptor) -> TransportRequest {
        let mut headers = self.config.default_headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));

        if descriptor.include_auth {
            match self.credentials.snapshot().filter(|s| s.is_valid()) {
                Some(snapshot) => {
                    if let Some((name, value)) = snapshot.bearer_header() {
                        debug!(
                            token = %redact_token(snapshot.expose_access_token()),
                            "Attaching bearer token"
                        );
                        headers.insert(name, value);
                    }
                }
                None => debug!("No valid credentials; sending without authorization"),
            }
        }

        let mut request = TransportRequest::new(
            descriptor.method.clone(),
            self.config.build_url(&descriptor.path),
            headers,
        )
        .with_timeout(self.config.timeout);

        if let Some(body) = &descriptor.body {
            request = request.with_body(body.clone());
        }

        request
    }
}

/// Decode a 2xx body. An empty body decodes as JSON `null` so unit and
/// optional targets work for 204 responses.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> NetworkResult<T> {
    let bytes: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };

    serde_json::from_slice(bytes).map_err(|e| {
        debug!(error = %e, "Response body did not match the expected shape");
        NetworkError::DecodingFailed
    })
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url.as_str())
            .field("timeout", &self.config.timeout)
            .field("has_credentials", &self.credentials.snapshot().is_some())
            .finish()
    }
}
