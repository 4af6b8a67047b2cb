//! Tests for the Subspace client.

#[cfg(test)]
mod client_tests;


use crate::auth::{CredentialSnapshot, InMemoryCredentialStore};
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::mocks::MockHttpTransport;
use std::sync::Arc;

fn credentials(expires_in: chrono::Duration) -> Arc<InMemoryCredentialStore> {
    Arc::new(InMemoryCredentialStore::with_credentials(CredentialSnapshot::new(
        "access-token-123",
        "refresh-token-456",
        chrono::Utc::now() + expires_in,
    )))
}

fn mock_client(transport: &MockHttpTransport, store: Arc<InMemoryCredentialStore>) -> ApiClient {
    ApiClient::with_transport(ClientConfig::default(), store, Arc::new(transport.clone()))
}
