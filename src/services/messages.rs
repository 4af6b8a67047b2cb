//! Messages service.

use crate::client::{ApiClient, RequestDescriptor};
use crate::errors::NetworkResult;
use crate::resilience::RetryPolicy;
use crate::types::MessageResponse;
use async_trait::async_trait;
use tracing::instrument;

/// Trait for messages service operations
#[async_trait]
pub trait MessageServiceTrait: Send + Sync {
    /// List the messages addressed to a user
    async fn fetch_messages(&self, user_id: &str) -> NetworkResult<Vec<MessageResponse>>;
}

/// Messages service implementation
#[derive(Debug, Clone)]
pub struct MessageService {
    client: ApiClient,
    policy: RetryPolicy,
}

impl MessageService {
    /// Create a new messages service
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            policy: RetryPolicy::standard(),
        }
    }

    /// Override the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl MessageServiceTrait for MessageService {
    #[instrument(skip(self))]
    async fn fetch_messages(&self, user_id: &str) -> NetworkResult<Vec<MessageResponse>> {
        let descriptor = RequestDescriptor::get(format!("users/{}/messages", user_id));
        self.client.request_with_retry(&descriptor, &self.policy).await
    }
}
