//! Users service with cache-first lookups.

use crate::cache::Cache;
use crate::client::{ApiClient, RequestDescriptor};
use crate::errors::NetworkResult;
use crate::resilience::RetryPolicy;
use crate::types::{ListResponse, User};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Trait for users service operations
#[async_trait]
pub trait UserServiceTrait: Send + Sync {
    /// Get a user, served from cache while the entry is fresh
    async fn fetch_user(&self, id: &str) -> NetworkResult<User>;

    /// List users
    async fn fetch_users(&self) -> NetworkResult<ListResponse<User>>;
}

/// Users service implementation
#[derive(Clone)]
pub struct UserService {
    client: ApiClient,
    cache: Arc<Cache<String, User>>,
    policy: RetryPolicy,
}

impl UserService {
    /// Create a service with a cache using the client's configured TTL
    pub fn new(client: ApiClient) -> Self {
        let cache = Arc::new(Cache::new(client.config().cache_ttl));
        Self::with_cache(client, cache)
    }

    /// Create a service sharing an existing cache
    pub fn with_cache(client: ApiClient, cache: Arc<Cache<String, User>>) -> Self {
        Self {
            client,
            cache,
            policy: RetryPolicy::standard(),
        }
    }

    /// Override the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The backing cache
    pub fn cache(&self) -> &Arc<Cache<String, User>> {
        &self.cache
    }
}

#[async_trait]
impl UserServiceTrait for UserService {
    #[instrument(skip(self))]
    async fn fetch_user(&self, id: &str) -> NetworkResult<User> {
        let key = id.to_string();

        if let Some(user) = self.cache.get(&key) {
            debug!(user_id = %id, "Returning cached user");
            return Ok(user);
        }

        let descriptor = RequestDescriptor::get(format!("users/{}", id));
        let user: User = self
            .client
            .request_with_retry(&descriptor, &self.policy)
            .await?;

        info!(user_id = %user.id, "User fetched");
        self.cache.set(key, user.clone(), None);
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn fetch_users(&self) -> NetworkResult<ListResponse<User>> {
        self.client
            .request_with_retry(&RequestDescriptor::get("users"), &self.policy)
            .await
    }
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("cached_users", &self.cache.len())
            .field("policy", &self.policy)
            .finish()
    }
}
