//! Authentication management for the Subspace client.
//!
//! The executor never owns tokens. It asks a [`CredentialStore`] for a
//! snapshot on every attempt and attaches a bearer header only when that
//! snapshot is present and unexpired.

use crate::observability::Redacted;
use chrono::{DateTime, Utc};
use http::header::{HeaderValue, AUTHORIZATION};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};

/// Point-in-time view of the session credentials
#[derive(Clone)]
pub struct CredentialSnapshot {
    access_token: SecretString,
    refresh_token: SecretString,
    expires_at: DateTime<Utc>,
}

impl CredentialSnapshot {
    /// Create a new snapshot
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            refresh_token: SecretString::new(refresh_token.into()),
            expires_at,
        }
    }

    /// Whether the access token is still usable
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Whether the access token is usable at the given instant
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Expiry instant
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Expose the access token (use with caution)
    pub fn expose_access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Expose the refresh token (use with caution)
    pub fn expose_refresh_token(&self) -> &str {
        self.refresh_token.expose_secret()
    }

    /// Build the `Authorization: Bearer` header value.
    ///
    /// Returns `None` for tokens that are not valid header text.
    pub fn bearer_header(&self) -> Option<(http::header::HeaderName, HeaderValue)> {
        let mut value =
            HeaderValue::from_str(&format!("Bearer {}", self.access_token.expose_secret()))
                .ok()?;
        value.set_sensitive(true);
        Some((AUTHORIZATION, value))
    }
}

impl std::fmt::Debug for CredentialSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSnapshot")
            .field("access_token", &Redacted::new(&self.access_token))
            .field("refresh_token", &Redacted::new(&self.refresh_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of session credentials
pub trait CredentialStore: Send + Sync {
    /// Current credentials, if any
    fn snapshot(&self) -> Option<CredentialSnapshot>;
}

/// In-process credential store
#[derive(Default)]
pub struct InMemoryCredentialStore {
    current: RwLock<Option<CredentialSnapshot>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given credentials
    pub fn with_credentials(snapshot: CredentialSnapshot) -> Self {
        Self {
            current: RwLock::new(Some(snapshot)),
        }
    }

    /// Replace the stored credentials
    pub fn save(&self, snapshot: CredentialSnapshot) {
        *self.current.write() = Some(snapshot);
    }

    /// Read the stored credentials
    pub fn get(&self) -> Option<CredentialSnapshot> {
        self.current.read().clone()
    }

    /// Forget the stored credentials
    pub fn delete(&self) {
        *self.current.write() = None;
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn snapshot(&self) -> Option<CredentialSnapshot> {
        self.get()
    }
}

impl std::fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCredentialStore")
            .field("has_credentials", &self.current.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot(expires_in: Duration) -> CredentialSnapshot {
        CredentialSnapshot::new("access-abc", "refresh-xyz", Utc::now() + expires_in)
    }

    #[test]
    fn test_validity_uses_expiry() {
        assert!(snapshot(Duration::minutes(5)).is_valid());
        assert!(!snapshot(Duration::minutes(-5)).is_valid());

        let at = Utc::now();
        let edge = CredentialSnapshot::new("a", "r", at);
        assert!(!edge.is_valid_at(at));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", snapshot(Duration::minutes(5)));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("access-abc"));
        assert!(!debug.contains("refresh-xyz"));
    }

    #[test]
    fn test_bearer_header() {
        let (name, value) = snapshot(Duration::minutes(5)).bearer_header().unwrap();
        assert_eq!(name, AUTHORIZATION);
        assert_eq!(value.to_str().unwrap(), "Bearer access-abc");
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_in_memory_store_lifecycle() {
        let store = InMemoryCredentialStore::new();
        assert!(store.snapshot().is_none());

        store.save(snapshot(Duration::minutes(5)));
        assert_eq!(store.get().unwrap().expose_access_token(), "access-abc");

        store.delete();
        assert!(store.snapshot().is_none());
    }
}
