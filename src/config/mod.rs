//! Configuration management for the Subspace client.
//!
//! Supports configuration via:
//! - Explicit values
//! - Environment variables
//! - Builder pattern
//!
//! URLs are parsed once, here. A bad URL is a startup failure reported as
//! [`ConfigurationError`], never a runtime request error.

use crate::errors::{ConfigResult, ConfigurationError};
use http::HeaderMap;
use std::time::Duration;
use url::Url;

/// Deployment environment selecting the default endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local backend
    #[default]
    Development,
    /// Staging backend
    Staging,
    /// Production backend
    Production,
}

impl Environment {
    /// Parse an environment name, case-insensitively
    pub fn parse(value: &str) -> ConfigResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigurationError::InvalidValue {
                name: "SUBSPACE_ENV",
                message: format!("unknown environment '{}'", other),
            }),
        }
    }

    /// Default REST base URL for this environment
    pub fn default_api_base_url(&self) -> &'static str {
        match self {
            Self::Development => crate::DEFAULT_BASE_URL,
            Self::Staging => "https://staging-api.subspace.app/api/v1",
            Self::Production => "https://api.subspace.app/api/v1",
        }
    }

    /// Default WebSocket URL for this environment
    pub fn default_websocket_url(&self) -> &'static str {
        match self {
            Self::Development => crate::DEFAULT_WEBSOCKET_URL,
            Self::Staging => "wss://staging-api.subspace.app/ws",
            Self::Production => "wss://api.subspace.app/ws",
        }
    }
}

/// Realtime channel configuration
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Interval between keepalive pings while connected
    pub ping_interval: Duration,
    /// Fixed delay before reconnecting after a receive failure
    pub reconnect_delay: Duration,
    /// Deadline for the WebSocket handshake
    pub connect_timeout: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(crate::DEFAULT_PING_INTERVAL_SECS),
            reconnect_delay: Duration::from_secs(crate::DEFAULT_RECONNECT_DELAY_SECS),
            connect_timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RealtimeConfig {
    /// Set ping interval
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set handshake timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Configuration for the Subspace client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for REST requests
    pub base_url: Url,
    /// URL of the realtime endpoint
    pub websocket_url: Url,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Default time-to-live for cache entries
    pub cache_ttl: Duration,
    /// Headers added to every request
    pub default_headers: HeaderMap,
    /// Realtime channel configuration
    pub realtime: RealtimeConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Development)
    }
}

impl ClientConfig {
    /// Create a new configuration builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Default configuration for an environment.
    ///
    /// The built-in URLs are compile-time constants known to parse.
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            base_url: Url::parse(environment.default_api_base_url())
                .expect("built-in API URL is valid"),
            websocket_url: Url::parse(environment.default_websocket_url())
                .expect("built-in WebSocket URL is valid"),
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(crate::DEFAULT_CACHE_TTL_SECS),
            default_headers: HeaderMap::new(),
            realtime: RealtimeConfig::default(),
        }
    }

    /// Create configuration from environment variables
    ///
    /// Reads:
    /// - `SUBSPACE_ENV` - `development` (default), `staging` or `production`
    /// - `API_BASE_URL` - REST base URL override
    /// - `WEBSOCKET_URL` - realtime endpoint override
    /// - `SUBSPACE_TIMEOUT_SECS` - per-request timeout
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration from an arbitrary variable source
    pub(crate) fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = match lookup("SUBSPACE_ENV") {
            Some(name) => ClientConfigBuilder::new().environment(Environment::parse(&name)?),
            None => ClientConfigBuilder::new(),
        };

        if let Some(url) = lookup("API_BASE_URL") {
            builder = builder.base_url(&url)?;
        }

        if let Some(url) = lookup("WEBSOCKET_URL") {
            builder = builder.websocket_url(&url)?;
        }

        if let Some(timeout) = lookup("SUBSPACE_TIMEOUT_SECS") {
            let secs = timeout.trim().parse::<u64>().map_err(|e| {
                ConfigurationError::InvalidValue {
                    name: "SUBSPACE_TIMEOUT_SECS",
                    message: e.to_string(),
                }
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Build the full URL for an endpoint
    pub fn build_url(&self, endpoint: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = endpoint.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.base_url.cannot_be_a_base() {
            return Err(ConfigurationError::InvalidUrl {
                name: "API_BASE_URL",
                value: self.base_url.to_string(),
                message: "URL cannot be used as a base".to_string(),
            });
        }

        if !matches!(self.websocket_url.scheme(), "ws" | "wss") {
            return Err(ConfigurationError::InvalidUrl {
                name: "WEBSOCKET_URL",
                value: self.websocket_url.to_string(),
                message: "scheme must be ws or wss".to_string(),
            });
        }

        if self.timeout.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                name: "timeout",
                message: "must be greater than zero".to_string(),
            });
        }

        if self.realtime.ping_interval.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                name: "ping_interval",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Start from an environment's default endpoints
    pub fn environment(mut self, environment: Environment) -> Self {
        let defaults = ClientConfig::for_environment(environment);
        self.config.base_url = defaults.base_url;
        self.config.websocket_url = defaults.websocket_url;
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: &str) -> ConfigResult<Self> {
        self.config.base_url = parse_url("API_BASE_URL", url)?;
        Ok(self)
    }

    /// Set the WebSocket URL
    pub fn websocket_url(mut self, url: &str) -> ConfigResult<Self> {
        self.config.websocket_url = parse_url("WEBSOCKET_URL", url)?;
        Ok(self)
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the default cache time-to-live
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    /// Add a default header
    pub fn default_header(mut self, name: &str, value: &str) -> Self {
        if let Ok(header_name) = name.parse::<http::header::HeaderName>() {
            if let Ok(header_value) = value.parse::<http::header::HeaderValue>() {
                self.config.default_headers.insert(header_name, header_value);
            }
        }
        self
    }

    /// Configure the realtime channel
    pub fn realtime(mut self, config: RealtimeConfig) -> Self {
        self.config.realtime = config;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConfigResult<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build the configuration without validation (for testing)
    pub fn build_unchecked(self) -> ClientConfig {
        self.config
    }
}

fn parse_url(name: &'static str, value: &str) -> ConfigResult<Url> {
    Url::parse(value.trim()).map_err(|e| ConfigurationError::InvalidUrl {
        name,
        value: value.to_string(),
        message: e.to_string(),
    })
}
