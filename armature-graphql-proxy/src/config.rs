//! GraphQL proxy configuration.

use std::time::Duration;

use crate::TransportOptions;

/// Default route prefix of the inbound call surface.
pub const DEFAULT_API_PREFIX: &str = "/api/graphql_middleware";

/// GraphQL proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// GraphQL endpoint used when no endpoint hook is configured.
    pub endpoint: String,
    /// Route prefix for inbound calls (`{prefix}/query/{name}`).
    pub api_prefix: String,
    /// Timeout of the outbound client. `None` leaves calls unbounded unless
    /// transport options set one.
    pub timeout: Option<Duration>,
    /// Headers sent upstream when no transport options hook is configured.
    pub default_headers: Vec<(String, String)>,
    /// Send queries upstream as GET with query parameters.
    pub get_queries: bool,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4000/graphql".to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout: None,
            default_headers: Vec::new(),
            get_queries: false,
            user_agent: format!("armature-graphql-proxy/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ProxyConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }

    /// Create configuration for a specific endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Transport options used when no options hook is configured.
    pub fn default_transport_options(&self) -> TransportOptions {
        TransportOptions {
            headers: self.default_headers.clone(),
            timeout: None,
        }
    }
}

/// Builder for proxy configuration.
#[derive(Debug, Default)]
pub struct ProxyConfigBuilder {
    config: ProxyConfig,
}

impl ProxyConfigBuilder {
    /// Set the default GraphQL endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the inbound route prefix.
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.api_prefix = prefix.into();
        self
    }

    /// Set the outbound request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Add a default upstream header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .default_headers
            .push((name.into(), value.into()));
        self
    }

    /// Set bearer authentication for upstream requests.
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.config.default_headers.push((
            "Authorization".to_string(),
            format!("Bearer {}", token.into()),
        ));
        self
    }

    /// Send queries upstream as GET requests.
    pub fn get_queries(mut self, enabled: bool) -> Self {
        self.config.get_queries = enabled;
        self
    }

    /// Set user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ProxyConfig {
        self.config
    }
}
