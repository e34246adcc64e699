//! Outbound transport to the GraphQL server.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::{InvocationContext, ProxyConfig, ProxyError, Result, TransportError};

/// Outbound transport configuration for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportOptions {
    /// Headers sent to the GraphQL server.
    pub headers: Vec<(String, String)>,
    /// Request timeout. `None` uses the transport's default.
    pub timeout: Option<Duration>,
}

impl TransportOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set bearer authentication.
    pub fn bearer_auth(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the first value of a header (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// JSON body of a GraphQL request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequestBody {
    /// Document text.
    pub query: String,
    /// Operation variables.
    pub variables: Value,
    /// Operation name.
    pub operation_name: String,
}

/// A fully resolved request to the GraphQL server.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: Method,
    /// Target URL (without GraphQL query parameters).
    pub url: String,
    /// GraphQL payload. Sent as JSON body for POST, as query parameters for GET.
    pub body: GraphQLRequestBody,
    /// Transport options.
    pub options: TransportOptions,
}

impl OutboundRequest {
    /// Build the request for an invocation.
    ///
    /// Mutations are always POST. Queries are GET only when `get_queries` is
    /// set.
    pub fn for_invocation(
        ctx: &InvocationContext,
        endpoint: String,
        options: TransportOptions,
        get_queries: bool,
    ) -> Self {
        let method = if get_queries && ctx.operation().is_cacheable() {
            Method::GET
        } else {
            Method::POST
        };

        Self {
            method,
            url: endpoint,
            body: GraphQLRequestBody {
                query: ctx.operation_document().to_string(),
                variables: ctx.variables().clone(),
                operation_name: ctx.operation_name().to_string(),
            },
            options,
        }
    }

    /// Query parameters for the GET form.
    pub fn query_pairs(&self) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            ("query", self.body.query.clone()),
            ("variables", serde_json::to_string(&self.body.variables)?),
            ("operationName", self.body.operation_name.clone()),
        ])
    }
}

/// Raw response from the GraphQL server.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl RawResponse {
    /// Create a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Create a response from a reqwest response.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> std::result::Result<Self, TransportError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the response body as bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Get the response body as text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Convert into a transport error carrying status and body.
    pub fn into_error(self) -> TransportError {
        TransportError::status(self.status.as_u16(), self.text())
    }
}

/// Performs outbound requests.
///
/// Implementations issue exactly one request per call and never retry;
/// non-2xx responses are returned as `Ok` and classified by the dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request.
    async fn execute(&self, request: OutboundRequest) -> std::result::Result<RawResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport using the proxy configuration.
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ProxyError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: OutboundRequest) -> std::result::Result<RawResponse, TransportError> {
        let mut url = url::Url::parse(&request.url)
            .map_err(|e| TransportError::network(format!("invalid endpoint {}: {}", request.url, e)))?;

        if request.method == Method::GET {
            let pairs = request
                .query_pairs()
                .map_err(|e| TransportError::network(format!("failed to encode variables: {}", e)))?;
            url.query_pairs_mut().extend_pairs(pairs);
        }

        debug!(method = %request.method, url = %url, "Sending GraphQL request");

        let mut http_request = self.client.request(request.method.clone(), url);

        for (name, value) in &request.options.headers {
            http_request = http_request.header(name.as_str(), value.as_str());
        }

        if request.method != Method::GET {
            http_request = http_request.json(&request.body);
        }

        if let Some(timeout) = request.options.timeout {
            http_request = http_request.timeout(timeout);
        }

        let response = http_request.send().await?;
        RawResponse::from_reqwest(response).await
    }
}
