//! Transports carrying operation calls to the proxy.

use armature_graphql_proxy::{
    GraphQLProxy, GraphQLResponse, HeaderMap, InboundCall, Method, OperationKind,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::{GraphQLClientConfig, GraphQLError, ProxyRequest, Result};

/// Sends a [`ProxyRequest`] to the proxy and decodes its answer.
#[async_trait]
pub trait ProxyTransport: Send + Sync {
    /// Execute one call.
    async fn send(&self, request: ProxyRequest) -> Result<GraphQLResponse>;
}

#[async_trait]
impl<T: ProxyTransport + ?Sized> ProxyTransport for Arc<T> {
    async fn send(&self, request: ProxyRequest) -> Result<GraphQLResponse> {
        (**self).send(request).await
    }
}

/// HTTP transport talking to the proxy routes of a remote server.
#[derive(Clone)]
pub struct HttpProxyTransport {
    http_client: Client,
    config: Arc<GraphQLClientConfig>,
}

impl HttpProxyTransport {
    /// Create a transport from configuration.
    pub fn new(config: GraphQLClientConfig) -> Result<Self> {
        url::Url::parse(&config.base_url)
            .map_err(|e| GraphQLError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            config: Arc::new(config),
        })
    }

    /// Create a transport with a preconfigured HTTP client.
    pub fn from_client(http_client: Client, config: GraphQLClientConfig) -> Self {
        Self {
            http_client,
            config: Arc::new(config),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &GraphQLClientConfig {
        &self.config
    }

    fn url(&self, request: &ProxyRequest) -> Result<String> {
        let uri = request.uri(&self.config.api_prefix)?;
        Ok(format!("{}{}", self.config.base_url.trim_end_matches('/'), uri))
    }
}

#[async_trait]
impl ProxyTransport for HttpProxyTransport {
    async fn send(&self, request: ProxyRequest) -> Result<GraphQLResponse> {
        let url = self.url(&request)?;
        debug!(operation = %request.name, kind = %request.kind, url = %url, "Calling GraphQL proxy");

        let mut http_request = match request.kind {
            OperationKind::Query => self.http_client.get(&url),
            OperationKind::Mutation => self.http_client.post(&url),
        };

        for (name, value) in self
            .config
            .default_headers
            .iter()
            .chain(request.options.headers.iter())
        {
            http_request = http_request.header(name.as_str(), value.as_str());
        }

        if let Some(timeout) = request.options.timeout {
            http_request = http_request.timeout(timeout);
        }

        if let Some(body) = request.body() {
            http_request = http_request.json(&body);
        }

        let response = http_request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        decode_proxy_response(status, &body)
    }
}

impl std::fmt::Debug for HttpProxyTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProxyTransport")
            .field("base_url", &self.config.base_url)
            .field("api_prefix", &self.config.api_prefix)
            .finish()
    }
}

/// Transport that calls a [`GraphQLProxy`] living in the same process.
///
/// Calls go through [`GraphQLProxy::handle`] so routing, method checks and
/// variable decoding behave exactly as for remote callers.
#[derive(Debug, Clone)]
pub struct InProcessTransport {
    proxy: Arc<GraphQLProxy>,
    headers: HeaderMap,
}

impl InProcessTransport {
    /// Wrap a proxy.
    pub fn new(proxy: Arc<GraphQLProxy>) -> Self {
        Self {
            proxy,
            headers: HeaderMap::new(),
        }
    }

    /// Headers attached to every call, e.g. the cookies of the page request.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    fn call(&self, request: &ProxyRequest) -> Result<InboundCall> {
        let prefix = &self.proxy.dispatcher().config().api_prefix;
        let method = match request.kind {
            OperationKind::Query => Method::GET,
            OperationKind::Mutation => Method::POST,
        };

        let mut headers = self.headers.clone();
        for (name, value) in &request.options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| GraphQLError::Config(format!("invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| GraphQLError::Config(format!("invalid header value: {}", e)))?;
            headers.append(name, value);
        }

        let mut call = InboundCall::new(method, &request.uri(prefix)?);
        if let Some(body) = request.body() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            call = call.with_body(serde_json::to_vec(&body)?);
        }

        Ok(call.with_headers(headers))
    }
}

#[async_trait]
impl ProxyTransport for InProcessTransport {
    async fn send(&self, request: ProxyRequest) -> Result<GraphQLResponse> {
        let call = self.call(&request)?;
        debug!(operation = %request.name, kind = %request.kind, "Calling in-process GraphQL proxy");

        let response = self.proxy.handle(call).await;
        decode_proxy_response(response.status.as_u16(), &response.body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyErrorBody {
    status_code: Option<u16>,
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Decode an answer of the proxy routes.
///
/// Non-2xx answers become [`GraphQLError::Proxy`] carrying the message and
/// upstream data from the error body.
pub fn decode_proxy_response(status: u16, body: &Bytes) -> Result<GraphQLResponse> {
    if (200..300).contains(&status) {
        return serde_json::from_slice(body)
            .map_err(|e| GraphQLError::Parse(format!("invalid proxy response: {}", e)));
    }

    match serde_json::from_slice::<ProxyErrorBody>(body) {
        Ok(error) => Err(GraphQLError::Proxy {
            status: error.status_code.unwrap_or(status),
            message: error
                .message
                .unwrap_or_else(|| format!("proxy responded with status {}", status)),
            data: error.data,
        }),
        Err(_) => Err(GraphQLError::Proxy {
            status,
            message: String::from_utf8_lossy(body).into_owned(),
            data: None,
        }),
    }
}
