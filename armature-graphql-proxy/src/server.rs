//! Inbound call surface.
//!
//! Host frameworks translate their requests into [`InboundCall`] and write
//! the returned [`InboundResponse`] back. Routes:
//!
//! - `GET  {prefix}/query/{name}?<variables>`
//! - `POST {prefix}/mutation/{name}` with a JSON variables body

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    wire, Dispatcher, DocumentRegistry, GraphQLResponse, HookSet, InvocationContext,
    OperationKind, ProxyConfig, ProxyError, RequestHandle, Result,
};

/// An inbound call as received by the host framework.
#[derive(Debug, Clone)]
pub struct InboundCall {
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Raw query string without `?`.
    pub query: Option<String>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
}

impl InboundCall {
    /// Create a call from a method and a URI (`/path?query`).
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri.to_string(), None),
        };

        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Attach headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Attach a body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Response written back to the inbound caller.
#[derive(Debug, Clone)]
pub struct InboundResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers, including those written by hooks.
    pub headers: HeaderMap,
    /// JSON body.
    pub body: Bytes,
}

impl InboundResponse {
    fn json(status: StatusCode, mut headers: HeaderMap, body: &Value) -> Self {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    /// Parse the body as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Result of executing an operation for an inbound caller.
#[derive(Debug)]
pub struct ProxyOutcome {
    /// Dispatch result.
    pub result: Result<GraphQLResponse>,
    /// Headers the hooks wrote to the side channel.
    pub response_headers: HeaderMap,
}

/// Serves operation calls by looking them up and dispatching them upstream.
#[derive(Clone)]
pub struct GraphQLProxy {
    dispatcher: Dispatcher,
    registry: Arc<dyn DocumentRegistry>,
}

impl GraphQLProxy {
    /// Create a proxy using the reqwest transport.
    pub fn new(
        config: ProxyConfig,
        hooks: HookSet,
        registry: Arc<dyn DocumentRegistry>,
    ) -> Result<Self> {
        Ok(Self::with_dispatcher(
            Dispatcher::with_reqwest(config, hooks)?,
            registry,
        ))
    }

    /// Create a proxy around an existing dispatcher.
    pub fn with_dispatcher(dispatcher: Dispatcher, registry: Arc<dyn DocumentRegistry>) -> Self {
        Self {
            dispatcher,
            registry,
        }
    }

    /// Get the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Match a path against the proxy routes.
    pub fn route<'p>(&self, path: &'p str) -> Option<(OperationKind, &'p str)> {
        let rest = path.strip_prefix(self.dispatcher.config().api_prefix.trim_end_matches('/'))?;
        let rest = rest.strip_prefix('/')?;
        let (kind, name) = rest.split_once('/')?;
        let kind = kind.parse().ok()?;

        if name.is_empty() || name.contains('/') {
            return None;
        }
        Some((kind, name))
    }

    /// Execute a named operation on behalf of a caller.
    pub async fn execute(
        &self,
        kind: OperationKind,
        name: &str,
        variables: Option<Value>,
        request: RequestHandle,
    ) -> ProxyOutcome {
        let operation = match self.registry.lookup(name) {
            Some(operation) => operation,
            None => {
                return ProxyOutcome {
                    result: Err(ProxyError::UnknownOperation(name.to_string())),
                    response_headers: HeaderMap::new(),
                };
            }
        };

        if operation.kind != kind {
            return ProxyOutcome {
                result: Err(ProxyError::KindMismatch {
                    name: name.to_string(),
                    expected: kind,
                    actual: operation.kind,
                }),
                response_headers: HeaderMap::new(),
            };
        }

        let ctx = Arc::new(InvocationContext::new(
            kind,
            name,
            operation.document,
            variables,
            request,
        ));
        let result = self.dispatcher.dispatch_context(&ctx).await;

        ProxyOutcome {
            result,
            response_headers: ctx.take_response_headers(),
        }
    }

    /// Handle an inbound call.
    pub async fn handle(&self, call: InboundCall) -> InboundResponse {
        let outcome = match self.prepare(&call) {
            Ok((kind, name, variables, request)) => {
                debug!(operation = %name, kind = %kind, "Handling inbound GraphQL call");
                self.execute(kind, &name, variables, request).await
            }
            Err(error) => ProxyOutcome {
                result: Err(error),
                response_headers: HeaderMap::new(),
            },
        };

        match outcome.result {
            Ok(response) => match serde_json::to_value(&response) {
                Ok(body) => InboundResponse::json(StatusCode::OK, outcome.response_headers, &body),
                Err(e) => error_response(ProxyError::Json(e), outcome.response_headers),
            },
            Err(error) => error_response(error, outcome.response_headers),
        }
    }

    fn prepare(
        &self,
        call: &InboundCall,
    ) -> Result<(OperationKind, String, Option<Value>, RequestHandle)> {
        let (kind, name) = self
            .route(&call.path)
            .ok_or_else(|| ProxyError::with_status(404, format!("No route for {}", call.path)))?;

        let expected = match kind {
            OperationKind::Query => Method::GET,
            OperationKind::Mutation => Method::POST,
        };
        if call.method != expected {
            return Err(ProxyError::MethodNotAllowed {
                method: call.method.to_string(),
                kind,
            });
        }

        let params = wire::decode_query_string(call.query.as_deref().unwrap_or(""))?;
        let variables = match kind {
            OperationKind::Query => params.variables,
            OperationKind::Mutation => decode_body(&call.body)?,
        };

        let request = RequestHandle {
            headers: call.headers.clone(),
            client_context: params.client_context,
        };

        Ok((kind, name.to_string(), variables, request))
    }
}

impl std::fmt::Debug for GraphQLProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQLProxy")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

fn decode_body(body: &Bytes) -> Result<Option<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| ProxyError::InvalidVariables(e.to_string()))?;
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => Ok(Some(value)),
        _ => Err(ProxyError::InvalidVariables(
            "variables must be a JSON object".to_string(),
        )),
    }
}

fn error_response(error: ProxyError, headers: HeaderMap) -> InboundResponse {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    info!(status = %status, error = %error, "GraphQL call failed");

    let mut body = json!({
        "statusCode": status.as_u16(),
        "message": error.to_string(),
    });
    if let Some(data) = error.transport_error().and_then(|e| e.body_json()) {
        body["data"] = data;
    }

    InboundResponse::json(status, headers, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GraphQLResponseError, StaticDocumentRegistry};
    use serde_json::json;

    fn proxy(hooks: HookSet) -> GraphQLProxy {
        let registry = StaticDocumentRegistry::new()
            .with_query("filmById", "query filmById($id: ID!) { film(id: $id) { title } }")
            .with_mutation("addFilm", "mutation addFilm($title: String!) { addFilm(title: $title) { id } }");
        let config = ProxyConfig::new("http://127.0.0.1:9/graphql");
        GraphQLProxy::new(config, hooks, Arc::new(registry)).unwrap()
    }

    fn echo_hooks() -> HookSet {
        HookSet::new().full_override(|ctx| async move {
            ctx.set_response_header("x-operation", ctx.operation_name())?;
            Ok(GraphQLResponse::from_data(json!({
                "kind": ctx.operation().as_str(),
                "variables": ctx.variables().clone(),
                "language": ctx.client_context("language"),
            })))
        })
    }

    #[test]
    fn test_route_matching() {
        let proxy = proxy(HookSet::new());
        assert_eq!(
            proxy.route("/api/graphql_middleware/query/filmById"),
            Some((OperationKind::Query, "filmById"))
        );
        assert_eq!(
            proxy.route("/api/graphql_middleware/mutation/addFilm"),
            Some((OperationKind::Mutation, "addFilm"))
        );
        assert_eq!(proxy.route("/api/graphql_middleware/subscription/x"), None);
        assert_eq!(proxy.route("/api/graphql_middleware/query/"), None);
        assert_eq!(proxy.route("/api/other/query/filmById"), None);
    }

    #[tokio::test]
    async fn test_query_call() {
        let proxy = proxy(echo_hooks());
        let call = InboundCall::new(
            Method::GET,
            "/api/graphql_middleware/query/filmById?id=123&__gqlc_language=de",
        );

        let response = proxy.handle(call).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers.get("x-operation").unwrap(), "filmById");

        let body: Value = response.body_json().unwrap();
        assert_eq!(
            body,
            json!({ "data": { "kind": "query", "variables": { "id": "123" }, "language": "de" } })
        );
    }

    #[tokio::test]
    async fn test_mutation_call() {
        let proxy = proxy(echo_hooks());
        let call = InboundCall::new(Method::POST, "/api/graphql_middleware/mutation/addFilm")
            .with_body(r#"{"title":"Rogue One"}"#);

        let body: Value = proxy.handle(call).await.body_json().unwrap();
        assert_eq!(body["data"]["variables"], json!({ "title": "Rogue One" }));
        assert_eq!(body["data"]["kind"], "mutation");
    }

    #[tokio::test]
    async fn test_mutation_without_body_has_empty_variables() {
        let proxy = proxy(echo_hooks());
        let call = InboundCall::new(Method::POST, "/api/graphql_middleware/mutation/addFilm");

        let body: Value = proxy.handle(call).await.body_json().unwrap();
        assert_eq!(body["data"]["variables"], json!({}));
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let proxy = proxy(echo_hooks());
        let call = InboundCall::new(Method::GET, "/api/graphql_middleware/query/missing");

        let response = proxy.handle(call).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        let body: Value = response.body_json().unwrap();
        assert_eq!(body["message"], "Unknown operation: missing");
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let proxy = proxy(echo_hooks());
        let call = InboundCall::new(Method::GET, "/api/graphql_middleware/mutation/addFilm");
        assert_eq!(proxy.handle(call).await.status, StatusCode::METHOD_NOT_ALLOWED);

        let call = InboundCall::new(Method::POST, "/api/graphql_middleware/query/filmById");
        assert_eq!(proxy.handle(call).await.status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_kind_mismatch() {
        let proxy = proxy(echo_hooks());
        let call = InboundCall::new(Method::GET, "/api/graphql_middleware/query/addFilm");
        assert_eq!(proxy.handle(call).await.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_mutation_body() {
        let proxy = proxy(echo_hooks());
        let call = InboundCall::new(Method::POST, "/api/graphql_middleware/mutation/addFilm")
            .with_body("[1,2]");
        assert_eq!(proxy.handle(call).await.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_hook_headers_survive_errors() {
        let hooks = HookSet::new().full_override(|ctx| async move {
            ctx.set_response_header("x-trace", "abc")?;
            Err(ProxyError::with_status(401, "unauthorized"))
        });
        let proxy = proxy(hooks);
        let call = InboundCall::new(Method::GET, "/api/graphql_middleware/query/filmById?id=1");

        let response = proxy.handle(call).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers.get("x-trace").unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_execute_returns_graphql_errors_as_data() {
        let hooks = HookSet::new().full_override(|_ctx| async {
            Ok(GraphQLResponse::from_errors(vec![GraphQLResponseError::new("denied")]))
        });
        let proxy = proxy(hooks);

        let outcome = proxy
            .execute(OperationKind::Query, "filmById", None, RequestHandle::new())
            .await;
        assert!(outcome.result.unwrap().has_errors());
    }
}
