//! # Armature GraphQL Proxy
//!
//! Server side of the Armature GraphQL middleware: receives named operation
//! calls from the browser, looks up their documents, and forwards them to the
//! real GraphQL server through a chain of overridable hooks.
//!
//! ## Features
//!
//! - **Named operations**: clients only send an operation name and variables
//! - **Hooks**: override endpoint, transport options, response and error handling
//! - **Full override**: take over the complete request lifecycle
//! - **Stable operation keys**: order-independent cache keys for payload caching
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use armature_graphql_proxy::{
//!     GraphQLProxy, HookSet, InboundCall, ProxyConfig, StaticDocumentRegistry,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = StaticDocumentRegistry::new()
//!         .with_query("filmById", "query filmById($id: ID!) { film(id: $id) { title } }");
//!
//!     let hooks = HookSet::new().on_error(|_ctx, error| async move {
//!         tracing::error!(%error, "upstream failed");
//!         Err(error.into())
//!     });
//!
//!     let proxy = GraphQLProxy::new(
//!         ProxyConfig::new("https://api.example.com/graphql"),
//!         hooks,
//!         Arc::new(registry),
//!     )?;
//!
//!     let response = proxy
//!         .handle(InboundCall::new(http::Method::GET, "/api/graphql_middleware/query/filmById?id=123"))
//!         .await;
//!
//!     println!("{}", response.status);
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod dispatcher;
mod error;
mod hooks;
mod operation;
mod registry;
mod response;
mod server;
mod transport;
pub mod wire;

pub use config::{ProxyConfig, ProxyConfigBuilder, DEFAULT_API_PREFIX};
pub use context::{InvocationContext, RequestHandle};
pub use dispatcher::Dispatcher;
pub use error::{ProxyError, Result, TransportError};
pub use hooks::{
    EndpointHookFn, ErrorHookFn, HookFuture, HookSet, OverrideHookFn, Resolution, ResponseHookFn,
    TransportOptionsHookFn,
};
pub use operation::{
    is_empty_variables, normalize_variables, OperationIdentity, OperationKey, OperationKind,
};
pub use registry::{DocumentRegistry, RegisteredOperation, StaticDocumentRegistry};
pub use response::{format_path, ErrorLocation, GraphQLResponse, GraphQLResponseError, PathSegment};
pub use server::{GraphQLProxy, InboundCall, InboundResponse, ProxyOutcome};
pub use transport::{
    GraphQLRequestBody, OutboundRequest, RawResponse, ReqwestTransport, Transport,
    TransportOptions,
};

// Re-export common types
pub use http::{HeaderMap, Method, StatusCode};
pub use serde_json::Value as JsonValue;
