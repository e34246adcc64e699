//! # Armature GraphQL Client
//!
//! Client side of the Armature GraphQL middleware. Operations are invoked by
//! name against the routes of a [`GraphQLProxy`](armature_graphql_proxy::GraphQLProxy);
//! the proxy owns the documents and forwards calls to the real server.
//!
//! ## Features
//!
//! - **Named operations**: `query("filmById", vars, opts)` or `query_with(args)`
//! - **Typed operations**: queries generated with `graphql_client`
//! - **Payload cache**: results keyed by stable operation keys
//! - **Reactive queries**: re-run queries when their variables change
//! - **In-process transport**: call a local proxy without HTTP
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use armature_graphql_client::{GraphQLClient, GraphQLClientConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GraphQLClient::new(GraphQLClientConfig::new("https://example.com"))?;
//!
//!     let response = client
//!         .query("filmById", Some(json!({ "id": "123" })), None)
//!         .await?;
//!
//!     println!("Film: {:?}", response.data);
//!     Ok(())
//! }
//! ```
//!
//! ## Reactive queries
//!
//! ```rust,ignore
//! use armature_graphql_client::{GraphQLClient, InMemoryPayloadCache, WatchOptions};
//! use serde_json::json;
//! use tokio::sync::watch;
//!
//! let client = client.with_cache(InMemoryPayloadCache::seeded(snapshot));
//! let (vars, rx) = watch::channel(Some(json!({ "id": "1" })));
//!
//! let watcher = client.watch_query("filmById", rx, WatchOptions::new().trust_cache(true));
//! let state = watcher.settled().await;
//!
//! vars.send(Some(json!({ "id": "2" })))?;
//! let state = watcher.settled().await;
//! ```

mod cache;
mod client;
mod config;
mod error;
mod reactive;
mod request;
mod transport;

pub use cache::{InMemoryPayloadCache, PayloadCache};
pub use client::GraphQLClient;
pub use config::{GraphQLClientConfig, GraphQLClientConfigBuilder};
pub use error::{GraphQLError, Result};
pub use reactive::{QueryState, QueryWatcher, WatchOptions};
pub use request::{FetchOptions, InvokeArgs, ProxyRequest};
pub use transport::{
    HttpProxyTransport, InProcessTransport, ProxyTransport, decode_proxy_response,
};

// Re-export common types
pub use armature_graphql_proxy::{GraphQLResponse, GraphQLResponseError, OperationKey, OperationKind};
pub use serde_json::Value as JsonValue;
