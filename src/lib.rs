// Armature GraphQL Middleware
//
// Named-operation GraphQL proxy for Armature servers, and the client that
// calls it.

// Re-export the proxy
pub use armature_graphql_proxy::*;

// Re-export the client
#[cfg(feature = "client")]
pub use armature_graphql_client as client;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        DocumentRegistry, GraphQLProxy, GraphQLResponse, HookSet, InboundCall, InboundResponse,
        OperationKey, OperationKind, ProxyConfig, ProxyError, StaticDocumentRegistry,
        TransportError, TransportOptions,
    };

    #[cfg(feature = "client")]
    pub use crate::client::{
        FetchOptions, GraphQLClient, GraphQLClientConfig, InMemoryPayloadCache,
        InProcessTransport, InvokeArgs, PayloadCache, QueryState, QueryWatcher, WatchOptions,
    };
}
