//! GraphQL client implementation.

use armature_graphql_proxy::{GraphQLResponse, OperationKind};
use graphql_client::GraphQLQuery;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    FetchOptions, GraphQLClientConfig, HttpProxyTransport, InvokeArgs, PayloadCache,
    ProxyRequest, ProxyTransport, QueryWatcher, Result, WatchOptions,
};

/// Client for the operations exposed by a GraphQL proxy.
///
/// Operations are called by name; the proxy holds the documents.
#[derive(Clone)]
pub struct GraphQLClient {
    transport: Arc<dyn ProxyTransport>,
    cache: Option<Arc<dyn PayloadCache>>,
}

impl GraphQLClient {
    /// Create a client talking to the proxy over HTTP.
    pub fn new(config: GraphQLClientConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpProxyTransport::new(config)?))
    }

    /// Create a client with a custom transport.
    pub fn with_transport(transport: impl ProxyTransport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            cache: None,
        }
    }

    /// Attach a payload cache used by query watchers.
    pub fn with_cache(mut self, cache: impl PayloadCache + 'static) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Get the payload cache, if any.
    pub fn cache(&self) -> Option<&Arc<dyn PayloadCache>> {
        self.cache.as_ref()
    }

    /// Execute a query.
    pub async fn query(
        &self,
        name: impl Into<String>,
        variables: Option<Value>,
        options: Option<FetchOptions>,
    ) -> Result<GraphQLResponse> {
        self.query_with(positional(name, variables, options)).await
    }

    /// Execute a query from object-shaped arguments.
    pub async fn query_with(&self, args: impl Into<InvokeArgs>) -> Result<GraphQLResponse> {
        self.execute(ProxyRequest::new(OperationKind::Query, args.into()))
            .await
    }

    /// Execute a mutation.
    pub async fn mutation(
        &self,
        name: impl Into<String>,
        variables: Option<Value>,
        options: Option<FetchOptions>,
    ) -> Result<GraphQLResponse> {
        self.mutation_with(positional(name, variables, options)).await
    }

    /// Execute a mutation from object-shaped arguments.
    pub async fn mutation_with(&self, args: impl Into<InvokeArgs>) -> Result<GraphQLResponse> {
        self.execute(ProxyRequest::new(OperationKind::Mutation, args.into()))
            .await
    }

    /// Execute a query generated with `graphql_client`.
    ///
    /// The operation name of the generated query selects the proxy operation.
    pub async fn query_typed<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<GraphQLResponse<Q::ResponseData>> {
        self.execute_typed::<Q>(OperationKind::Query, variables, FetchOptions::default())
            .await
    }

    /// Execute a mutation generated with `graphql_client`.
    pub async fn mutation_typed<M: GraphQLQuery>(
        &self,
        variables: M::Variables,
    ) -> Result<GraphQLResponse<M::ResponseData>> {
        self.execute_typed::<M>(OperationKind::Mutation, variables, FetchOptions::default())
            .await
    }

    /// Watch a query whose variables come from a watch channel.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch_query(
        &self,
        name: impl Into<String>,
        variables: watch::Receiver<Option<Value>>,
        options: WatchOptions,
    ) -> QueryWatcher {
        QueryWatcher::new(self.clone(), name, variables, options)
    }

    async fn execute_typed<Q: GraphQLQuery>(
        &self,
        kind: OperationKind,
        variables: Q::Variables,
        options: FetchOptions,
    ) -> Result<GraphQLResponse<Q::ResponseData>> {
        let body = Q::build_query(variables);
        let args = InvokeArgs::new(body.operation_name)
            .variables_from(&body.variables)?
            .fetch_options(options);

        let response = self.execute(ProxyRequest::new(kind, args)).await?;
        let data = match response.data {
            Some(Value::Null) | None => None,
            Some(data) => Some(serde_json::from_value(data)?),
        };

        Ok(GraphQLResponse {
            data,
            errors: response.errors,
            extensions: response.extensions,
        })
    }

    async fn execute(&self, request: ProxyRequest) -> Result<GraphQLResponse> {
        debug!(operation = %request.name, kind = %request.kind, "Executing GraphQL operation");

        let response = self.transport.send(request).await?;
        if response.has_errors() {
            debug!(
                errors = response.errors().map_or(0, |e| e.len()),
                "GraphQL response contains errors"
            );
        }
        Ok(response)
    }
}

impl std::fmt::Debug for GraphQLClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQLClient")
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

fn positional(
    name: impl Into<String>,
    variables: Option<Value>,
    options: Option<FetchOptions>,
) -> InvokeArgs {
    InvokeArgs {
        name: name.into(),
        variables,
        fetch_options: options.unwrap_or_default(),
    }
}
