//! Request dispatcher.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::hooks::Resolution;
use crate::{
    GraphQLResponse, HookSet, InvocationContext, OperationKind, OutboundRequest, ProxyConfig,
    ProxyError, RawResponse, ReqwestTransport, RequestHandle, Result, Transport, TransportError,
};

/// Executes operations against the GraphQL server.
///
/// Each dispatch either runs the full override hook or the standard chain
/// (endpoint, transport options, one outbound request, response/error hook),
/// never both.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<ProxyConfig>,
    hooks: HookSet,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    /// Create a dispatcher with an explicit transport.
    pub fn new(config: ProxyConfig, hooks: HookSet, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            hooks,
            transport,
        }
    }

    /// Create a dispatcher using the reqwest transport.
    pub fn with_reqwest(config: ProxyConfig, hooks: HookSet) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::new(config, hooks, Arc::new(transport)))
    }

    /// Get the configuration.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Get the configured hooks.
    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    /// Dispatch an operation.
    pub async fn dispatch(
        &self,
        kind: OperationKind,
        name: &str,
        document: Arc<str>,
        variables: Option<Value>,
        request: RequestHandle,
    ) -> Result<GraphQLResponse> {
        let ctx = Arc::new(InvocationContext::new(kind, name, document, variables, request));
        self.dispatch_context(&ctx).await
    }

    /// Dispatch with a pre-built context.
    ///
    /// The caller keeps the context to read side effects of the hooks, such
    /// as response headers, after the dispatch settles.
    pub async fn dispatch_context(&self, ctx: &Arc<InvocationContext>) -> Result<GraphQLResponse> {
        debug!(
            operation = %ctx.operation_name(),
            kind = %ctx.operation(),
            "Dispatching GraphQL operation"
        );

        let (endpoint, options) = match self.hooks.resolve(ctx, &self.config).await? {
            Resolution::Override(response) => return Ok(response),
            Resolution::Forward { endpoint, options } => (endpoint, options),
        };

        let request =
            OutboundRequest::for_invocation(ctx, endpoint, options, self.config.get_queries);

        match self.transport.execute(request).await {
            Ok(response) if response.is_success() => self.handle_response(ctx, response).await,
            Ok(response) => {
                warn!(
                    operation = %ctx.operation_name(),
                    status = %response.status(),
                    "GraphQL server responded with an error status"
                );
                self.handle_error(ctx, response.into_error()).await
            }
            Err(error) => {
                warn!(operation = %ctx.operation_name(), error = %error, "GraphQL request failed");
                self.handle_error(ctx, error).await
            }
        }
    }

    async fn handle_response(
        &self,
        ctx: &Arc<InvocationContext>,
        response: RawResponse,
    ) -> Result<GraphQLResponse> {
        if let Some(on_response) = &self.hooks.on_response {
            return on_response(Arc::clone(ctx), response).await;
        }

        match response.json::<GraphQLResponse>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                let mut error = TransportError::status(response.status().as_u16(), response.text());
                error.message = format!("invalid GraphQL response: {}", e);
                self.handle_error(ctx, error).await
            }
        }
    }

    async fn handle_error(
        &self,
        ctx: &Arc<InvocationContext>,
        error: TransportError,
    ) -> Result<GraphQLResponse> {
        match &self.hooks.on_error {
            Some(on_error) => on_error(Arc::clone(ctx), error).await,
            None => Err(ProxyError::Transport(error)),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish()
    }
}
