//! Overridable request hooks.
//!
//! Every hook is optional. With no hooks set the proxy forwards operations to
//! the configured default endpoint and returns the upstream response as is.
//!
//! ```rust,ignore
//! use armature_graphql_proxy::{HookSet, TransportOptions};
//!
//! let hooks = HookSet::new()
//!     .resolve_endpoint(|ctx| async move {
//!         let lang = ctx.client_context("language").unwrap_or("en").to_string();
//!         Ok(format!("https://api.example.com/{}/graphql", lang))
//!     })
//!     .resolve_transport_options(|ctx| async move {
//!         let cookie = ctx.request_header("cookie").unwrap_or_default().to_string();
//!         Ok(TransportOptions::new().header("Cookie", cookie))
//!     });
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

use crate::{
    GraphQLResponse, InvocationContext, ProxyConfig, RawResponse, Result, TransportError,
    TransportOptions,
};

/// Boxed future returned by hooks.
pub type HookFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Selects the upstream endpoint URL.
pub type EndpointHookFn = Arc<dyn Fn(Arc<InvocationContext>) -> HookFuture<String> + Send + Sync>;

/// Selects upstream transport options.
pub type TransportOptionsHookFn =
    Arc<dyn Fn(Arc<InvocationContext>) -> HookFuture<TransportOptions> + Send + Sync>;

/// Post-processes a successful upstream response.
pub type ResponseHookFn =
    Arc<dyn Fn(Arc<InvocationContext>, RawResponse) -> HookFuture<GraphQLResponse> + Send + Sync>;

/// Post-processes a failed upstream request.
pub type ErrorHookFn =
    Arc<dyn Fn(Arc<InvocationContext>, TransportError) -> HookFuture<GraphQLResponse> + Send + Sync>;

/// Replaces the whole request/response lifecycle.
pub type OverrideHookFn =
    Arc<dyn Fn(Arc<InvocationContext>) -> HookFuture<GraphQLResponse> + Send + Sync>;

/// Outcome of hook resolution for one invocation.
#[derive(Debug)]
pub enum Resolution {
    /// The full override produced the final result.
    Override(GraphQLResponse),
    /// Forward the operation upstream.
    Forward {
        /// Upstream endpoint URL.
        endpoint: String,
        /// Transport options for the request.
        options: TransportOptions,
    },
}

/// Set of optional hooks customizing the dispatch pipeline.
#[derive(Clone, Default)]
pub struct HookSet {
    pub(crate) endpoint: Option<EndpointHookFn>,
    pub(crate) transport_options: Option<TransportOptionsHookFn>,
    pub(crate) on_response: Option<ResponseHookFn>,
    pub(crate) on_error: Option<ErrorHookFn>,
    pub(crate) full_override: Option<OverrideHookFn>,
}

impl HookSet {
    /// Create an empty hook set (plain passthrough).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint hook.
    pub fn resolve_endpoint<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<InvocationContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.endpoint = Some(Arc::new(move |ctx| Box::pin(hook(ctx))));
        self
    }

    /// Set the transport options hook.
    pub fn resolve_transport_options<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<InvocationContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TransportOptions>> + Send + 'static,
    {
        self.transport_options = Some(Arc::new(move |ctx| Box::pin(hook(ctx))));
        self
    }

    /// Set the response hook.
    pub fn on_response<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<InvocationContext>, RawResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GraphQLResponse>> + Send + 'static,
    {
        self.on_response = Some(Arc::new(move |ctx, response| Box::pin(hook(ctx, response))));
        self
    }

    /// Set the error hook.
    ///
    /// Returning `Ok` turns the failure into a successful result; returning
    /// `Err` propagates that error instead of the transport error.
    pub fn on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<InvocationContext>, TransportError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GraphQLResponse>> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |ctx, error| Box::pin(hook(ctx, error))));
        self
    }

    /// Set the full override. When set, no other hook is ever called.
    pub fn full_override<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<InvocationContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GraphQLResponse>> + Send + 'static,
    {
        self.full_override = Some(Arc::new(move |ctx| Box::pin(hook(ctx))));
        self
    }

    /// Check if no hook is set.
    pub fn is_empty(&self) -> bool {
        self.endpoint.is_none()
            && self.transport_options.is_none()
            && self.on_response.is_none()
            && self.on_error.is_none()
            && self.full_override.is_none()
    }

    /// Resolve the override result or the endpoint and transport options.
    ///
    /// The endpoint hook runs before the transport options hook; each runs at
    /// most once.
    pub async fn resolve(
        &self,
        ctx: &Arc<InvocationContext>,
        config: &ProxyConfig,
    ) -> Result<Resolution> {
        if let Some(full_override) = &self.full_override {
            debug!(operation = %ctx.operation_name(), "Running full override hook");
            let response = full_override(Arc::clone(ctx)).await?;
            return Ok(Resolution::Override(response));
        }

        let endpoint = match &self.endpoint {
            Some(hook) => hook(Arc::clone(ctx)).await?,
            None => config.endpoint.clone(),
        };

        let options = match &self.transport_options {
            Some(hook) => hook(Arc::clone(ctx)).await?,
            None => config.default_transport_options(),
        };

        Ok(Resolution::Forward { endpoint, options })
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("resolve_endpoint", &self.endpoint.is_some())
            .field("resolve_transport_options", &self.transport_options.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("full_override", &self.full_override.is_some())
            .finish()
    }
}
