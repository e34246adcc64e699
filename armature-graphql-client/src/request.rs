//! Invocation arguments.

use armature_graphql_proxy::{normalize_variables, wire, OperationKey, OperationKind};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::Result;

/// Per-call options for the request to the proxy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    /// Extra headers for this call.
    pub headers: Vec<(String, String)>,
    /// Timeout for this call.
    pub timeout: Option<Duration>,
    /// Values forwarded to the server-side hooks as client context.
    pub client_context: HashMap<String, String>,
}

impl FetchOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header for this call.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a custom timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a client context value.
    pub fn client_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.client_context.insert(key.into(), value.into());
        self
    }
}

/// Object-shaped invocation arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvokeArgs {
    /// Operation name.
    pub name: String,
    /// Operation variables.
    pub variables: Option<Value>,
    /// Options for the request to the proxy.
    pub fetch_options: FetchOptions,
}

impl InvokeArgs {
    /// Arguments for an operation without variables.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set variables from a JSON value.
    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Set variables from any serializable value.
    pub fn variables_from<T: Serialize>(mut self, variables: &T) -> Result<Self> {
        self.variables = Some(serde_json::to_value(variables)?);
        Ok(self)
    }

    /// Set a single variable.
    ///
    /// Variables that are not a JSON object are replaced by an object holding
    /// only this entry.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = match self.variables.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        map.insert(name.into(), value.into());
        self.variables = Some(Value::Object(map));
        self
    }

    /// Set the fetch options.
    pub fn fetch_options(mut self, options: FetchOptions) -> Self {
        self.fetch_options = options;
        self
    }
}

impl From<&str> for InvokeArgs {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for InvokeArgs {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A call to the proxy, as sent by a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    /// Operation kind.
    pub kind: OperationKind,
    /// Operation name.
    pub name: String,
    /// Variables; empty variables are normalized to `None`.
    pub variables: Option<Value>,
    /// Fetch options.
    pub options: FetchOptions,
}

impl ProxyRequest {
    /// Build a request from invocation arguments.
    pub fn new(kind: OperationKind, args: InvokeArgs) -> Self {
        Self {
            kind,
            name: args.name,
            variables: normalize_variables(args.variables),
            options: args.fetch_options,
        }
    }

    /// Cache key of this call.
    pub fn key(&self) -> OperationKey {
        OperationKey::build(self.kind, &self.name, self.variables.as_ref())
    }

    /// Route path below the proxy prefix.
    pub fn path(&self, prefix: &str) -> String {
        format!("{}/{}/{}", prefix.trim_end_matches('/'), self.kind, self.name)
    }

    /// Query string: variables for queries, client context for both kinds.
    pub fn query_string(&self) -> Result<String> {
        let variables = match self.kind {
            OperationKind::Query => self.variables.as_ref(),
            OperationKind::Mutation => None,
        };
        Ok(wire::encode_query_string(variables, &self.options.client_context)?)
    }

    /// JSON body for mutations.
    pub fn body(&self) -> Option<Value> {
        match self.kind {
            OperationKind::Query => None,
            OperationKind::Mutation => Some(
                self.variables
                    .clone()
                    .unwrap_or_else(|| Value::Object(Default::default())),
            ),
        }
    }

    /// Path and query string.
    pub fn uri(&self, prefix: &str) -> Result<String> {
        let path = self.path(prefix);
        let query = self.query_string()?;
        if query.is_empty() {
            Ok(path)
        } else {
            Ok(format!("{}?{}", path, query))
        }
    }
}
