//! Per-invocation context shared by every hook.

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{OperationKind, ProxyError, Result};

/// Handle to the inbound call that triggered an invocation.
#[derive(Debug, Clone, Default)]
pub struct RequestHandle {
    /// Headers of the inbound request.
    pub headers: HeaderMap,
    /// Context values forwarded by the client alongside the variables.
    pub client_context: HashMap<String, String>,
}

impl RequestHandle {
    /// Create an empty handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach inbound headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add a client context value.
    pub fn with_client_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.client_context.insert(key.into(), value.into());
        self
    }
}

/// Everything known about one operation invocation.
///
/// Built once by the dispatcher and handed to every hook as the same
/// instance. The operation fields are read-only; hooks communicate through
/// the response-header side channel and the shared value slots.
#[derive(Debug)]
pub struct InvocationContext {
    operation: OperationKind,
    operation_name: String,
    operation_document: Arc<str>,
    variables: Value,
    request: RequestHandle,
    response_headers: Mutex<HeaderMap>,
    values: Mutex<HashMap<String, Value>>,
}

impl InvocationContext {
    /// Assemble the context for an invocation.
    ///
    /// Absent variables become an empty object.
    pub fn new(
        operation: OperationKind,
        operation_name: impl Into<String>,
        operation_document: Arc<str>,
        variables: Option<Value>,
        request: RequestHandle,
    ) -> Self {
        let variables = match variables {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value) => value,
        };

        Self {
            operation,
            operation_name: operation_name.into(),
            operation_document,
            variables,
            request,
            response_headers: Mutex::new(HeaderMap::new()),
            values: Mutex::new(HashMap::new()),
        }
    }

    /// Operation kind.
    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    /// Operation name.
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Document text sent upstream.
    pub fn operation_document(&self) -> &str {
        &self.operation_document
    }

    /// Operation variables (always a JSON object or caller-provided value).
    pub fn variables(&self) -> &Value {
        &self.variables
    }

    /// Inbound request handle.
    pub fn request(&self) -> &RequestHandle {
        &self.request
    }

    /// Get an inbound request header as a string.
    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.request
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    /// Get a client context value.
    pub fn client_context(&self, key: &str) -> Option<&str> {
        self.request.client_context.get(key).map(String::as_str)
    }

    /// Set a header on the inbound call's response, replacing existing values.
    pub fn set_response_header(&self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        self.response_headers.lock().insert(name, value);
        Ok(())
    }

    /// Append a header to the inbound call's response.
    pub fn append_response_header(&self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        self.response_headers.lock().append(name, value);
        Ok(())
    }

    /// Snapshot of the headers written so far.
    pub fn response_headers(&self) -> HeaderMap {
        self.response_headers.lock().clone()
    }

    /// Take the written headers, leaving the side channel empty.
    pub fn take_response_headers(&self) -> HeaderMap {
        std::mem::take(&mut *self.response_headers.lock())
    }

    /// Store a value for later hooks of the same invocation.
    pub fn set_value(&self, key: impl Into<String>, value: Value) {
        self.values.lock().insert(key.into(), value);
    }

    /// Read a value stored by an earlier hook.
    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name)
        .map_err(|e| ProxyError::hook(format!("invalid header name {:?}: {}", name, e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| ProxyError::hook(format!("invalid header value for {}: {}", name, e)))?;
    Ok((name, value))
}
