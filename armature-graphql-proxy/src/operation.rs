//! Operation identity and cache key derivation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Hash component used when an operation has no variables.
const EMPTY_VARIABLES: &str = "empty";

/// Number of digest bytes kept in an operation key.
const KEY_DIGEST_BYTES: usize = 16;

/// Kind of a GraphQL operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Read-only query. Safe to cache and to send as GET.
    Query,
    /// Mutation. Never cached, always sent as POST.
    Mutation,
}

impl OperationKind {
    /// Lowercase name used in routes and keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }

    /// Whether results of this kind may be stored in a payload cache.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Self::Query)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "query" => Ok(Self::Query),
            "mutation" => Ok(Self::Mutation),
            other => Err(format!("unknown operation kind: {}", other)),
        }
    }
}

/// Name and kind of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationIdentity {
    /// Operation kind.
    pub kind: OperationKind,
    /// Operation name as declared in the document.
    pub name: String,
}

impl OperationIdentity {
    /// Create a new identity.
    pub fn new(kind: OperationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Query identity.
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(OperationKind::Query, name)
    }

    /// Mutation identity.
    pub fn mutation(name: impl Into<String>) -> Self {
        Self::new(OperationKind::Mutation, name)
    }

    /// Derive the cache key for these variables.
    pub fn key(&self, variables: Option<&Value>) -> OperationKey {
        OperationKey::build(self.kind, &self.name, variables)
    }
}

/// Stable identity of an invocation: kind, name and variables.
///
/// Structurally equal variables produce the same key regardless of the order
/// in which object keys were inserted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationKey(String);

impl OperationKey {
    /// Build the key for an operation invocation.
    pub fn build(kind: OperationKind, name: &str, variables: Option<&Value>) -> Self {
        let hash = match variables {
            Some(value) if !is_empty_variables(value) => {
                let mut canonical = String::new();
                write_canonical(value, &mut canonical);
                let digest = Sha256::digest(canonical.as_bytes());
                hex::encode(&digest[..KEY_DIGEST_BYTES])
            }
            _ => EMPTY_VARIABLES.to_string(),
        };

        Self(format!("{}:{}:{}", kind, name, hash))
    }

    /// Build the key from any serializable variables value.
    ///
    /// Fails if the value cannot be represented as JSON.
    pub fn from_serializable<T: Serialize + ?Sized>(
        kind: OperationKind,
        name: &str,
        variables: &T,
    ) -> std::result::Result<Self, serde_json::Error> {
        let value = serde_json::to_value(variables)?;
        Ok(Self::build(kind, name, Some(&value)))
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key and return the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OperationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// `null` and `{}` count as "no variables".
pub fn is_empty_variables(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Normalize absent, `null` and empty variables to `None`.
pub fn normalize_variables(variables: Option<Value>) -> Option<Value> {
    variables.filter(|value| !is_empty_variables(value))
}

/// Serialize a value as JSON with object keys sorted at every depth.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
