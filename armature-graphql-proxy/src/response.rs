//! GraphQL response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// GraphQL response as returned by the server and forwarded to callers.
///
/// Execution errors reported by the server stay in `errors`; they are data,
/// not a failed request.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GraphQLResponse<T = Value> {
    /// The data returned by the query/mutation.
    #[serde(default)]
    pub data: Option<T>,
    /// Errors returned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQLResponseError>>,
    /// Extensions (for tracing, caching info, etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl<T> GraphQLResponse<T> {
    /// Response carrying only data.
    pub fn from_data(data: T) -> Self {
        Self {
            data: Some(data),
            errors: None,
            extensions: None,
        }
    }

    /// Response carrying only errors.
    pub fn from_errors(errors: Vec<GraphQLResponseError>) -> Self {
        Self {
            data: None,
            errors: Some(errors),
            extensions: None,
        }
    }

    /// Check if the response has errors.
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Get the data, ignoring any errors.
    pub fn data(self) -> Option<T> {
        self.data
    }

    /// Get the errors.
    pub fn errors(&self) -> Option<&[GraphQLResponseError]> {
        self.errors.as_deref()
    }
}

/// A GraphQL error from the server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GraphQLResponseError {
    /// Error message.
    pub message: String,
    /// Locations in the query where the error occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<ErrorLocation>>,
    /// Path to the field that caused the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    /// Additional error extensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLResponseError {
    /// Error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }
}

impl std::fmt::Display for GraphQLResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(path) = &self.path
            && !path.is_empty()
        {
            write!(f, " (path: {})", format_path(path))?;
        }
        Ok(())
    }
}

/// Location in the GraphQL document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorLocation {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

/// Path segment in a GraphQL error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Field name.
    Field(String),
    /// Array index.
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{}", name),
            Self::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}

/// Format a path as a string.
pub fn format_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_errors_field_omitted_when_absent() {
        let response = GraphQLResponse::from_data(json!({ "film": { "title": "A New Hope" } }));
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded, json!({ "data": { "film": { "title": "A New Hope" } } }));
    }

    #[test]
    fn test_partial_data_with_errors() {
        let response: GraphQLResponse = serde_json::from_value(json!({
            "data": { "film": null },
            "errors": [{ "message": "not found", "path": ["film", 0] }]
        }))
        .unwrap();

        assert!(response.has_errors());
        let error = &response.errors().unwrap()[0];
        assert_eq!(error.to_string(), "not found (path: film.[0])");
        assert_eq!(response.data, Some(json!({ "film": null })));
    }

    #[test]
    fn test_null_data_serializes_as_null() {
        let response: GraphQLResponse =
            GraphQLResponse::from_errors(vec![GraphQLResponseError::new("upstream failure")]);
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(
            encoded,
            json!({ "data": null, "errors": [{ "message": "upstream failure" }] })
        );
    }
}
