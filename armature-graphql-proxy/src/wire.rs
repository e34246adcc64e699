//! Query-string encoding of operation variables for inbound GET calls.
//!
//! When every variable is a string the variables travel as plain query
//! parameters (`?id=123`), which keeps URLs readable and cache-friendly.
//! Anything else is JSON-encoded under [`VARIABLES_PARAM`]. Client context
//! values are sent as `__gqlc_<key>` parameters.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::{ProxyError, Result};

/// Parameter holding JSON-encoded variables.
pub const VARIABLES_PARAM: &str = "__variables";

/// Prefix of client context parameters.
pub const CLIENT_CONTEXT_PREFIX: &str = "__gqlc_";

/// Encode variables and client context as query parameters.
pub fn encode_query_params(
    variables: Option<&Value>,
    client_context: &HashMap<String, String>,
) -> Result<Vec<(String, String)>> {
    let mut params = Vec::new();

    match variables {
        Some(Value::Object(map)) if is_plain(map) => {
            for (key, value) in map {
                if let Value::String(value) = value {
                    params.push((key.clone(), value.clone()));
                }
            }
        }
        Some(value) if !crate::is_empty_variables(value) => {
            params.push((VARIABLES_PARAM.to_string(), serde_json::to_string(value)?));
        }
        _ => {}
    }

    let mut context: Vec<_> = client_context.iter().collect();
    context.sort();
    for (key, value) in context {
        params.push((format!("{}{}", CLIENT_CONTEXT_PREFIX, key), value.clone()));
    }

    Ok(params)
}

/// Encode variables and client context as a query string (without `?`).
pub fn encode_query_string(
    variables: Option<&Value>,
    client_context: &HashMap<String, String>,
) -> Result<String> {
    let params = encode_query_params(variables, client_context)?;
    serde_urlencoded::to_string(&params)
        .map_err(|e| ProxyError::InvalidVariables(e.to_string()))
}

/// Decoded inbound query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedParams {
    /// Operation variables, `None` when no variables were sent.
    pub variables: Option<Value>,
    /// Client context values.
    pub client_context: HashMap<String, String>,
}

/// Decode query parameters produced by [`encode_query_params`].
pub fn decode_query_params<I, K, V>(pairs: I) -> Result<DecodedParams>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut plain = Map::new();
    let mut encoded = None;
    let mut client_context = HashMap::new();

    for (key, value) in pairs {
        let key = key.as_ref();
        if key == VARIABLES_PARAM {
            encoded = Some(value.into());
        } else if let Some(name) = key.strip_prefix(CLIENT_CONTEXT_PREFIX) {
            client_context.insert(name.to_string(), value.into());
        } else if !key.starts_with("__") {
            plain.insert(key.to_string(), Value::String(value.into()));
        }
    }

    let variables = match encoded {
        Some(json) => {
            let value: Value = serde_json::from_str(&json)
                .map_err(|e| ProxyError::InvalidVariables(e.to_string()))?;
            if !value.is_object() {
                return Err(ProxyError::InvalidVariables(
                    "variables must be a JSON object".to_string(),
                ));
            }
            Some(value)
        }
        None if plain.is_empty() => None,
        None => Some(Value::Object(plain)),
    };

    Ok(DecodedParams {
        variables,
        client_context,
    })
}

/// Decode a raw query string (without `?`).
pub fn decode_query_string(query: &str) -> Result<DecodedParams> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|e| ProxyError::InvalidVariables(e.to_string()))?;
    decode_query_params(pairs)
}

fn is_plain(map: &Map<String, Value>) -> bool {
    map.iter()
        .all(|(key, value)| value.is_string() && !key.starts_with("__"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> HashMap<String, String> {
        let mut context = HashMap::new();
        context.insert("language".to_string(), "de".to_string());
        context
    }

    #[test]
    fn test_string_variables_are_plain_params() {
        let params = encode_query_params(Some(&json!({ "id": "123" })), &HashMap::new()).unwrap();
        assert_eq!(params, vec![("id".to_string(), "123".to_string())]);
    }

    #[test]
    fn test_complex_variables_are_json_encoded() {
        let params =
            encode_query_params(Some(&json!({ "id": 123, "tags": ["a"] })), &HashMap::new()).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].0, VARIABLES_PARAM);

        let decoded = decode_query_params(params).unwrap();
        assert_eq!(decoded.variables, Some(json!({ "id": 123, "tags": ["a"] })));
    }

    #[test]
    fn test_query_string_round_trip_with_context() {
        let query = encode_query_string(Some(&json!({ "id": "1 2&3" })), &context()).unwrap();
        assert_eq!(query, "id=1+2%263&__gqlc_language=de");

        let decoded = decode_query_string(&query).unwrap();
        assert_eq!(decoded.variables, Some(json!({ "id": "1 2&3" })));
        assert_eq!(decoded.client_context.get("language").map(String::as_str), Some("de"));
    }

    #[test]
    fn test_empty_variables() {
        assert!(encode_query_params(None, &HashMap::new()).unwrap().is_empty());
        assert!(encode_query_params(Some(&json!({})), &HashMap::new()).unwrap().is_empty());
        assert_eq!(decode_query_string("").unwrap().variables, None);
    }

    #[test]
    fn test_invalid_encoded_variables() {
        let err = decode_query_string("__variables=%7Bnot-json").unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = decode_query_string("__variables=%5B1%5D").unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn test_reserved_keys_force_json_encoding() {
        let params = encode_query_params(Some(&json!({ "__typename": "x" })), &HashMap::new()).unwrap();
        assert_eq!(params[0].0, VARIABLES_PARAM);
    }
}
