//! Wire types shared by the client and dispatcher

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::util::errors::GraphqlError;

/// Records are untyped JSON objects; the server owns their schema.
pub type Record = JsonValue;

/// Opaque name of a backend model (e.g. `"Product"`). Not validated client-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelName(String);

impl ModelName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ModelName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Resolve a record id from either a JSON string or an object with a truthy
/// `id` (non-empty string or number).
pub fn resolve_record_id(target: &JsonValue) -> Option<String> {
    let id = match target {
        JsonValue::Object(fields) => fields.get("id")?,
        JsonValue::String(_) => target,
        _ => return None,
    };
    match id {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// A single GraphQL POST body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: &'static str,
    pub operation_name: &'static str,
    pub variables: JsonValue,
}

/// A GraphQL response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
}

impl GraphqlResponse {
    pub fn ok(data: JsonValue) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn with_errors(errors: Vec<GraphqlError>) -> Self {
        Self { data: None, errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_record_id() {
        assert_eq!(resolve_record_id(&json!("abc")), Some("abc".into()));
        assert_eq!(resolve_record_id(&json!({"id": "p-1"})), Some("p-1".into()));
        assert_eq!(resolve_record_id(&json!({"id": 42})), Some("42".into()));
        assert_eq!(resolve_record_id(&json!("")), None);
        assert_eq!(resolve_record_id(&json!({"id": ""})), None);
        assert_eq!(resolve_record_id(&json!({"id": 0})), None);
        assert_eq!(resolve_record_id(&json!({"sku": "A1"})), None);
        assert_eq!(resolve_record_id(&json!(null)), None);
        assert_eq!(resolve_record_id(&json!(7)), None);
    }

    #[test]
    fn test_model_name_serializes_as_string() {
        let model = ModelName::from("Product");
        assert_eq!(serde_json::to_value(&model).unwrap(), json!("Product"));
        assert_eq!(model.to_string(), "Product");
    }

    #[test]
    fn test_request_body_shape() {
        let req = GraphqlRequest {
            query: "query Q { q }",
            operation_name: "Q",
            variables: json!({}),
        };
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["operationName"], "Q");
    }
}
