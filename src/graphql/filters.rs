//! Query argument envelope for the unified API
//!
//! `where`, `orderBy`, `select` and `include` are opaque JSON passed through
//! verbatim; the server owns their schema. Only the field names and paging
//! knobs are typed here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Sort direction used by tables and multi-key sorting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (A-Z, 1-9, oldest-newest)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1, newest-oldest)
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Arguments accepted by the read operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryArgs {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: JsonValue) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, order_by: JsonValue) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Single-field ordering, `{ field: "asc" | "desc" }`.
    pub fn order_by_field(self, field: &str, order: SortOrder) -> Self {
        let mut ordering = Map::new();
        ordering.insert(field.to_string(), JsonValue::String(order.as_str().to_string()));
        self.order_by(JsonValue::Object(ordering))
    }

    pub fn select(mut self, select: JsonValue) -> Self {
        self.select = Some(select);
        self
    }

    pub fn include(mut self, include: JsonValue) -> Self {
        self.include = Some(include);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Serialize to the `input` object of a read operation.
    pub fn to_input(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_else(|_| JsonValue::Object(Map::new()))
    }
}

/// `select`/`include` masks for single-record reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<JsonValue>,
}

impl SelectArgs {
    pub fn select(mut self, select: JsonValue) -> Self {
        self.select = Some(select);
        self
    }

    pub fn include(mut self, include: JsonValue) -> Self {
        self.include = Some(include);
        self
    }

    /// Merge the masks into an existing input object.
    pub fn merge_into(&self, input: &mut Map<String, JsonValue>) {
        if let Some(select) = &self.select {
            input.insert("select".into(), select.clone());
        }
        if let Some(include) = &self.include {
            input.insert("include".into(), include.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_args_serialize_camel_case_and_skip_absent() {
        let args = QueryArgs::new()
            .filter(json!({"status": "ACTIVE"}))
            .order_by_field("createdAt", SortOrder::Desc)
            .limit(20);
        assert_eq!(
            args.to_input(),
            json!({
                "where": {"status": "ACTIVE"},
                "orderBy": {"createdAt": "desc"},
                "limit": 20
            })
        );
        assert_eq!(QueryArgs::new().to_input(), json!({}));
    }

    #[test]
    fn test_sort_order_reversed() {
        assert_eq!(SortOrder::Asc.reversed(), SortOrder::Desc);
        assert_eq!(SortOrder::default(), SortOrder::Asc);
    }
}
