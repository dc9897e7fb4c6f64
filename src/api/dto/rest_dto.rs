//! REST DTOs

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::storage::repository::Filter;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

/// List query: `limit`, `offset`, `order=asc|desc`, and any other
/// `field=value` pair as an equality filter
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct ListQuery {
    pub params: HashMap<String, String>,
}

impl ListQuery {
    pub fn limit(&self) -> usize {
        self.params
            .get("limit")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> usize {
        self.params
            .get("offset")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Build the storage filter from the remaining parameters
    pub fn filter(&self) -> Filter {
        let mut filter = Filter::new();
        if self.params.get("order").map(String::as_str) == Some("asc") {
            filter = filter.oldest_first();
        }
        let mut fields: Vec<(&String, &String)> = self
            .params
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "limit" | "offset" | "order"))
            .collect();
        fields.sort();
        for (field, value) in fields {
            filter = filter.eq(field, query_value(value));
        }
        filter
    }
}

/// Query strings are untyped; booleans are the only non-string values
/// worth matching on
fn query_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::Order;

    fn query(pairs: &[(&str, &str)]) -> ListQuery {
        ListQuery {
            params: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn test_paging_defaults_and_clamp() {
        assert_eq!(query(&[]).limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(query(&[("limit", "100000")]).limit(), MAX_PAGE_SIZE);
        assert_eq!(query(&[("limit", "abc"), ("offset", "7")]).offset(), 7);
    }

    #[test]
    fn test_filter_fields() {
        let filter = query(&[("read", "false"), ("kind", "ai"), ("order", "asc"), ("limit", "5")]).filter();
        assert_eq!(filter.order, Order::Ascending);
        assert_eq!(
            filter.eq,
            vec![
                ("kind".to_string(), Value::String("ai".into())),
                ("read".to_string(), Value::Bool(false)),
            ]
        );
    }
}
