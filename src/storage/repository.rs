use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::Result;

/// A persisted row
///
/// Every table row has a string id and a creation time. Rows that belong to
/// a user name the field holding the owner id in `OWNER_FIELD`.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table name
    const TABLE: &'static str;

    /// Field holding the owning user id, if rows are user-scoped
    const OWNER_FIELD: Option<&'static str> = None;

    fn id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;
}

/// Result ordering on `created_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    Ascending,
    #[default]
    Descending,
}

/// Query filter: field equality plus an optional creation window
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Top-level field equality conditions, all must hold
    pub eq: Vec<(String, Value)>,
    /// Only rows created at or after this instant
    pub created_after: Option<DateTime<Utc>>,
    /// Only rows created strictly before this instant
    pub created_before: Option<DateTime<Utc>>,
    /// Ordering on `created_at`
    pub order: Order,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.eq.push((field.to_string(), value.into()));
        self
    }

    /// Restrict to rows created at or after `since`
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.created_after = Some(since);
        self
    }

    /// Restrict to rows created before `until`
    pub fn before(mut self, until: DateTime<Utc>) -> Self {
        self.created_before = Some(until);
        self
    }

    /// Oldest first
    pub fn oldest_first(mut self) -> Self {
        self.order = Order::Ascending;
        self
    }

    /// Scope to a user through the record's owner field
    pub fn owned_by<T: Record>(self, user_id: &str) -> Self {
        match T::OWNER_FIELD {
            Some(field) => self.eq(field, user_id),
            None => self,
        }
    }

    /// Check a serialized row against the filter
    pub fn matches(&self, row: &Value, created_at: DateTime<Utc>) -> bool {
        if let Some(since) = self.created_after {
            if created_at < since {
                return false;
            }
        }
        if let Some(until) = self.created_before {
            if created_at >= until {
                return false;
            }
        }
        self.eq
            .iter()
            .all(|(field, expected)| row.get(field) == Some(expected))
    }
}

/// Repository trait
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    /// Insert a row; fails if the id already exists
    async fn create(&self, entity: &T) -> Result<T>;

    /// Fetch by id
    async fn get_by_id(&self, id: &str) -> Result<Option<T>>;

    /// Replace a row; `None` if it does not exist
    async fn update(&self, id: &str, entity: &T) -> Result<Option<T>>;

    /// Replace a row only if its current `field` equals `expected`.
    ///
    /// Returns `false` when the row is missing or the condition failed.
    async fn update_if(&self, id: &str, field: &str, expected: &Value, entity: &T) -> Result<bool>;

    /// Delete by id
    async fn delete(&self, id: &str) -> Result<bool>;

    /// List rows matching a filter
    async fn list(&self, filter: &Filter, limit: usize, start: usize) -> Result<Vec<T>>;

    /// Count rows matching a filter
    async fn count(&self, filter: &Filter) -> Result<u64>;

    /// Delete every row matching a filter, returning how many went
    async fn purge(&self, filter: &Filter) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_filter_matches_fields_and_window() {
        let now = Utc::now();
        let row = json!({"user_id": "u1", "status": "pending"});

        let filter = Filter::new().eq("user_id", "u1").eq("status", "pending");
        assert!(filter.matches(&row, now));

        let filter = Filter::new().eq("status", "completed");
        assert!(!filter.matches(&row, now));

        let filter = Filter::new().since(now - Duration::minutes(5));
        assert!(filter.matches(&row, now));
        assert!(!filter.matches(&row, now - Duration::minutes(6)));

        let filter = Filter::new().before(now);
        assert!(filter.matches(&row, now - Duration::seconds(1)));
        assert!(!filter.matches(&row, now));
    }
}
