//! In-memory storage backend
//!
//! Used for development and tests. Rows live in a `DashMap` per table;
//! `update_if` holds the entry lock while it compares and swaps.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::storage::repository::{Filter, Order, Record, Repository};

#[derive(Clone)]
pub struct MemoryRepository<T: Record> {
    rows: Arc<DashMap<String, T>>,
}

impl<T: Record> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(DashMap::new()),
        }
    }

    fn matching(&self, filter: &Filter) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for entry in self.rows.iter() {
            let row = entry.value();
            let value = serde_json::to_value(row)?;
            if filter.matches(&value, row.created_at()) {
                rows.push(row.clone());
            }
        }

        rows.sort_by_key(|row| row.created_at());
        if filter.order == Order::Descending {
            rows.reverse();
        }
        Ok(rows)
    }
}

#[async_trait]
impl<T: Record> Repository<T> for MemoryRepository<T> {
    async fn create(&self, entity: &T) -> Result<T> {
        match self.rows.entry(entity.id().to_string()) {
            Entry::Occupied(_) => Err(AppError::Database(format!(
                "duplicate id in {}: {}",
                T::TABLE,
                entity.id()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(entity.clone());
                Ok(entity.clone())
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        Ok(self.rows.get(id).map(|row| row.value().clone()))
    }

    async fn update(&self, id: &str, entity: &T) -> Result<Option<T>> {
        match self.rows.get_mut(id) {
            Some(mut row) => {
                *row = entity.clone();
                Ok(Some(entity.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update_if(&self, id: &str, field: &str, expected: &Value, entity: &T) -> Result<bool> {
        let Some(mut row) = self.rows.get_mut(id) else {
            return Ok(false);
        };
        let current = serde_json::to_value(row.value())?;
        if current.get(field) != Some(expected) {
            return Ok(false);
        }
        *row = entity.clone();
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.rows.remove(id).is_some())
    }

    async fn list(&self, filter: &Filter, limit: usize, start: usize) -> Result<Vec<T>> {
        Ok(self
            .matching(filter)?
            .into_iter()
            .skip(start)
            .take(limit)
            .collect())
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        Ok(self.matching(filter)?.len() as u64)
    }

    async fn purge(&self, filter: &Filter) -> Result<u64> {
        let mut removed = 0;
        for row in self.matching(filter)? {
            if self.rows.remove(row.id()).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::{HandoffJob, JobStatus};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_get_delete() {
        let repo = MemoryRepository::<HandoffJob>::new();
        let job = HandoffJob::new("u1", "coordinator", "chatbot", json!({"message": "oi"}));

        repo.create(&job).await.unwrap();
        assert!(repo.create(&job).await.is_err());

        let fetched = repo.get_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(fetched.target_agent, "chatbot");

        assert!(repo.delete(&job.id).await.unwrap());
        assert!(repo.get_by_id(&job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_if_only_applies_on_expected_value() {
        let repo = MemoryRepository::<HandoffJob>::new();
        let job = HandoffJob::new("u1", "coordinator", "chatbot", json!({}));
        repo.create(&job).await.unwrap();

        let mut claimed = job.clone();
        claimed.status = JobStatus::Processing;

        let pending = json!("pending");
        assert!(repo.update_if(&job.id, "status", &pending, &claimed).await.unwrap());
        // second claim sees "processing" and loses
        assert!(!repo.update_if(&job.id, "status", &pending, &claimed).await.unwrap());
        assert!(!repo.update_if("missing", "status", &pending, &claimed).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filter_and_order() {
        let repo = MemoryRepository::<HandoffJob>::new();
        let mut first = HandoffJob::new("u1", "a", "chatbot", json!({}));
        first.created_at = first.created_at - chrono::Duration::seconds(10);
        let second = HandoffJob::new("u1", "a", "roi", json!({}));
        let other = HandoffJob::new("u2", "a", "roi", json!({}));
        for job in [&first, &second, &other] {
            repo.create(job).await.unwrap();
        }

        let filter = Filter::new().eq("user_id", "u1").oldest_first();
        let rows = repo.list(&filter, 10, 0).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, first.id);

        let rows = repo.list(&Filter::new().eq("user_id", "u1"), 1, 0).await.unwrap();
        assert_eq!(rows[0].id, second.id);

        assert_eq!(repo.count(&Filter::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_purge_removes_only_matching_rows() {
        let repo = MemoryRepository::<HandoffJob>::new();
        let now = chrono::Utc::now();
        let mut stale = HandoffJob::new("u1", "a", "chatbot", json!({}));
        stale.created_at = now - chrono::Duration::minutes(10);
        let fresh = HandoffJob::new("u1", "a", "chatbot", json!({}));
        repo.create(&stale).await.unwrap();
        repo.create(&fresh).await.unwrap();

        let removed = repo
            .purge(&Filter::new().before(now - chrono::Duration::minutes(5)))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get_by_id(&stale.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&fresh.id).await.unwrap().is_some());
    }
}
