//! SurrealDB storage backend
//!
//! Each row is stored as `table:id` with content `{ doc: <row> }`, so the
//! row's own `id` string never collides with SurrealDB's record id.

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};
use tracing::info;

use crate::config::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::storage::repository::{Filter, Order, Record, Repository};

/// Shared SurrealDB connection
#[derive(Clone)]
pub struct SurrealStore {
    db: Surreal<Any>,
}

impl SurrealStore {
    /// Connect, sign in and select namespace/database
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db: Surreal<Any> = connect(config.url.as_str()).await?;

        if !config.url.starts_with("mem://") {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;

        info!(url = %config.url, namespace = %config.namespace, "connected to SurrealDB");
        Ok(Self { db })
    }

    /// Repository for one table
    pub fn repository<T: Record>(&self) -> SurrealRepository<T> {
        SurrealRepository {
            db: self.db.clone(),
            _marker: PhantomData,
        }
    }

    /// Round-trip a trivial query
    pub async fn ping(&self) -> Result<()> {
        self.db.query("RETURN 1").await?.check()?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(bound = "T: Serialize + serde::de::DeserializeOwned")]
struct Stored<T> {
    doc: T,
}

#[derive(Deserialize)]
struct CountRow {
    total: u64,
}

#[derive(Clone)]
pub struct SurrealRepository<T: Record> {
    db: Surreal<Any>,
    _marker: PhantomData<T>,
}

fn checked_field(field: &str) -> Result<&str> {
    if !field.is_empty() && field.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
        Ok(field)
    } else {
        Err(AppError::Validation(format!("invalid field name: {}", field)))
    }
}

impl<T: Record> SurrealRepository<T> {
    /// Build the WHERE clause and its bindings
    fn where_clause(filter: &Filter) -> Result<(String, Vec<(String, Value)>)> {
        let mut conditions = Vec::new();
        let mut bindings = Vec::new();

        for (i, (field, value)) in filter.eq.iter().enumerate() {
            let name = format!("p{}", i);
            conditions.push(format!("doc.{} = ${}", checked_field(field)?, name));
            bindings.push((name, value.clone()));
        }

        if let Some(since) = filter.created_after {
            // Same text form chrono's serde writes into `doc.created_at`
            conditions.push("doc.created_at >= $since".to_string());
            bindings.push((
                "since".to_string(),
                Value::String(since.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ));
        }

        if let Some(until) = filter.created_before {
            conditions.push("doc.created_at < $until".to_string());
            bindings.push((
                "until".to_string(),
                Value::String(until.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        Ok((clause, bindings))
    }
}

#[async_trait]
impl<T: Record> Repository<T> for SurrealRepository<T> {
    async fn create(&self, entity: &T) -> Result<T> {
        self.db
            .query("CREATE type::thing($tb, $id) CONTENT { doc: $doc } RETURN NONE")
            .bind(("tb", T::TABLE))
            .bind(("id", entity.id().to_string()))
            .bind(("doc", entity.clone()))
            .await?
            .check()?;
        Ok(entity.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        let rows: Vec<Stored<T>> = self
            .db
            .query("SELECT doc FROM type::thing($tb, $id)")
            .bind(("tb", T::TABLE))
            .bind(("id", id.to_string()))
            .await?
            .take(0)?;
        Ok(rows.into_iter().next().map(|row| row.doc))
    }

    async fn update(&self, id: &str, entity: &T) -> Result<Option<T>> {
        let rows: Vec<Stored<T>> = self
            .db
            .query("UPDATE type::thing($tb, $id) SET doc = $doc WHERE doc != NONE RETURN doc")
            .bind(("tb", T::TABLE))
            .bind(("id", id.to_string()))
            .bind(("doc", entity.clone()))
            .await?
            .take(0)?;
        Ok(rows.into_iter().next().map(|row| row.doc))
    }

    async fn update_if(&self, id: &str, field: &str, expected: &Value, entity: &T) -> Result<bool> {
        let query = format!(
            "UPDATE type::thing($tb, $id) SET doc = $doc WHERE doc.{} = $expected RETURN doc",
            checked_field(field)?
        );
        let rows: Vec<Stored<T>> = self
            .db
            .query(query)
            .bind(("tb", T::TABLE))
            .bind(("id", id.to_string()))
            .bind(("expected", expected.clone()))
            .bind(("doc", entity.clone()))
            .await?
            .take(0)?;
        Ok(!rows.is_empty())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let rows: Vec<Stored<T>> = self
            .db
            .query("DELETE type::thing($tb, $id) RETURN BEFORE")
            .bind(("tb", T::TABLE))
            .bind(("id", id.to_string()))
            .await?
            .take(0)?;
        Ok(!rows.is_empty())
    }

    async fn list(&self, filter: &Filter, limit: usize, start: usize) -> Result<Vec<T>> {
        let (clause, bindings) = Self::where_clause(filter)?;
        let direction = match filter.order {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        };
        let query = format!(
            "SELECT doc, doc.created_at AS created_at FROM type::table($tb){} ORDER BY created_at {} LIMIT $limit START $start",
            clause, direction
        );

        let mut request = self
            .db
            .query(query)
            .bind(("tb", T::TABLE))
            .bind(("limit", limit as i64))
            .bind(("start", start as i64));
        for (name, value) in bindings {
            request = request.bind((name, value));
        }

        let rows: Vec<Stored<T>> = request.await?.take(0)?;
        Ok(rows.into_iter().map(|row| row.doc).collect())
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        let (clause, bindings) = Self::where_clause(filter)?;
        let query = format!(
            "SELECT count() AS total FROM type::table($tb){} GROUP ALL",
            clause
        );

        let mut request = self.db.query(query).bind(("tb", T::TABLE));
        for (name, value) in bindings {
            request = request.bind((name, value));
        }

        let rows: Vec<CountRow> = request.await?.take(0)?;
        Ok(rows.first().map(|row| row.total).unwrap_or(0))
    }

    async fn purge(&self, filter: &Filter) -> Result<u64> {
        let (clause, bindings) = Self::where_clause(filter)?;
        let query = format!("DELETE FROM type::table($tb){} RETURN BEFORE", clause);

        let mut request = self.db.query(query).bind(("tb", T::TABLE));
        for (name, value) in bindings {
            request = request.bind((name, value));
        }

        let rows: Vec<Stored<T>> = request.await?.take(0)?;
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::{HandoffJob, JobStatus};
    use chrono::{Duration, Utc};
    use serde_json::json;

    async fn store() -> SurrealStore {
        let config = DatabaseConfig {
            backend: "surrealdb".into(),
            url: "mem://".into(),
            namespace: "pharmaconnect".into(),
            database: "test".into(),
            ..Default::default()
        };
        SurrealStore::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let store = store().await;
        store.ping().await.unwrap();
        let repo = store.repository::<HandoffJob>();
        let job = HandoffJob::new("u1", "coordinator", "chatbot", json!({"message": "oi"}));

        repo.create(&job).await.unwrap();
        let fetched = repo.get_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(fetched.target_agent, "chatbot");
        assert_eq!(fetched.payload, json!({"message": "oi"}));
        assert_eq!(fetched.created_at, job.created_at);

        let mut changed = fetched.clone();
        changed.complete(json!({"answer": "ok"}));
        let updated = repo.update(&job.id, &changed).await.unwrap().unwrap();
        assert_eq!(updated.status, JobStatus::Completed);
        assert!(repo.update("missing", &changed).await.unwrap().is_none());

        assert!(repo.delete(&job.id).await.unwrap());
        assert!(!repo.delete(&job.id).await.unwrap());
        assert!(repo.get_by_id(&job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_claim_loses() {
        let repo = store().await.repository::<HandoffJob>();
        let job = HandoffJob::new("u1", "coordinator", "roi", json!({}));
        repo.create(&job).await.unwrap();

        let pending = json!("pending");
        let claimed = job.claimed();
        assert!(repo.update_if(&job.id, "status", &pending, &claimed).await.unwrap());
        assert!(!repo.update_if(&job.id, "status", &pending, &job.claimed()).await.unwrap());
        assert!(!repo.update_if("missing", "status", &pending, &claimed).await.unwrap());

        let stored = repo.get_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Processing);
        assert_eq!(stored.attempts, 1);

        assert!(repo.update_if(&job.id, "status;", &pending, &claimed).await.is_err());
    }

    #[tokio::test]
    async fn test_list_order_filter_and_count_since() {
        let repo = store().await.repository::<HandoffJob>();
        let now = Utc::now();

        let mut old = HandoffJob::new("u1", "a", "chatbot", json!({}));
        old.created_at = now - Duration::minutes(10);
        let mut recent = HandoffJob::new("u1", "a", "roi", json!({}));
        recent.created_at = now - Duration::seconds(30);
        let other = HandoffJob::new("u2", "a", "roi", json!({}));
        for job in [&recent, &other, &old] {
            repo.create(job).await.unwrap();
        }

        let mine = Filter::new().eq("user_id", "u1");
        let newest = repo.list(&mine, 10, 0).await.unwrap();
        assert_eq!(newest.iter().map(|j| j.id.as_str()).collect::<Vec<_>>(), [recent.id.as_str(), old.id.as_str()]);

        let oldest = repo.list(&mine.clone().oldest_first(), 1, 0).await.unwrap();
        assert_eq!(oldest[0].id, old.id);
        let page = repo.list(&mine.clone().oldest_first(), 1, 1).await.unwrap();
        assert_eq!(page[0].id, recent.id);

        assert_eq!(repo.count(&Filter::new()).await.unwrap(), 3);
        assert_eq!(repo.count(&mine).await.unwrap(), 2);
        let window = mine.since(now - Duration::minutes(5));
        assert_eq!(repo.count(&window).await.unwrap(), 1);
        assert_eq!(repo.count(&Filter::new().eq("user_id", "nobody")).await.unwrap(), 0);

        let stale = Filter::new().before(now - Duration::minutes(5));
        assert_eq!(repo.purge(&stale).await.unwrap(), 1);
        assert!(repo.get_by_id(&old.id).await.unwrap().is_none());
        assert_eq!(repo.count(&Filter::new()).await.unwrap(), 2);
    }
}
