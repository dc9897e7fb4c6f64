//! REST resource handlers, `/rest/v1/{table}`
//!
//! One set of generic handlers serves every table. Rows belong to the
//! caller through the record's owner field; rows of other users answer
//! 404 exactly like missing ones.

use async_trait::async_trait;
use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::debug;
use validator::Validate;

use crate::api::app_state::AppState;
use crate::api::dto::ListQuery;
use crate::error::{AppError, Result};
use crate::models::{
    AgentOutput, Company, ComplianceStatus, ComplianceTracking, HandoffJob, IntegrationData,
    KnowledgeSource, Laboratory, Notification, PerformanceMetric, Profile, Project, RegulatoryAlert,
    new_id,
};
use crate::security::auth::Claims;
use crate::services::cnpj::check_cnpj;
use crate::services::handoff::{EnqueueRequest, function_for_agent};
use crate::storage::factory::{Table, Tables};
use crate::storage::repository::{Filter, Record, Repository};

/// A table exposed for reading
pub trait Readable: Record {
    fn table(tables: &Tables) -> Table<Self>;
}

/// A table the caller may write through the generic handlers
#[async_trait]
pub trait Writable: Readable + Validate {
    /// Fields only the server sets, besides `id`, `created_at` and the owner
    const SERVER_FIELDS: &'static [&'static str] = &[];

    /// Normalize and check a row before it is stored
    fn prepare(&mut self) -> Result<()> {
        self.validate()?;
        Ok(())
    }

    async fn insert(state: &AppState, row: Self) -> Result<Self> {
        Self::table(&state.tables).create(&row).await
    }

    async fn remove(state: &AppState, _user_id: &str, row: &Self) -> Result<()> {
        Self::table(&state.tables).delete(row.id()).await?;
        Ok(())
    }
}

fn is_server_field<R: Writable>(field: &str) -> bool {
    field == "id" || field == "created_at" || R::OWNER_FIELD == Some(field) || R::SERVER_FIELDS.contains(&field)
}

fn into_object(body: Value) -> Result<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Validation("request body must be a JSON object".into())),
    }
}

fn from_object<R: Record>(object: Map<String, Value>) -> Result<R> {
    serde_json::from_value(Value::Object(object))
        .map_err(|e| AppError::Validation(format!("invalid {} row: {}", R::TABLE, e)))
}

fn belongs_to<R: Record>(row: &R, user_id: &str) -> Result<bool> {
    let Some(field) = R::OWNER_FIELD else {
        return Ok(true);
    };
    let value = serde_json::to_value(row)?;
    Ok(value.get(field).and_then(Value::as_str) == Some(user_id))
}

async fn find_visible<R: Readable>(state: &AppState, user_id: &str, id: &str) -> Result<R> {
    match R::table(&state.tables).get_by_id(id).await? {
        Some(row) if belongs_to(&row, user_id)? => Ok(row),
        _ => Err(AppError::NotFound(format!("{} {}", R::TABLE, id))),
    }
}

fn normalized_cnpj(raw: &str) -> Result<String> {
    let check = check_cnpj(raw);
    match (check.valid, check.digits) {
        (true, Some(digits)) => Ok(digits),
        _ => Err(AppError::Validation(format!(
            "invalid CNPJ: {}",
            check.reason.unwrap_or("malformed")
        ))),
    }
}

pub async fn list_rows<R: Readable>(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<R>>> {
    let filter = query.filter().owned_by::<R>(&claims.sub);
    let rows = R::table(&state.tables)
        .list(&filter, query.limit(), query.offset())
        .await?;
    Ok(Json(rows))
}

pub async fn get_row<R: Readable>(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<R>> {
    Ok(Json(find_visible::<R>(&state, &claims.sub, &id).await?))
}

pub async fn create_row<R: Writable>(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse> {
    let mut object = into_object(body)?;
    object.retain(|field, _| !is_server_field::<R>(field));
    object.insert("id".into(), json!(new_id()));
    object.insert("created_at".into(), json!(Utc::now()));
    if let Some(owner) = R::OWNER_FIELD {
        object.insert(owner.into(), json!(claims.sub));
    }

    let mut row: R = from_object(object)?;
    row.prepare()?;
    let row = R::insert(&state, row).await?;
    debug!(table = R::TABLE, id = row.id(), "row created");
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update_row<R: Writable>(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<R>> {
    let current = find_visible::<R>(&state, &claims.sub, &id).await?;
    let changes = into_object(body)?;

    let mut object = into_object(serde_json::to_value(&current)?)?;
    for (field, value) in changes {
        if !is_server_field::<R>(&field) {
            object.insert(field, value);
        }
    }

    let mut row: R = from_object(object)?;
    row.prepare()?;
    R::table(&state.tables)
        .update(&id, &row)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{} {}", R::TABLE, id)))
}

pub async fn delete_row<R: Writable>(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let row = find_visible::<R>(&state, &claims.sub, &id).await?;
    R::remove(&state, &claims.sub, &row).await?;
    debug!(table = R::TABLE, id = %id, "row deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Writes against a read-only table
pub async fn read_only<R: Readable>() -> Result<StatusCode> {
    Err(AppError::Authorization(format!("{} is read-only", R::TABLE)))
}

pub async fn enqueue_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<EnqueueRequest>,
) -> Result<impl IntoResponse> {
    if function_for_agent(&request.target_agent).is_none() {
        return Err(AppError::Validation(format!("unknown agent: {}", request.target_agent)));
    }
    let job = state
        .handoff
        .enqueue(&claims.sub, &request.source_agent, &request.target_agent, request.payload)
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Notification>> {
    Ok(Json(state.notifier.mark_read(&claims.sub, &id).await?))
}

macro_rules! readable {
    ($($model:ty => $field:ident),* $(,)?) => {
        $(
            impl Readable for $model {
                fn table(tables: &Tables) -> Table<Self> {
                    tables.$field.clone()
                }
            }
        )*
    };
}

readable! {
    Profile => profiles,
    Company => companies,
    Laboratory => laboratories,
    Project => projects,
    Notification => notifications,
    KnowledgeSource => knowledge_sources,
    AgentOutput => agent_outputs,
    HandoffJob => handoff_jobs,
    PerformanceMetric => performance_metrics,
    RegulatoryAlert => regulatory_alerts,
    IntegrationData => integration_data,
    ComplianceTracking => compliance_tracking,
}

#[async_trait]
impl Writable for Profile {
    const SERVER_FIELDS: &'static [&'static str] = &["updated_at"];

    fn prepare(&mut self) -> Result<()> {
        self.validate()?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// One profile per user
    async fn insert(state: &AppState, row: Self) -> Result<Self> {
        let existing = state
            .tables
            .profiles
            .count(&Filter::new().owned_by::<Profile>(&row.user_id))
            .await?;
        if existing > 0 {
            return Err(AppError::Validation("profile already exists".into()));
        }
        state.tables.profiles.create(&row).await
    }
}

#[async_trait]
impl Writable for Company {
    fn prepare(&mut self) -> Result<()> {
        self.validate()?;
        self.cnpj = normalized_cnpj(&self.cnpj)?;
        Ok(())
    }
}

#[async_trait]
impl Writable for Laboratory {
    fn prepare(&mut self) -> Result<()> {
        self.validate()?;
        if let Some(cnpj) = &self.cnpj {
            self.cnpj = Some(normalized_cnpj(cnpj)?);
        }
        Ok(())
    }
}

#[async_trait]
impl Writable for Project {}

#[async_trait]
impl Writable for Notification {
    /// Inserted rows reach the owner's realtime sockets
    async fn insert(state: &AppState, row: Self) -> Result<Self> {
        state.notifier.send(row).await
    }
}

#[async_trait]
impl Writable for KnowledgeSource {
    const SERVER_FIELDS: &'static [&'static str] = &["chunk_count"];

    async fn remove(state: &AppState, user_id: &str, row: &Self) -> Result<()> {
        state.knowledge.delete_source(user_id, &row.id).await?;
        Ok(())
    }
}

#[async_trait]
impl Writable for PerformanceMetric {}

#[async_trait]
impl Writable for IntegrationData {}

#[async_trait]
impl Writable for ComplianceTracking {
    /// Status follows the score
    fn prepare(&mut self) -> Result<()> {
        self.validate()?;
        self.status = ComplianceStatus::from_score(self.score);
        Ok(())
    }
}
