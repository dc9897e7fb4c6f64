//! Edge function handlers, `POST /functions/v1/{name}`
//!
//! Every function takes a JSON body and answers JSON. Functions backed by
//! a paid upstream are rate limited per caller; service-role tokens (the
//! handoff dispatcher) are exempt.

use axum::{
    Json,
    extract::{Extension, State},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, warn};
use validator::Validate;

use crate::api::app_state::AppState;
use crate::api::dto::{CnpjRequest, HandoffRunRequest, MatchRequest, SentimentRequest};
use crate::error::{AppError, Result};
use crate::security::auth::Claims;
use crate::services::assistant::{ChatRequest, DocumentRequest, OrchestrateRequest};
use crate::services::checkout::CheckoutRequest;
use crate::services::cnpj::check_cnpj;
use crate::services::handoff::RunSummary;
use crate::services::knowledge::{IngestRequest, RagRequest};
use crate::services::matching::rank_laboratories;
use crate::services::regulatory::SyncRequest;
use crate::services::roi::{RoiInput, calculate_roi};
use crate::services::sentiment::analyze_sentiment;
use crate::storage::repository::Filter;

/// Laboratories scored per match request
const MAX_MATCHED_LABS: usize = 1_000;

/// Optional JSON body; a missing body reads as `{}`
type Body = Option<Json<Value>>;

fn parse<T: DeserializeOwned>(body: Body) -> Result<T> {
    let value = body.map(|Json(v)| v).unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|e| AppError::Validation(format!("invalid request body: {}", e)))
}

async fn rate_limit(state: &AppState, claims: &Claims, function: &str) -> Result<()> {
    if claims.is_service() {
        return Ok(());
    }
    state.rate_limiter.enforce(&claims.sub, function).await
}

fn respond<T: Serialize>(state: &AppState, function: &str, result: Result<T>) -> Result<Json<T>> {
    state.observability.metrics.record_function(function, result.is_ok());
    result.map(Json)
}

pub async fn ai_chatbot(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Body,
) -> Result<Json<impl Serialize>> {
    let request: ChatRequest = parse(body)?;
    rate_limit(&state, &claims, "ai-chatbot").await?;
    let result = state.assistant.chat(&claims.sub, request).await;
    respond(&state, "ai-chatbot", result)
}

pub async fn ai_document_assistant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Body,
) -> Result<Json<impl Serialize>> {
    let request: DocumentRequest = parse(body)?;
    rate_limit(&state, &claims, "ai-document-assistant").await?;
    let result = state.assistant.document(&claims.sub, request).await;
    respond(&state, "ai-document-assistant", result)
}

pub async fn ai_coordinator_orchestrator(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Body,
) -> Result<Json<impl Serialize>> {
    let request: OrchestrateRequest = parse(body)?;
    rate_limit(&state, &claims, "ai-coordinator-orchestrator").await?;
    let result = state.assistant.orchestrate(&claims.sub, request).await;
    respond(&state, "ai-coordinator-orchestrator", result)
}

pub async fn ai_handoff_runner(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Body,
) -> Result<Json<RunSummary>> {
    let request: HandoffRunRequest = parse(body)?;
    request.validate()?;
    let max_jobs = request.max_jobs.unwrap_or(state.config.handoff.batch_size);
    debug!(user_id = %claims.sub, max_jobs, "running handoff jobs on demand");

    let result = state.handoff.run_batch(max_jobs).await;
    if let Ok(summary) = &result {
        let metrics = &state.observability.metrics;
        metrics.record_handoff("completed", summary.completed as u64);
        metrics.record_handoff("failed", summary.failed as u64);
    }
    respond(&state, "ai-handoff-runner", result)
}

pub async fn kb_ingest(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Body,
) -> Result<Json<impl Serialize>> {
    let request: IngestRequest = parse(body)?;
    rate_limit(&state, &claims, "kb-ingest").await?;
    let result = state.knowledge.ingest(&claims.sub, request).await;
    respond(&state, "kb-ingest", result)
}

pub async fn kb_rag(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Body,
) -> Result<Json<impl Serialize>> {
    let request: RagRequest = parse(body)?;
    rate_limit(&state, &claims, "kb-rag").await?;
    let result = state.knowledge.ask(&claims.sub, request).await;
    respond(&state, "kb-rag", result)
}

pub async fn regulatory_sync(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Body,
) -> Result<Json<impl Serialize>> {
    let request: SyncRequest = parse(body)?;
    rate_limit(&state, &claims, "regulatory-sync").await?;
    let result = state.regulatory.sync(&claims.sub, request).await;
    respond(&state, "regulatory-sync", result)
}

pub async fn roi_calculator(State(state): State<AppState>, body: Body) -> Result<Json<impl Serialize>> {
    let input: RoiInput = parse(body)?;
    input.validate()?;
    respond(&state, "roi-calculator", Ok(calculate_roi(&input)))
}

pub async fn sentiment_analysis(State(state): State<AppState>, body: Body) -> Result<Json<impl Serialize>> {
    let request: SentimentRequest = parse(body)?;
    request.validate()?;
    respond(&state, "sentiment-analysis", Ok(analyze_sentiment(&request.text)))
}

pub async fn validate_cnpj(State(state): State<AppState>, body: Body) -> Result<Json<impl Serialize>> {
    let request: CnpjRequest = parse(body)?;
    respond(&state, "validate-cnpj", Ok(check_cnpj(&request.cnpj)))
}

pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Body,
) -> Result<Json<impl Serialize>> {
    let request: CheckoutRequest = parse(body)?;
    let result = state
        .checkout
        .create_session(&claims.sub, claims.email.as_deref(), request)
        .await;
    respond(&state, "create-checkout", result)
}

pub async fn match_score(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Body,
) -> Result<Json<Value>> {
    let request: MatchRequest = parse(body)?;
    request.validate()?;

    let company = state
        .tables
        .companies
        .get_by_id(&request.company_id)
        .await?
        .filter(|c| c.owner_id == claims.sub)
        .ok_or_else(|| AppError::NotFound(format!("company {}", request.company_id)))?;

    let labs = state
        .tables
        .laboratories
        .list(&Filter::new(), MAX_MATCHED_LABS, 0)
        .await?;
    if labs.len() == MAX_MATCHED_LABS {
        warn!(limit = MAX_MATCHED_LABS, "laboratory scan limit reached, older laboratories are not scored");
    }
    let matches = rank_laboratories(&company, &labs, request.limit.unwrap_or(10));

    respond(
        &state,
        "match-score",
        Ok(json!({"company_id": company.id, "matches": matches})),
    )
}
