//! Function Routes

use axum::{Router, routing::post};

use crate::api::app_state::AppState;
use crate::api::handlers::function_handler::*;

/// Edge functions, mounted under `/functions/v1`
pub fn create_function_router() -> Router<AppState> {
    Router::new()
        .route("/ai-chatbot", post(ai_chatbot))
        .route("/ai-document-assistant", post(ai_document_assistant))
        .route("/ai-coordinator-orchestrator", post(ai_coordinator_orchestrator))
        .route("/ai-handoff-runner", post(ai_handoff_runner))
        .route("/kb-ingest", post(kb_ingest))
        .route("/kb-rag", post(kb_rag))
        .route("/regulatory-sync", post(regulatory_sync))
        .route("/roi-calculator", post(roi_calculator))
        .route("/sentiment-analysis", post(sentiment_analysis))
        .route("/create-checkout", post(create_checkout))
        .route("/validate-cnpj", post(validate_cnpj))
        .route("/match-score", post(match_score))
}
