//! REST Routes

use axum::{
    Router,
    routing::{get, patch},
};

use crate::api::app_state::AppState;
use crate::api::handlers::rest_handler::*;
use crate::models::{
    AgentOutput, Company, ComplianceTracking, HandoffJob, IntegrationData, KnowledgeSource,
    Laboratory, Notification, PerformanceMetric, Profile, Project, RegulatoryAlert,
};

fn writable<R: Writable>() -> Router<AppState> {
    Router::new()
        .route(&format!("/{}", R::TABLE), get(list_rows::<R>).post(create_row::<R>))
        .route(
            &format!("/{}/:id", R::TABLE),
            get(get_row::<R>).patch(update_row::<R>).delete(delete_row::<R>),
        )
}

fn read_only_table<R: Readable>() -> Router<AppState> {
    Router::new()
        .route(&format!("/{}", R::TABLE), get(list_rows::<R>).post(read_only::<R>))
        .route(
            &format!("/{}/:id", R::TABLE),
            get(get_row::<R>)
                .put(read_only::<R>)
                .patch(read_only::<R>)
                .delete(read_only::<R>),
        )
}

/// Table resources, mounted under `/rest/v1`
pub fn create_rest_router() -> Router<AppState> {
    Router::new()
        .merge(writable::<Profile>())
        .merge(writable::<Company>())
        .merge(writable::<Laboratory>())
        .merge(writable::<Project>())
        .merge(writable::<Notification>())
        .merge(writable::<KnowledgeSource>())
        .merge(writable::<PerformanceMetric>())
        .merge(writable::<IntegrationData>())
        .merge(writable::<ComplianceTracking>())
        .merge(read_only_table::<RegulatoryAlert>())
        .merge(read_only_table::<AgentOutput>())
        .route("/ai_handoff_jobs", get(list_rows::<HandoffJob>).post(enqueue_job))
        .route("/ai_handoff_jobs/:id", get(get_row::<HandoffJob>))
        .route("/notifications/:id/read", patch(mark_notification_read))
}
