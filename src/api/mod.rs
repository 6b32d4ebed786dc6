//! HTTP API Handlers
//!
//! JSON endpoints for the ambassador hub, one submodule per resource:
//! - `/api/tasks` - task CRUD plus the fund/start status transitions
//! - `/api/applications` - builders applying to tasks, admin review
//! - `/api/submissions` - deliverable submissions and their review
//! - `/api/payments` - payment records and the payment-processing stub
//! - `/api/profile` - auto-creating profile fetch and update
//! - `/api/admin/analytics` - dashboard aggregates
//!
//! Every error response is a JSON object `{ "error": "..." }` at status
//! 400, 404 or 500.

pub mod analytics;
pub mod applications;
pub mod payments;
pub mod profile;
pub mod submissions;
pub mod tasks;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::database::{Database, DatabaseError};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

pub type ApiError = (StatusCode, Json<serde_json::Value>);

pub(crate) fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
}

pub(crate) fn not_found(message: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": message })),
    )
}

/// Map a store error to an HTTP response: missing rows become a 404 with the
/// route's own message, everything else is logged and becomes a generic 500.
pub(crate) fn db_error(err: DatabaseError, not_found_message: &str, operation: &str) -> ApiError {
    match err {
        DatabaseError::NotFound(_) => not_found(not_found_message),
        err => {
            tracing::error!("Failed to {}: {}", operation, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("Failed to {}", operation) })),
            )
        }
    }
}

/// Builder fields embedded in application and submission responses
#[derive(Debug, Clone, Serialize)]
pub struct BuilderRef {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
}

/// Task fields embedded in submission responses
#[derive(Debug, Clone, Serialize)]
pub struct TaskBrief {
    pub id: i64,
    pub title: String,
    pub location: Option<String>,
    pub date: Option<String>,
    pub budget: f64,
}

async fn health() -> &'static str {
    "OK"
}

/// Build the API routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/api/tasks/{id}/fund", post(tasks::fund_task))
        .route("/api/tasks/{id}/start", post(tasks::start_task))
        .route(
            "/api/applications",
            get(applications::list_applications).post(applications::create_application),
        )
        .route(
            "/api/applications/{id}",
            get(applications::get_application)
                .put(applications::review_application)
                .delete(applications::delete_application),
        )
        .route(
            "/api/submissions",
            get(submissions::list_submissions).post(submissions::create_submission),
        )
        .route(
            "/api/submissions/{id}",
            get(submissions::get_submission).put(submissions::update_submission),
        )
        .route(
            "/api/payments",
            get(payments::list_payments).post(payments::record_payment),
        )
        .route("/api/payments/process", post(payments::process_payment))
        .route(
            "/api/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/api/builders/{id}/wallet", get(profile::get_builder_wallet))
        .route("/api/admin/analytics", get(analytics::get_analytics))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::AppState;
    use crate::database::Database;

    pub(crate) async fn test_state() -> AppState {
        let db = Database::new("sqlite::memory:")
            .await
            .expect("in-memory database");
        AppState::new(db)
    }
}
