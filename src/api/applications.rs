//! Application routes: builders applying to tasks and admins reviewing the
//! applications. One application per (task, builder) pair, enforced by the
//! store's unique constraint and checked here for a friendly error.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{bad_request, db_error, ApiError, AppState, BuilderRef};
use crate::database::{ApplicationRow, Database, DatabaseError};
use crate::models::{
    Application, ApplicationStatus, CreateApplicationRequest, Kpi, ReviewApplicationRequest, Task,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    #[serde(flatten)]
    pub application: Application,
    pub task: TaskWithKpis,
    pub builder: BuilderRef,
}

#[derive(Debug, Serialize)]
pub struct TaskWithKpis {
    #[serde(flatten)]
    pub task: Task,
    pub kpis: Vec<Kpi>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationsQuery {
    pub builder_email: Option<String>,
}

async fn application_response(
    db: &Database,
    row: ApplicationRow,
) -> Result<ApplicationResponse, DatabaseError> {
    let task = db.get_task(row.task_id).await?;
    let kpis = db.list_kpis_for_task(task.id).await?;
    let builder = db.get_user_by_id(row.builder_id).await?;

    Ok(ApplicationResponse {
        application: Application::from(row),
        task: TaskWithKpis {
            task: Task::from(task),
            kpis: kpis.into_iter().map(Kpi::from).collect(),
        },
        builder: BuilderRef {
            id: builder.id,
            email: builder.email,
            name: builder.name,
        },
    })
}

/// List applications, optionally restricted to one builder's email
pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationsQuery>,
) -> Result<Json<Vec<ApplicationResponse>>, ApiError> {
    let builder_id = match query.builder_email.as_deref() {
        Some(email) => {
            match state
                .db
                .find_user_by_email(email)
                .await
                .map_err(|e| db_error(e, "Builder not found", "fetch applications"))?
            {
                Some(builder) => Some(builder.id),
                // Unknown email filter: nothing to return
                None => return Ok(Json(Vec::new())),
            }
        }
        None => None,
    };

    let rows = state
        .db
        .list_applications(builder_id)
        .await
        .map_err(|e| db_error(e, "Application not found", "fetch applications"))?;

    let mut applications = Vec::with_capacity(rows.len());
    for row in rows {
        let application = application_response(&state.db, row)
            .await
            .map_err(|e| db_error(e, "Application not found", "fetch applications"))?;
        applications.push(application);
    }

    Ok(Json(applications))
}

/// Apply to a task. The builder is upserted by email.
pub async fn create_application(
    State(state): State<AppState>,
    Json(req): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationResponse>), ApiError> {
    let (task_id, builder_email, cover_letter) =
        match (req.task_id, req.builder_email.as_deref(), req.cover_letter.as_deref()) {
            (Some(task_id), Some(email), Some(letter))
                if !email.trim().is_empty() && !letter.trim().is_empty() =>
            {
                (task_id, email, letter)
            }
            _ => return Err(bad_request("Missing required fields")),
        };

    // Admin accounts self-identify through their email address
    let role = if builder_email.contains("admin") {
        "admin"
    } else {
        "builder"
    };
    let builder = state
        .db
        .upsert_user(builder_email, role)
        .await
        .map_err(|e| db_error(e, "Builder not found", "create application"))?;

    state
        .db
        .get_task(task_id)
        .await
        .map_err(|e| db_error(e, "Task not found", "create application"))?;

    let existing = state
        .db
        .find_application_by_task_and_builder(task_id, builder.id)
        .await
        .map_err(|e| db_error(e, "Application not found", "create application"))?;
    if existing.is_some() {
        return Err(bad_request("You have already applied to this task"));
    }

    let application_id = state
        .db
        .create_application(task_id, builder.id, cover_letter)
        .await
        .map_err(|e| db_error(e, "Application not found", "create application"))?;

    info!(
        application_id,
        task_id,
        builder = builder_email,
        "Application created"
    );

    let row = state
        .db
        .get_application(application_id)
        .await
        .map_err(|e| db_error(e, "Application not found", "create application"))?;
    let response = application_response(&state.db, row)
        .await
        .map_err(|e| db_error(e, "Application not found", "create application"))?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Fetch a single application with its task and builder
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let row = state
        .db
        .get_application(id)
        .await
        .map_err(|e| db_error(e, "Application not found", "fetch application"))?;

    let response = application_response(&state.db, row)
        .await
        .map_err(|e| db_error(e, "Application not found", "fetch application"))?;

    Ok(Json(response))
}

/// Review an application: set its status, notes and review timestamp
pub async fn review_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ReviewApplicationRequest>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let status = req
        .status
        .as_deref()
        .ok_or_else(|| bad_request("Status is required"))?;
    let status: ApplicationStatus = status.parse().map_err(|e: String| bad_request(&e))?;

    let reviewed_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    state
        .db
        .review_application(id, status.as_str(), req.review_notes.as_deref(), &reviewed_at)
        .await
        .map_err(|e| db_error(e, "Application not found", "update application"))?;

    info!(application_id = id, status = status.as_str(), "Application reviewed");

    let row = state
        .db
        .get_application(id)
        .await
        .map_err(|e| db_error(e, "Application not found", "update application"))?;
    let response = application_response(&state.db, row)
        .await
        .map_err(|e| db_error(e, "Application not found", "update application"))?;

    Ok(Json(response))
}

/// Withdraw or remove an application
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .delete_application(id)
        .await
        .map_err(|e| db_error(e, "Application not found", "delete application"))?;

    info!(application_id = id, "Application deleted");

    Ok(Json(
        serde_json::json!({ "message": "Application deleted successfully" }),
    ))
}
