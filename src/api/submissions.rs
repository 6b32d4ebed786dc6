//! Submission routes: builders turning in deliverables against a task.
//!
//! KPI results are snapshotted at submission time. Each result copies the
//! KPI's name and target into the submission so later task edits do not
//! rewrite history.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{bad_request, db_error, not_found, ApiError, AppState, TaskBrief};
use crate::database::{Database, DatabaseError, NewKpiResult, NewSupportingFile, SubmissionRow};
use crate::models::{
    parse_finite_amount, CreateSubmissionRequest, KpiResult, Submission, SubmissionStatus,
    SupportingFile, UpdateSubmissionRequest,
};

/// Builder fields embedded in submission responses. Unlike the variant used
/// for applications this one carries the wallet address, which the payment
/// flow reads before paying out.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionBuilder {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    #[serde(flatten)]
    pub submission: Submission,
    pub task: TaskBrief,
    pub builder: SubmissionBuilder,
    pub kpi_results: Vec<KpiResult>,
    pub files: Vec<SupportingFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionsQuery {
    pub builder_email: Option<String>,
}

async fn submission_response(
    db: &Database,
    row: SubmissionRow,
) -> Result<SubmissionResponse, DatabaseError> {
    let task = db.get_task(row.task_id).await?;
    let builder = db.get_user_by_id(row.builder_id).await?;
    let kpi_results = db.list_kpi_results(row.id).await?;
    let files = db.list_supporting_files(row.id).await?;

    Ok(SubmissionResponse {
        submission: Submission::from(row),
        task: TaskBrief {
            id: task.id,
            title: task.title,
            location: task.location,
            date: task.date,
            budget: task.budget,
        },
        builder: SubmissionBuilder {
            id: builder.id,
            email: builder.email,
            name: builder.name,
            wallet_address: builder.wallet_address,
        },
        kpi_results: kpi_results.into_iter().map(KpiResult::from).collect(),
        files: files.into_iter().map(SupportingFile::from).collect(),
    })
}

/// List submissions, optionally restricted to one builder's email
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<SubmissionsQuery>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let builder_id = match query.builder_email.as_deref() {
        Some(email) => {
            let builder = state
                .db
                .find_user_by_email(email)
                .await
                .map_err(|e| db_error(e, "Builder not found", "fetch submissions"))?
                .ok_or_else(|| not_found("Builder not found"))?;
            Some(builder.id)
        }
        None => None,
    };

    let rows = state
        .db
        .list_submissions(builder_id)
        .await
        .map_err(|e| db_error(e, "Submission not found", "fetch submissions"))?;

    let mut submissions = Vec::with_capacity(rows.len());
    for row in rows {
        let submission = submission_response(&state.db, row)
            .await
            .map_err(|e| db_error(e, "Submission not found", "fetch submissions"))?;
        submissions.push(submission);
    }

    Ok(Json(submissions))
}

/// Submit work for a task, with KPI results and supporting file references.
/// Only file metadata is recorded; bytes live wherever the url points.
pub async fn create_submission(
    State(state): State<AppState>,
    Json(req): Json<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let (task_id, builder_email, summary) =
        match (req.task_id, req.builder_email.as_deref(), req.summary.as_deref()) {
            (Some(task_id), Some(email), Some(summary))
                if !email.trim().is_empty() && !summary.trim().is_empty() =>
            {
                (task_id, email, summary)
            }
            _ => return Err(bad_request("Missing required fields")),
        };

    let builder = state
        .db
        .find_user_by_email(builder_email)
        .await
        .map_err(|e| db_error(e, "Builder not found", "create submission"))?
        .ok_or_else(|| not_found("Builder not found"))?;

    state
        .db
        .get_task(task_id)
        .await
        .map_err(|e| db_error(e, "Task not found", "create submission"))?;

    // Drafts stay drafts, everything else goes straight to review
    let status = match req.status.as_deref() {
        Some(s) if s == SubmissionStatus::Draft.as_str() => SubmissionStatus::Draft,
        _ => SubmissionStatus::PendingReview,
    };

    let mut kpi_results = Vec::new();
    for result in req.kpi_results.unwrap_or_default() {
        let kpi = state
            .db
            .find_kpi(result.kpi_id)
            .await
            .map_err(|e| db_error(e, "KPI not found", "create submission"))?;
        let (name, target) = match kpi {
            Some(kpi) => (kpi.name, kpi.target),
            // Stale KPI ids still get recorded, just without a snapshot
            None => ("Unknown KPI".to_string(), "N/A".to_string()),
        };
        kpi_results.push(NewKpiResult {
            name,
            target,
            achieved: result.achieved_value,
            status: "Pending".to_string(),
        });
    }

    let files: Vec<NewSupportingFile> = req
        .files
        .unwrap_or_default()
        .into_iter()
        .map(|file| NewSupportingFile {
            name: file.name,
            size: file.size,
            file_type: file.file_type,
            url: file.url,
        })
        .collect();

    let submission_id = state
        .db
        .create_submission(
            task_id,
            builder.id,
            summary,
            status.as_str(),
            &kpi_results,
            &files,
        )
        .await
        .map_err(|e| db_error(e, "Submission not found", "create submission"))?;

    info!(
        submission_id,
        task_id,
        builder = builder_email,
        status = status.as_str(),
        "Submission created"
    );

    let row = state
        .db
        .get_submission(submission_id)
        .await
        .map_err(|e| db_error(e, "Submission not found", "create submission"))?;
    let response = submission_response(&state.db, row)
        .await
        .map_err(|e| db_error(e, "Submission not found", "create submission"))?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Fetch a single submission with its task, builder, results and files
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let row = state
        .db
        .get_submission(id)
        .await
        .map_err(|e| db_error(e, "Submission not found", "fetch submission"))?;

    let response = submission_response(&state.db, row)
        .await
        .map_err(|e| db_error(e, "Submission not found", "fetch submission"))?;

    Ok(Json(response))
}

/// Review a submission: update status, notes and the payout amount
pub async fn update_submission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSubmissionRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let status = match req.status.as_deref() {
        Some(s) => {
            let status: SubmissionStatus = s.parse().map_err(|e: String| bad_request(&e))?;
            Some(status)
        }
        None => None,
    };

    let amount = match req.amount.as_ref() {
        Some(value) => Some(
            parse_finite_amount(value)
                .ok_or_else(|| bad_request("Amount must be a finite number"))?,
        ),
        None => None,
    };

    state
        .db
        .update_submission(
            id,
            status.as_ref().map(SubmissionStatus::as_str),
            req.review_notes.as_deref(),
            amount,
        )
        .await
        .map_err(|e| db_error(e, "Submission not found", "update submission"))?;

    if let Some(status) = &status {
        info!(submission_id = id, status = status.as_str(), "Submission reviewed");
    }

    let row = state
        .db
        .get_submission(id)
        .await
        .map_err(|e| db_error(e, "Submission not found", "update submission"))?;
    let response = submission_response(&state.db, row)
        .await
        .map_err(|e| db_error(e, "Submission not found", "update submission"))?;

    Ok(Json(response))
}
