//! Task routes: CRUD over tasks and their KPI requirements, plus the two
//! funding-related status transitions (`fund`, `start`).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{bad_request, db_error, ApiError, AppState};
use crate::database::{Database, DatabaseError, NewKpi, NewTask, TaskRow};
use crate::models::{
    parse_finite_amount, FundTaskRequest, Kpi, Task, TaskRequest, TaskStatus, TaskType,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,
    pub kpis: Vec<Kpi>,
    pub current_applicants: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetailResponse {
    #[serde(flatten)]
    pub task: Task,
    pub kpis: Vec<Kpi>,
    pub current_applicants: i64,
    pub applications: Vec<TaskApplicationSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskApplicationSummary {
    pub id: i64,
    pub task_id: i64,
    pub builder_id: i64,
    pub builder_email: String,
    pub builder_name: Option<String>,
    pub cover_letter: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct TasksQuery {
    pub status: Option<String>,
}

/// Validated create/update payload, after the route-layer checks
struct TaskPayload {
    title: String,
    description: String,
    task_type: TaskType,
    location: Option<String>,
    date: Option<String>,
    budget: f64,
}

fn validate_task_payload(req: &TaskRequest) -> Result<TaskPayload, ApiError> {
    let title = req.title.as_deref().map(str::trim).unwrap_or_default();
    let description = req.description.as_deref().map(str::trim).unwrap_or_default();
    let task_type = req.task_type.as_deref().unwrap_or_default();

    if title.is_empty() || description.is_empty() || task_type.is_empty() {
        return Err(bad_request("Missing required fields"));
    }

    let task_type: TaskType = task_type.parse().map_err(|e: String| bad_request(&e))?;

    let budget = req
        .budget
        .as_ref()
        .ok_or_else(|| bad_request("Missing required fields"))?;
    let budget = parse_finite_amount(budget)
        .ok_or_else(|| bad_request("Budget must be a finite number"))?;

    let location = req
        .location
        .clone()
        .filter(|location| !location.trim().is_empty());
    let date = req.date.clone().filter(|date| !date.trim().is_empty());

    // Location and date only make sense for event tasks; the original
    // nulls them out for every other type.
    let (location, date) = if task_type.requires_location_and_date() {
        if location.is_none() || date.is_none() {
            return Err(bad_request(
                "Location and date are required for Workshop, Hackathon and Meetup tasks",
            ));
        }
        (location, date)
    } else {
        (None, None)
    };

    Ok(TaskPayload {
        title: title.to_string(),
        description: description.to_string(),
        task_type,
        location,
        date,
        budget,
    })
}

async fn task_with_meta(db: &Database, row: TaskRow) -> Result<TaskResponse, DatabaseError> {
    let kpis = db.list_kpis_for_task(row.id).await?;
    let current_applicants = db.count_applications_for_task(row.id).await?;

    Ok(TaskResponse {
        task: Task::from(row),
        kpis: kpis.into_iter().map(Kpi::from).collect(),
        current_applicants,
    })
}

/// List tasks, optionally filtered by status, with KPIs and applicant counts
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TasksQuery>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let status = match query.status.as_deref() {
        Some(status) => Some(
            status
                .parse::<TaskStatus>()
                .map_err(|e: String| bad_request(&e))?,
        ),
        None => None,
    };

    let rows = state
        .db
        .list_tasks(status.map(|s| s.as_str()))
        .await
        .map_err(|e| db_error(e, "Task not found", "fetch tasks"))?;

    let mut tasks = Vec::with_capacity(rows.len());
    for row in rows {
        let task = task_with_meta(&state.db, row)
            .await
            .map_err(|e| db_error(e, "Task not found", "fetch tasks"))?;
        tasks.push(task);
    }

    Ok(Json(tasks))
}

/// Create a new task with its KPI requirements
pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let payload = validate_task_payload(&req)?;

    let created_by = match req.creator_email.as_deref() {
        Some(email) => {
            let creator = state
                .db
                .upsert_user(email, "admin")
                .await
                .map_err(|e| db_error(e, "User not found", "create task"))?;
            Some(creator.id)
        }
        None => None,
    };

    let kpi_inputs = req.kpis.as_deref().unwrap_or_default();
    let kpis: Vec<NewKpi<'_>> = kpi_inputs
        .iter()
        .map(|kpi| NewKpi {
            name: &kpi.name,
            target: &kpi.target,
            description: kpi.description.as_deref(),
        })
        .collect();

    let new_task = NewTask {
        title: &payload.title,
        description: &payload.description,
        task_type: payload.task_type.as_str(),
        location: payload.location.as_deref(),
        date: payload.date.as_deref(),
        budget: payload.budget,
        created_by,
    };

    let task_id = state
        .db
        .create_task(&new_task, &kpis)
        .await
        .map_err(|e| db_error(e, "Task not found", "create task"))?;

    info!(task_id, title = payload.title, "Task created");

    let row = state
        .db
        .get_task(task_id)
        .await
        .map_err(|e| db_error(e, "Task not found", "create task"))?;
    let response = task_with_meta(&state.db, row)
        .await
        .map_err(|e| db_error(e, "Task not found", "create task"))?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Fetch a single task with KPIs and its applications
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TaskDetailResponse>, ApiError> {
    let row = state
        .db
        .get_task(id)
        .await
        .map_err(|e| db_error(e, "Task not found", "fetch task"))?;

    let kpis = state
        .db
        .list_kpis_for_task(row.id)
        .await
        .map_err(|e| db_error(e, "Task not found", "fetch task"))?;
    let applications = state
        .db
        .list_applications_for_task(row.id)
        .await
        .map_err(|e| db_error(e, "Task not found", "fetch task"))?;
    let current_applicants = applications.len() as i64;

    Ok(Json(TaskDetailResponse {
        task: Task::from(row),
        kpis: kpis.into_iter().map(Kpi::from).collect(),
        current_applicants,
        applications: applications
            .into_iter()
            .map(|app| TaskApplicationSummary {
                id: app.id,
                task_id: app.task_id,
                builder_id: app.builder_id,
                builder_email: app.builder_email,
                builder_name: app.builder_name,
                cover_letter: app.cover_letter,
                status: app.status,
                created_at: app.created_at,
            })
            .collect(),
    }))
}

/// Update a task; when `kpis` is present the KPI set is replaced wholesale
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<TaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let payload = validate_task_payload(&req)?;

    let status = match req.status.as_deref() {
        Some(status) => Some(
            status
                .parse::<TaskStatus>()
                .map_err(|e: String| bad_request(&e))?,
        ),
        None => None,
    };

    let kpis: Option<Vec<NewKpi<'_>>> = req.kpis.as_deref().map(|inputs| {
        inputs
            .iter()
            .map(|kpi| NewKpi {
                name: &kpi.name,
                target: &kpi.target,
                description: kpi.description.as_deref(),
            })
            .collect()
    });

    let new_task = NewTask {
        title: &payload.title,
        description: &payload.description,
        task_type: payload.task_type.as_str(),
        location: payload.location.as_deref(),
        date: payload.date.as_deref(),
        budget: payload.budget,
        created_by: None,
    };

    state
        .db
        .update_task(id, &new_task, status.map(|s| s.as_str()), kpis.as_deref())
        .await
        .map_err(|e| db_error(e, "Task not found", "update task"))?;

    info!(task_id = id, "Task updated");

    let row = state
        .db
        .get_task(id)
        .await
        .map_err(|e| db_error(e, "Task not found", "update task"))?;
    let response = task_with_meta(&state.db, row)
        .await
        .map_err(|e| db_error(e, "Task not found", "update task"))?;

    Ok(Json(response))
}

/// Delete a task; KPIs and applications cascade
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .delete_task(id)
        .await
        .map_err(|e| db_error(e, "Task not found", "delete task"))?;

    info!(task_id = id, "Task deleted");

    Ok(Json(
        serde_json::json!({ "message": "Task deleted successfully" }),
    ))
}

/// Record the funding stream for a task and move it to In Progress
pub async fn fund_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<FundTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let stream_id = req
        .stream_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| bad_request("Stream ID is required"))?;

    let row = state
        .db
        .get_task(id)
        .await
        .map_err(|e| db_error(e, "Task not found", "fund task"))?;

    let status = row.status.parse().unwrap_or(TaskStatus::Open);
    if status != TaskStatus::Open {
        return Err(bad_request(&format!(
            "Task cannot be funded from status '{}'",
            status
        )));
    }

    state
        .db
        .update_task_status(id, TaskStatus::InProgress.as_str(), Some(stream_id))
        .await
        .map_err(|e| db_error(e, "Task not found", "fund task"))?;

    info!(task_id = id, stream_id, "Task funded");

    let row = state
        .db
        .get_task(id)
        .await
        .map_err(|e| db_error(e, "Task not found", "fund task"))?;

    Ok(Json(Task::from(row)))
}

/// Move a funded task to Pending Stream Start
pub async fn start_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    let row = state
        .db
        .get_task(id)
        .await
        .map_err(|e| db_error(e, "Task not found", "start task"))?;

    let status = row.status.parse().unwrap_or(TaskStatus::Open);
    if status != TaskStatus::InProgress {
        return Err(bad_request(&format!(
            "Task cannot be started from status '{}'",
            status
        )));
    }

    state
        .db
        .update_task_status(id, TaskStatus::PendingStreamStart.as_str(), None)
        .await
        .map_err(|e| db_error(e, "Task not found", "start task"))?;

    info!(task_id = id, "Task started");

    let row = state
        .db
        .get_task(id)
        .await
        .map_err(|e| db_error(e, "Task not found", "start task"))?;

    Ok(Json(Task::from(row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_state;
    use serde_json::json;

    fn task_request(body: serde_json::Value) -> TaskRequest {
        serde_json::from_value(body).expect("valid request body")
    }

    #[tokio::test]
    async fn workshop_without_location_and_date_is_rejected() {
        let state = test_state().await;
        let req = task_request(json!({
            "title": "Rust meetup workshop",
            "description": "Teach newcomers",
            "type": "Workshop",
            "budget": 500
        }));

        let err = create_task(State(state), Json(req)).await.err().unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(
            err.1["error"],
            "Location and date are required for Workshop, Hackathon and Meetup tasks"
        );
    }

    #[tokio::test]
    async fn budget_must_be_finite() {
        let state = test_state().await;
        let req = task_request(json!({
            "title": "Content series",
            "description": "Six articles",
            "type": "Part-time Job",
            "budget": "lots"
        }));

        let err = create_task(State(state), Json(req)).await.err().unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1["error"], "Budget must be a finite number");
    }

    #[tokio::test]
    async fn create_task_returns_kpis_and_zero_applicants() {
        let state = test_state().await;
        let req = task_request(json!({
            "title": "Hackathon in Lisbon",
            "description": "48h event",
            "type": "Hackathon",
            "budget": "2500.50",
            "location": "Lisbon",
            "date": "2025-06-01",
            "kpis": [
                { "name": "Attendees", "target": "100" },
                { "name": "Projects", "target": "15", "description": "Submitted projects" }
            ]
        }));

        let (status, Json(task)) = create_task(State(state), Json(req)).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task.task.status, TaskStatus::Open);
        assert_eq!(task.task.budget, 2500.50);
        assert_eq!(task.kpis.len(), 2);
        assert_eq!(task.current_applicants, 0);
    }

    #[tokio::test]
    async fn non_event_task_drops_location_and_date() {
        let state = test_state().await;
        let req = task_request(json!({
            "title": "Community management",
            "description": "Keep the Discord alive",
            "type": "Hourly Job",
            "budget": 20,
            "location": "Berlin",
            "date": "2025-06-01"
        }));

        let (_, Json(task)) = create_task(State(state), Json(req)).await.unwrap();
        assert!(task.task.location.is_none());
        assert!(task.task.date.is_none());
    }

    #[tokio::test]
    async fn update_replaces_the_full_kpi_set() {
        let state = test_state().await;
        let req = task_request(json!({
            "title": "Meetup in Berlin",
            "description": "Evening event",
            "type": "Meetup",
            "budget": 800,
            "location": "Berlin",
            "date": "2025-05-10",
            "kpis": [
                { "name": "Attendees", "target": "50" },
                { "name": "Signups", "target": "30" }
            ]
        }));
        let (_, Json(created)) = create_task(State(state.clone()), Json(req)).await.unwrap();

        let update = task_request(json!({
            "title": "Meetup in Berlin",
            "description": "Evening event",
            "type": "Meetup",
            "budget": 800,
            "location": "Berlin",
            "date": "2025-05-10",
            "kpis": [
                { "name": "Newsletter subscriptions", "target": "200" }
            ]
        }));
        let Json(updated) = update_task(State(state), Path(created.task.id), Json(update))
            .await
            .unwrap();

        assert_eq!(updated.kpis.len(), 1);
        assert_eq!(updated.kpis[0].name, "Newsletter subscriptions");
    }

    #[tokio::test]
    async fn fund_requires_a_stream_id() {
        let state = test_state().await;
        let req = task_request(json!({
            "title": "Docs sprint",
            "description": "Write docs",
            "type": "Part-time Job",
            "budget": 300
        }));
        let (_, Json(task)) = create_task(State(state.clone()), Json(req)).await.unwrap();

        let fund = serde_json::from_value::<FundTaskRequest>(json!({})).unwrap();
        let err = fund_task(State(state), Path(task.task.id), Json(fund))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1["error"], "Stream ID is required");
    }

    #[tokio::test]
    async fn fund_then_start_walks_the_status_machine() {
        let state = test_state().await;
        let req = task_request(json!({
            "title": "Docs sprint",
            "description": "Write docs",
            "type": "Part-time Job",
            "budget": 300
        }));
        let (_, Json(task)) = create_task(State(state.clone()), Json(req)).await.unwrap();
        let id = task.task.id;

        // start before fund is rejected
        let err = start_task(State(state.clone()), Path(id)).await.err().unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let fund = serde_json::from_value::<FundTaskRequest>(json!({ "streamId": "stream-42" }))
            .unwrap();
        let Json(funded) = fund_task(State(state.clone()), Path(id), Json(fund))
            .await
            .unwrap();
        assert_eq!(funded.status, TaskStatus::InProgress);
        assert_eq!(funded.stream_id.as_deref(), Some("stream-42"));

        // the detail view agrees
        let Json(detail) = get_task(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(detail.task.status, TaskStatus::InProgress);
        assert_eq!(detail.task.stream_id.as_deref(), Some("stream-42"));

        // funding twice is rejected
        let fund_again =
            serde_json::from_value::<FundTaskRequest>(json!({ "streamId": "stream-43" })).unwrap();
        let err = fund_task(State(state.clone()), Path(id), Json(fund_again))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let Json(started) = start_task(State(state), Path(id)).await.unwrap();
        assert_eq!(started.status, TaskStatus::PendingStreamStart);
        // the stream id survives the transition
        assert_eq!(started.stream_id.as_deref(), Some("stream-42"));
    }

    #[tokio::test]
    async fn delete_then_fetch_is_not_found() {
        let state = test_state().await;
        let req = task_request(json!({
            "title": "Ephemeral",
            "description": "Gone soon",
            "type": "Full-time Job",
            "budget": 1000
        }));
        let (_, Json(task)) = create_task(State(state.clone()), Json(req)).await.unwrap();

        let Json(message) = delete_task(State(state.clone()), Path(task.task.id))
            .await
            .unwrap();
        assert_eq!(message["message"], "Task deleted successfully");

        let err = get_task(State(state), Path(task.task.id)).await.err().unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_filter_narrows_the_listing() {
        let state = test_state().await;
        for title in ["one", "two"] {
            let req = task_request(json!({
                "title": title,
                "description": "d",
                "type": "Hourly Job",
                "budget": 10
            }));
            create_task(State(state.clone()), Json(req)).await.unwrap();
        }

        let Json(open) = list_tasks(
            State(state.clone()),
            Query(TasksQuery {
                status: Some("Open".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(open.len(), 2);

        let Json(completed) = list_tasks(
            State(state.clone()),
            Query(TasksQuery {
                status: Some("Completed".to_string()),
            }),
        )
        .await
        .unwrap();
        assert!(completed.is_empty());

        let err = list_tasks(
            State(state),
            Query(TasksQuery {
                status: Some("Bogus".to_string()),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }
}
