//! Admin dashboard aggregates, assembled from a handful of count and
//! group-by queries into one JSON document.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::{db_error, ApiError, AppState};
use crate::models::{ApplicationStatus, SubmissionStatus, TaskStatus};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub overview: Overview,
    pub recent_applications: Vec<RecentApplication>,
    pub top_builders: Vec<TopBuilder>,
    pub tasks_by_type: Vec<TypeBucket>,
    pub applications_by_status: Vec<StatusBucket>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_builders: i64,
    pub total_tasks: i64,
    pub open_tasks: i64,
    pub in_progress_tasks: i64,
    pub total_applications: i64,
    pub pending_applications: i64,
    pub total_submissions: i64,
    pub pending_submissions: i64,
    pub total_budget: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentApplication {
    pub id: i64,
    pub builder_name: String,
    pub task_title: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopBuilder {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub total_submissions: i64,
    pub approved_submissions: i64,
    pub total_applications: i64,
    pub approved_applications: i64,
}

#[derive(Debug, Serialize)]
pub struct TypeBucket {
    #[serde(rename = "type")]
    pub task_type: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusBucket {
    pub status: String,
    pub count: i64,
}

/// Assemble the admin dashboard document
pub async fn get_analytics(
    State(state): State<AppState>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let db = &state.db;
    let fail = |e| db_error(e, "Analytics not found", "fetch analytics");

    let overview = Overview {
        total_builders: db.count_users_with_role("builder").await.map_err(fail)?,
        total_tasks: db.count_tasks(None).await.map_err(fail)?,
        open_tasks: db
            .count_tasks(Some(TaskStatus::Open.as_str()))
            .await
            .map_err(fail)?,
        in_progress_tasks: db
            .count_tasks(Some(TaskStatus::InProgress.as_str()))
            .await
            .map_err(fail)?,
        total_applications: db.count_applications(None).await.map_err(fail)?,
        pending_applications: db
            .count_applications(Some(ApplicationStatus::Pending.as_str()))
            .await
            .map_err(fail)?,
        total_submissions: db.count_submissions(None).await.map_err(fail)?,
        pending_submissions: db
            .count_submissions(Some(SubmissionStatus::PendingReview.as_str()))
            .await
            .map_err(fail)?,
        total_budget: db.sum_task_budgets().await.map_err(fail)?,
    };

    let recent_applications = db
        .recent_applications(5)
        .await
        .map_err(fail)?
        .into_iter()
        .map(|row| RecentApplication {
            id: row.id,
            builder_name: row.builder_name.unwrap_or(row.builder_email),
            task_title: row.task_title,
            status: row.status,
            created_at: row.created_at,
        })
        .collect();

    let top_builders = db
        .top_builders(5)
        .await
        .map_err(fail)?
        .into_iter()
        .map(|row| TopBuilder {
            id: row.id,
            name: row.name.unwrap_or_else(|| row.email.clone()),
            email: row.email,
            total_submissions: row.total_submissions,
            approved_submissions: row.approved_submissions,
            total_applications: row.total_applications,
            approved_applications: row.approved_applications,
        })
        .collect();

    let tasks_by_type = db
        .tasks_by_type()
        .await
        .map_err(fail)?
        .into_iter()
        .map(|row| TypeBucket {
            task_type: row.task_type,
            count: row.count,
        })
        .collect();

    let applications_by_status = db
        .applications_by_status()
        .await
        .map_err(fail)?
        .into_iter()
        .map(|row| StatusBucket {
            status: row.status,
            count: row.count,
        })
        .collect();

    Ok(Json(AnalyticsResponse {
        overview,
        recent_applications,
        top_builders,
        tasks_by_type,
        applications_by_status,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_state;
    use crate::api::{applications, submissions, tasks};
    use crate::models::{CreateApplicationRequest, CreateSubmissionRequest, TaskRequest};
    use axum::extract::State;
    use serde_json::json;

    async fn seed(state: &AppState) {
        for (title, task_type) in [
            ("Workshop A", "Workshop"),
            ("Workshop B", "Workshop"),
            ("Hourly support", "Hourly Job"),
        ] {
            let mut body = json!({
                "title": title,
                "description": "Seeded",
                "type": task_type,
                "budget": 100
            });
            if task_type == "Workshop" {
                body["location"] = json!("Accra");
                body["date"] = json!("2025-09-01");
            }
            let req: TaskRequest = serde_json::from_value(body).unwrap();
            tasks::create_task(State(state.clone()), axum::Json(req))
                .await
                .unwrap();
        }

        let req: CreateApplicationRequest = serde_json::from_value(json!({
            "taskId": 1,
            "builderEmail": "ada@example.com",
            "coverLetter": "Pick me"
        }))
        .unwrap();
        applications::create_application(State(state.clone()), axum::Json(req))
            .await
            .unwrap();

        let req: CreateSubmissionRequest = serde_json::from_value(json!({
            "taskId": 1,
            "builderEmail": "ada@example.com",
            "summary": "Done"
        }))
        .unwrap();
        submissions::create_submission(State(state.clone()), axum::Json(req))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_store_produces_zeroed_overview() {
        let state = test_state().await;
        let axum::Json(analytics) = get_analytics(State(state)).await.unwrap();

        assert_eq!(analytics.overview.total_tasks, 0);
        assert_eq!(analytics.overview.total_budget, 0.0);
        assert!(analytics.recent_applications.is_empty());
        assert!(analytics.top_builders.is_empty());
        assert!(analytics.tasks_by_type.is_empty());
    }

    #[tokio::test]
    async fn seeded_store_aggregates_line_up() {
        let state = test_state().await;
        seed(&state).await;

        let axum::Json(analytics) = get_analytics(State(state)).await.unwrap();

        assert_eq!(analytics.overview.total_builders, 1);
        assert_eq!(analytics.overview.total_tasks, 3);
        assert_eq!(analytics.overview.open_tasks, 3);
        assert_eq!(analytics.overview.in_progress_tasks, 0);
        assert_eq!(analytics.overview.total_applications, 1);
        assert_eq!(analytics.overview.pending_applications, 1);
        assert_eq!(analytics.overview.total_submissions, 1);
        assert_eq!(analytics.overview.pending_submissions, 1);
        assert_eq!(analytics.overview.total_budget, 300.0);

        assert_eq!(analytics.recent_applications.len(), 1);
        // No name on file yet, so the email stands in
        assert_eq!(analytics.recent_applications[0].builder_name, "ada@example.com");
        assert_eq!(analytics.recent_applications[0].task_title, "Workshop A");

        assert_eq!(analytics.top_builders.len(), 1);
        assert_eq!(analytics.top_builders[0].total_submissions, 1);
        assert_eq!(analytics.top_builders[0].approved_submissions, 0);
        assert_eq!(analytics.top_builders[0].total_applications, 1);

        let workshops = analytics
            .tasks_by_type
            .iter()
            .find(|bucket| bucket.task_type == "Workshop")
            .unwrap();
        assert_eq!(workshops.count, 2);

        assert_eq!(analytics.applications_by_status.len(), 1);
        assert_eq!(analytics.applications_by_status[0].status, "Pending");
        assert_eq!(analytics.applications_by_status[0].count, 1);
    }
}
