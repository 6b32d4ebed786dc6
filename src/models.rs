//! Domain Models
//!
//! Business entities that represent the core domain, plus the request DTOs
//! accepted by the API. These are independent of the database layer; each
//! model converts from its database row.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::database::{
    ApplicationRow, KpiResultRow, KpiRow, PaymentRow, SubmissionRow, SupportingFileRow, TaskRow,
    UserRow,
};

// ============================================================================
// Status Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "builder")]
    Builder,
    #[serde(rename = "ambassador")]
    Ambassador,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Builder => "builder",
            Role::Ambassador => "ambassador",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "builder" => Ok(Role::Builder),
            "ambassador" => Ok(Role::Ambassador),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    Workshop,
    Hackathon,
    Meetup,
    #[serde(rename = "Part-time Job")]
    PartTimeJob,
    #[serde(rename = "Full-time Job")]
    FullTimeJob,
    #[serde(rename = "Hourly Job")]
    HourlyJob,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Workshop => "Workshop",
            TaskType::Hackathon => "Hackathon",
            TaskType::Meetup => "Meetup",
            TaskType::PartTimeJob => "Part-time Job",
            TaskType::FullTimeJob => "Full-time Job",
            TaskType::HourlyJob => "Hourly Job",
        }
    }

    /// Workshop, Hackathon and Meetup tasks happen at a physical event and
    /// must carry a location and a date.
    pub fn requires_location_and_date(&self) -> bool {
        matches!(self, TaskType::Workshop | TaskType::Hackathon | TaskType::Meetup)
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Workshop" => Ok(TaskType::Workshop),
            "Hackathon" => Ok(TaskType::Hackathon),
            "Meetup" => Ok(TaskType::Meetup),
            "Part-time Job" => Ok(TaskType::PartTimeJob),
            "Full-time Job" => Ok(TaskType::FullTimeJob),
            "Hourly Job" => Ok(TaskType::HourlyJob),
            _ => Err(format!("Invalid task type: {}", s)),
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Pending Stream Start")]
    PendingStreamStart,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "Open",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::PendingStreamStart => "Pending Stream Start",
            TaskStatus::Completed => "Completed",
            TaskStatus::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(TaskStatus::Open),
            "In Progress" => Ok(TaskStatus::InProgress),
            "Pending Stream Start" => Ok(TaskStatus::PendingStreamStart),
            "Completed" => Ok(TaskStatus::Completed),
            "Cancelled" => Ok(TaskStatus::Cancelled),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(rename = "Under Review")]
    UnderReview,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::UnderReview => "Under Review",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ApplicationStatus::Pending),
            "Approved" => Ok(ApplicationStatus::Approved),
            "Rejected" => Ok(ApplicationStatus::Rejected),
            "Under Review" => Ok(ApplicationStatus::UnderReview),
            _ => Err(format!("Invalid application status: {}", s)),
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "draft")]
    Draft,
    #[serde(rename = "Pending Review")]
    PendingReview,
    Approved,
    Rejected,
    #[serde(rename = "Revision Requested")]
    RevisionRequested,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::PendingReview => "Pending Review",
            SubmissionStatus::Approved => "Approved",
            SubmissionStatus::Rejected => "Rejected",
            SubmissionStatus::RevisionRequested => "Revision Requested",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SubmissionStatus::Draft),
            "Pending Review" => Ok(SubmissionStatus::PendingReview),
            "Approved" => Ok(SubmissionStatus::Approved),
            "Rejected" => Ok(SubmissionStatus::Rejected),
            "Revision Requested" => Ok(SubmissionStatus::RevisionRequested),
            _ => Err(format!("Invalid submission status: {}", s)),
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Domain Models
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub wallet_address: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub twitter: Option<String>,
    pub role: Role,
    pub created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let role = row.role.parse().unwrap_or(Role::Builder);
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            wallet_address: row.wallet_address,
            bio: row.bio,
            location: row.location,
            twitter: row.twitter,
            role,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub location: Option<String>,
    pub date: Option<String>,
    pub budget: f64,
    pub status: TaskStatus,
    pub stream_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        let task_type = row.task_type.parse().unwrap_or(TaskType::Workshop);
        let status = row.status.parse().unwrap_or(TaskStatus::Open);
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            task_type,
            location: row.location,
            date: row.date,
            budget: row.budget,
            status,
            stream_id: row.stream_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub id: i64,
    pub task_id: i64,
    pub name: String,
    pub target: String,
    pub description: Option<String>,
}

impl From<KpiRow> for Kpi {
    fn from(row: KpiRow) -> Self {
        Self {
            id: row.id,
            task_id: row.task_id,
            name: row.name,
            target: row.target,
            description: row.description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub task_id: i64,
    pub builder_id: i64,
    pub cover_letter: String,
    pub status: ApplicationStatus,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        let status = row.status.parse().unwrap_or(ApplicationStatus::Pending);
        Self {
            id: row.id,
            task_id: row.task_id,
            builder_id: row.builder_id,
            cover_letter: row.cover_letter,
            status,
            review_notes: row.review_notes,
            reviewed_at: row.reviewed_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub task_id: i64,
    pub builder_id: i64,
    pub work_summary: String,
    pub amount: Option<f64>,
    pub status: SubmissionStatus,
    pub review_notes: Option<String>,
    pub created_at: String,
}

impl From<SubmissionRow> for Submission {
    fn from(row: SubmissionRow) -> Self {
        let status = row.status.parse().unwrap_or(SubmissionStatus::PendingReview);
        Self {
            id: row.id,
            task_id: row.task_id,
            builder_id: row.builder_id,
            work_summary: row.work_summary,
            amount: row.amount,
            status,
            review_notes: row.review_notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResult {
    pub id: i64,
    pub name: String,
    pub target: String,
    pub achieved: String,
    pub status: String,
}

impl From<KpiResultRow> for KpiResult {
    fn from(row: KpiResultRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            target: row.target,
            achieved: row.achieved,
            status: row.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportingFile {
    pub id: i64,
    pub name: String,
    pub size: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub url: String,
}

impl From<SupportingFileRow> for SupportingFile {
    fn from(row: SupportingFileRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            size: row.size,
            file_type: row.file_type,
            url: row.url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub stream_id: Option<String>,
    pub amount: f64,
    pub token: Option<String>,
    #[serde(rename = "from")]
    pub from_address: Option<String>,
    #[serde(rename = "to")]
    pub to_address: Option<String>,
    pub tx_hash: Option<String>,
    pub builder_id: Option<i64>,
    pub created_at: String,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            stream_id: row.stream_id,
            amount: row.amount,
            token: row.token,
            from_address: row.from_address,
            to_address: row.to_address,
            tx_hash: row.tx_hash,
            builder_id: row.builder_id,
            created_at: row.created_at,
        }
    }
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Shared by `POST /api/tasks` and `PUT /api/tasks/{id}`. Every field is
/// optional at the serde level so missing fields surface as a 400 with a
/// message instead of a deserialization failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub budget: Option<serde_json::Value>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub kpis: Option<Vec<KpiInput>>,
    pub creator_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KpiInput {
    pub name: String,
    pub target: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    pub task_id: Option<i64>,
    pub builder_email: Option<String>,
    pub cover_letter: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewApplicationRequest {
    pub status: Option<String>,
    pub review_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionRequest {
    pub task_id: Option<i64>,
    pub builder_email: Option<String>,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub kpi_results: Option<Vec<KpiResultInput>>,
    pub files: Option<Vec<SupportingFileInput>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResultInput {
    pub kpi_id: i64,
    pub achieved_value: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupportingFileInput {
    pub name: String,
    pub size: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubmissionRequest {
    pub status: Option<String>,
    pub review_notes: Option<String>,
    pub amount: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub stream_id: Option<String>,
    pub amount: Option<serde_json::Value>,
    pub token: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub tx_hash: Option<String>,
    pub builder_email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    pub submission_id: Option<i64>,
    pub amount: Option<serde_json::Value>,
    pub transaction_hash: Option<String>,
    pub review_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub wallet_address: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub twitter: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundTaskRequest {
    pub stream_id: Option<String>,
}

/// Monetary amounts arrive either as JSON numbers or as strings the client
/// never parsed. Accept both; reject anything that is not a finite number.
pub fn parse_finite_amount(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_status_round_trips() {
        for status in [
            TaskStatus::Open,
            TaskStatus::InProgress,
            TaskStatus::PendingStreamStart,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("Paused".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn application_status_round_trips() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
            ApplicationStatus::UnderReview,
        ] {
            assert_eq!(
                status.as_str().parse::<ApplicationStatus>().unwrap(),
                status
            );
        }
    }

    #[test]
    fn submission_status_round_trips() {
        for status in [
            SubmissionStatus::Draft,
            SubmissionStatus::PendingReview,
            SubmissionStatus::Approved,
            SubmissionStatus::Rejected,
            SubmissionStatus::RevisionRequested,
        ] {
            assert_eq!(status.as_str().parse::<SubmissionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn event_types_require_location_and_date() {
        assert!(TaskType::Workshop.requires_location_and_date());
        assert!(TaskType::Hackathon.requires_location_and_date());
        assert!(TaskType::Meetup.requires_location_and_date());
        assert!(!TaskType::PartTimeJob.requires_location_and_date());
        assert!(!TaskType::FullTimeJob.requires_location_and_date());
        assert!(!TaskType::HourlyJob.requires_location_and_date());
    }

    #[test]
    fn task_status_serializes_with_spaces() {
        let json = serde_json::to_string(&TaskStatus::PendingStreamStart).unwrap();
        assert_eq!(json, "\"Pending Stream Start\"");
        let back: TaskStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(back, TaskStatus::InProgress);
    }

    #[test]
    fn amounts_parse_from_numbers_and_strings() {
        assert_eq!(parse_finite_amount(&json!(1500)), Some(1500.0));
        assert_eq!(parse_finite_amount(&json!(99.5)), Some(99.5));
        assert_eq!(parse_finite_amount(&json!("250.75")), Some(250.75));
        assert_eq!(parse_finite_amount(&json!(" 42 ")), Some(42.0));
        assert_eq!(parse_finite_amount(&json!("not a number")), None);
        assert_eq!(parse_finite_amount(&json!(null)), None);
        assert_eq!(parse_finite_amount(&json!([1, 2])), None);
    }
}
