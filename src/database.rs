//! Database Infrastructure Layer
//!
//! Handles database connection, schema initialization, and provides
//! data access methods for users, tasks, applications, submissions and
//! payments. This layer is responsible only for database concerns - no
//! business logic.

use std::{ops::Deref, str::FromStr};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

#[derive(Debug)]
pub enum DatabaseError {
    Connection(sqlx::Error),
    Query(sqlx::Error),
    NotFound(String),
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseError::Connection(err) => write!(f, "Database connection error: {}", err),
            DatabaseError::Query(err) => write!(f, "Database query error: {}", err),
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatabaseError::Connection(err) | DatabaseError::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::Query(err)
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

// ============================================================================
// Row DTOs
// ============================================================================

/// Database row for the users table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub wallet_address: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub twitter: Option<String>,
    pub created_at: String,
}

/// Database row for the tasks table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub task_type: String,
    pub location: Option<String>,
    pub date: Option<String>,
    pub budget: f64,
    pub status: String,
    pub stream_id: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Database row for the kpis table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KpiRow {
    pub id: i64,
    pub task_id: i64,
    pub name: String,
    pub target: String,
    pub description: Option<String>,
}

/// Database row for the applications table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicationRow {
    pub id: i64,
    pub task_id: i64,
    pub builder_id: i64,
    pub cover_letter: String,
    pub status: String,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
}

/// Application joined with its builder, for task detail views
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskApplicationRow {
    pub id: i64,
    pub task_id: i64,
    pub builder_id: i64,
    pub builder_email: String,
    pub builder_name: Option<String>,
    pub cover_letter: String,
    pub status: String,
    pub created_at: String,
}

/// Database row for the submissions table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubmissionRow {
    pub id: i64,
    pub task_id: i64,
    pub builder_id: i64,
    pub work_summary: String,
    pub amount: Option<f64>,
    pub status: String,
    pub review_notes: Option<String>,
    pub created_at: String,
}

/// Database row for the kpi_results table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KpiResultRow {
    pub id: i64,
    pub submission_id: i64,
    pub name: String,
    pub target: String,
    pub achieved: String,
    pub status: String,
}

/// Database row for the supporting_files table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupportingFileRow {
    pub id: i64,
    pub submission_id: i64,
    pub name: String,
    pub size: String,
    pub file_type: String,
    pub url: String,
}

/// Database row for the payments table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub id: i64,
    pub stream_id: Option<String>,
    pub amount: f64,
    pub token: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub tx_hash: Option<String>,
    pub builder_id: Option<i64>,
    pub created_at: String,
}

/// Payment joined with its builder, when one is linked
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentWithBuilderRow {
    pub id: i64,
    pub stream_id: Option<String>,
    pub amount: f64,
    pub token: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub tx_hash: Option<String>,
    pub builder_id: Option<i64>,
    pub created_at: String,
    pub builder_name: Option<String>,
    pub builder_email: Option<String>,
}

/// Application joined with builder and task title, for the admin dashboard
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecentApplicationRow {
    pub id: i64,
    pub builder_name: Option<String>,
    pub builder_email: String,
    pub task_title: String,
    pub status: String,
    pub created_at: String,
}

/// Per-builder aggregate counters, for the admin dashboard
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BuilderStatsRow {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub total_submissions: i64,
    pub approved_submissions: i64,
    pub total_applications: i64,
    pub approved_applications: i64,
}

/// Group-by bucket for task type distribution
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TypeCountRow {
    pub task_type: String,
    pub count: i64,
}

/// Group-by bucket for application status distribution
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusCountRow {
    pub status: String,
    pub count: i64,
}

// ============================================================================
// Insert parameter structs
// ============================================================================

#[derive(Debug)]
pub struct NewTask<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub task_type: &'a str,
    pub location: Option<&'a str>,
    pub date: Option<&'a str>,
    pub budget: f64,
    pub created_by: Option<i64>,
}

#[derive(Debug)]
pub struct NewKpi<'a> {
    pub name: &'a str,
    pub target: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Debug)]
pub struct NewKpiResult {
    pub name: String,
    pub target: String,
    pub achieved: String,
    pub status: String,
}

#[derive(Debug)]
pub struct NewSupportingFile {
    pub name: String,
    pub size: String,
    pub file_type: String,
    pub url: String,
}

#[derive(Debug)]
pub struct NewPayment<'a> {
    pub stream_id: Option<&'a str>,
    pub amount: f64,
    pub token: Option<&'a str>,
    pub from_address: Option<&'a str>,
    pub to_address: Option<&'a str>,
    pub tx_hash: Option<&'a str>,
    pub builder_id: Option<i64>,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Deref for Database {
    type Target = SqlitePool;
    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let database_config = SqliteConnectOptions::from_str(database_url)
            .map_err(DatabaseError::Connection)?
            .create_if_missing(true)
            .foreign_keys(true);

        // SQLite has a single writer; one pooled connection also keeps
        // `sqlite::memory:` databases alive across queries.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_lazy_with(database_config);

        let db = Self { pool };
        db.initialize_tables().await?;

        info!("Database initialized at {}", database_url);
        Ok(db)
    }

    async fn initialize_tables(&self) -> Result<()> {
        // Users table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                name TEXT,
                role TEXT NOT NULL DEFAULT 'builder',
                wallet_address TEXT,
                bio TEXT,
                location TEXT,
                twitter TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Tasks table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                task_type TEXT NOT NULL,
                location TEXT,
                date TEXT,
                budget REAL NOT NULL,
                status TEXT NOT NULL DEFAULT 'Open',
                stream_id TEXT,
                created_by INTEGER,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (created_by) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // KPIs table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kpis (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                target TEXT NOT NULL,
                description TEXT,
                FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Applications table; one application per (task, builder) pair
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL,
                builder_id INTEGER NOT NULL,
                cover_letter TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'Pending',
                review_notes TEXT,
                reviewed_at TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE,
                FOREIGN KEY (builder_id) REFERENCES users(id),
                UNIQUE(task_id, builder_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Submissions table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL,
                builder_id INTEGER NOT NULL,
                work_summary TEXT NOT NULL,
                amount REAL,
                status TEXT NOT NULL DEFAULT 'Pending Review',
                review_notes TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (task_id) REFERENCES tasks(id),
                FOREIGN KEY (builder_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // KPI results table (snapshot of the KPI at submission time)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kpi_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                submission_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                target TEXT NOT NULL,
                achieved TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'Pending',
                FOREIGN KEY (submission_id) REFERENCES submissions(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Supporting files table (references only, no file bytes)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS supporting_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                submission_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                size TEXT NOT NULL,
                file_type TEXT NOT NULL,
                url TEXT NOT NULL,
                FOREIGN KEY (submission_id) REFERENCES submissions(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Payments table; rows are never mutated once written
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS payments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                stream_id TEXT,
                amount REAL NOT NULL,
                token TEXT,
                from_address TEXT,
                to_address TEXT,
                tx_hash TEXT,
                builder_id INTEGER,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (builder_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Create indexes for performance
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_kpis_task_id ON kpis(task_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_applications_builder_id ON applications(builder_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_submissions_builder_id ON submissions(builder_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_kpi_results_submission_id ON kpi_results(submission_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_supporting_files_submission_id ON supporting_files(submission_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_payments_builder_id ON payments(builder_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ========== User Operations ==========

    /// Insert the user when the email is new; an existing user keeps its
    /// role and profile untouched.
    pub async fn upsert_user(&self, email: &str, role: &str) -> Result<UserRow> {
        sqlx::query(
            r#"
            INSERT INTO users (email, role)
            VALUES (?, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(email)
        .bind(role)
        .execute(&self.pool)
        .await?;

        self.get_user_by_email(email).await
    }

    /// Create or overwrite a user's profile fields. The role of an existing
    /// user is preserved; a new user is created as a builder.
    pub async fn upsert_profile(
        &self,
        email: &str,
        name: Option<&str>,
        wallet_address: Option<&str>,
        bio: Option<&str>,
        location: Option<&str>,
        twitter: Option<&str>,
    ) -> Result<UserRow> {
        sqlx::query(
            r#"
            INSERT INTO users (email, role, name, wallet_address, bio, location, twitter)
            VALUES (?, 'builder', ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                name = excluded.name,
                wallet_address = excluded.wallet_address,
                bio = excluded.bio,
                location = excluded.location,
                twitter = excluded.twitter
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(wallet_address)
        .bind(bio)
        .bind(location)
        .bind(twitter)
        .execute(&self.pool)
        .await?;

        self.get_user_by_email(email).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, role, wallet_address, bio, location, twitter, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound(format!("User '{}' not found", email))
            }
            e => DatabaseError::Query(e),
        })
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, role, wallet_address, bio, location, twitter, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, role, wallet_address, bio, location, twitter, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound(format!("User with id {} not found", id))
            }
            e => DatabaseError::Query(e),
        })
    }

    // ========== Task Operations ==========

    pub async fn create_task(&self, task: &NewTask<'_>, kpis: &[NewKpi<'_>]) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (title, description, task_type, location, date, budget, created_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.title)
        .bind(task.description)
        .bind(task.task_type)
        .bind(task.location)
        .bind(task.date)
        .bind(task.budget)
        .bind(task.created_by)
        .execute(&mut *tx)
        .await?;

        let task_id = result.last_insert_rowid();

        for kpi in kpis {
            sqlx::query(
                r#"
                INSERT INTO kpis (task_id, name, target, description)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(task_id)
            .bind(kpi.name)
            .bind(kpi.target)
            .bind(kpi.description)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(task_id)
    }

    pub async fn get_task(&self, id: i64) -> Result<TaskRow> {
        sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, title, description, task_type, location, date, budget,
                   status, stream_id, created_by, created_at, updated_at
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound(format!("Task with id {} not found", id))
            }
            e => DatabaseError::Query(e),
        })
    }

    pub async fn list_tasks(&self, status: Option<&str>) -> Result<Vec<TaskRow>> {
        let tasks = match status {
            Some(status) => {
                sqlx::query_as::<_, TaskRow>(
                    r#"
                    SELECT id, title, description, task_type, location, date, budget,
                           status, stream_id, created_by, created_at, updated_at
                    FROM tasks
                    WHERE status = ?
                    ORDER BY created_at DESC, id DESC
                    "#,
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, TaskRow>(
                    r#"
                    SELECT id, title, description, task_type, location, date, budget,
                           status, stream_id, created_by, created_at, updated_at
                    FROM tasks
                    ORDER BY created_at DESC, id DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(tasks)
    }

    /// Update a task's fields and, when a KPI set is given, replace the
    /// existing KPIs wholesale. Both steps run in one transaction so a crash
    /// cannot leave the task without its KPIs.
    pub async fn update_task(
        &self,
        id: i64,
        task: &NewTask<'_>,
        status: Option<&str>,
        kpis: Option<&[NewKpi<'_>]>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = ?, description = ?, task_type = ?, location = ?, date = ?,
                budget = ?, status = COALESCE(?, status), updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(task.title)
        .bind(task.description)
        .bind(task.task_type)
        .bind(task.location)
        .bind(task.date)
        .bind(task.budget)
        .bind(status)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Task with id {} not found",
                id
            )));
        }

        if let Some(kpis) = kpis {
            sqlx::query("DELETE FROM kpis WHERE task_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for kpi in kpis {
                sqlx::query(
                    r#"
                    INSERT INTO kpis (task_id, name, target, description)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(id)
                .bind(kpi.name)
                .bind(kpi.target)
                .bind(kpi.description)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn update_task_status(
        &self,
        id: i64,
        status: &str,
        stream_id: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, stream_id = COALESCE(?, stream_id), updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(status)
        .bind(stream_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Task with id {} not found",
                id
            )));
        }

        Ok(())
    }

    pub async fn delete_task(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Task with id {} not found",
                id
            )));
        }

        Ok(())
    }

    pub async fn list_kpis_for_task(&self, task_id: i64) -> Result<Vec<KpiRow>> {
        sqlx::query_as::<_, KpiRow>(
            r#"
            SELECT id, task_id, name, target, description
            FROM kpis
            WHERE task_id = ?
            ORDER BY id
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn find_kpi(&self, id: i64) -> Result<Option<KpiRow>> {
        sqlx::query_as::<_, KpiRow>(
            r#"
            SELECT id, task_id, name, target, description
            FROM kpis
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn count_applications_for_task(&self, task_id: i64) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM applications WHERE task_id = ?")
            .bind(task_id)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    // ========== Application Operations ==========

    pub async fn create_application(
        &self,
        task_id: i64,
        builder_id: i64,
        cover_letter: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO applications (task_id, builder_id, cover_letter)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(task_id)
        .bind(builder_id)
        .bind(cover_letter)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_application(&self, id: i64) -> Result<ApplicationRow> {
        sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT id, task_id, builder_id, cover_letter, status,
                   review_notes, reviewed_at, created_at
            FROM applications
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound(format!("Application with id {} not found", id))
            }
            e => DatabaseError::Query(e),
        })
    }

    pub async fn find_application_by_task_and_builder(
        &self,
        task_id: i64,
        builder_id: i64,
    ) -> Result<Option<ApplicationRow>> {
        sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT id, task_id, builder_id, cover_letter, status,
                   review_notes, reviewed_at, created_at
            FROM applications
            WHERE task_id = ? AND builder_id = ?
            "#,
        )
        .bind(task_id)
        .bind(builder_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn list_applications(&self, builder_id: Option<i64>) -> Result<Vec<ApplicationRow>> {
        let applications = match builder_id {
            Some(builder_id) => {
                sqlx::query_as::<_, ApplicationRow>(
                    r#"
                    SELECT id, task_id, builder_id, cover_letter, status,
                           review_notes, reviewed_at, created_at
                    FROM applications
                    WHERE builder_id = ?
                    ORDER BY created_at DESC, id DESC
                    "#,
                )
                .bind(builder_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ApplicationRow>(
                    r#"
                    SELECT id, task_id, builder_id, cover_letter, status,
                           review_notes, reviewed_at, created_at
                    FROM applications
                    ORDER BY created_at DESC, id DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(applications)
    }

    pub async fn list_applications_for_task(
        &self,
        task_id: i64,
    ) -> Result<Vec<TaskApplicationRow>> {
        sqlx::query_as::<_, TaskApplicationRow>(
            r#"
            SELECT a.id, a.task_id, a.builder_id,
                   u.email AS builder_email, u.name AS builder_name,
                   a.cover_letter, a.status, a.created_at
            FROM applications a
            JOIN users u ON u.id = a.builder_id
            WHERE a.task_id = ?
            ORDER BY a.created_at DESC, a.id DESC
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn review_application(
        &self,
        id: i64,
        status: &str,
        review_notes: Option<&str>,
        reviewed_at: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE applications
            SET status = ?, review_notes = ?, reviewed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status)
        .bind(review_notes)
        .bind(reviewed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Application with id {} not found",
                id
            )));
        }

        Ok(())
    }

    pub async fn delete_application(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM applications WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Application with id {} not found",
                id
            )));
        }

        Ok(())
    }

    // ========== Submission Operations ==========

    pub async fn create_submission(
        &self,
        task_id: i64,
        builder_id: i64,
        work_summary: &str,
        status: &str,
        kpi_results: &[NewKpiResult],
        files: &[NewSupportingFile],
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO submissions (task_id, builder_id, work_summary, status)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(task_id)
        .bind(builder_id)
        .bind(work_summary)
        .bind(status)
        .execute(&mut *tx)
        .await?;

        let submission_id = result.last_insert_rowid();

        for kpi_result in kpi_results {
            sqlx::query(
                r#"
                INSERT INTO kpi_results (submission_id, name, target, achieved, status)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(submission_id)
            .bind(&kpi_result.name)
            .bind(&kpi_result.target)
            .bind(&kpi_result.achieved)
            .bind(&kpi_result.status)
            .execute(&mut *tx)
            .await?;
        }

        for file in files {
            sqlx::query(
                r#"
                INSERT INTO supporting_files (submission_id, name, size, file_type, url)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(submission_id)
            .bind(&file.name)
            .bind(&file.size)
            .bind(&file.file_type)
            .bind(&file.url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(submission_id)
    }

    pub async fn get_submission(&self, id: i64) -> Result<SubmissionRow> {
        sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT id, task_id, builder_id, work_summary, amount, status,
                   review_notes, created_at
            FROM submissions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound(format!("Submission with id {} not found", id))
            }
            e => DatabaseError::Query(e),
        })
    }

    pub async fn list_submissions(&self, builder_id: Option<i64>) -> Result<Vec<SubmissionRow>> {
        let submissions = match builder_id {
            Some(builder_id) => {
                sqlx::query_as::<_, SubmissionRow>(
                    r#"
                    SELECT id, task_id, builder_id, work_summary, amount, status,
                           review_notes, created_at
                    FROM submissions
                    WHERE builder_id = ?
                    ORDER BY created_at DESC, id DESC
                    "#,
                )
                .bind(builder_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SubmissionRow>(
                    r#"
                    SELECT id, task_id, builder_id, work_summary, amount, status,
                           review_notes, created_at
                    FROM submissions
                    ORDER BY created_at DESC, id DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(submissions)
    }

    /// Update review fields on a submission. `None` leaves a field unchanged.
    pub async fn update_submission(
        &self,
        id: i64,
        status: Option<&str>,
        review_notes: Option<&str>,
        amount: Option<f64>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET status = COALESCE(?, status),
                review_notes = COALESCE(?, review_notes),
                amount = COALESCE(?, amount)
            WHERE id = ?
            "#,
        )
        .bind(status)
        .bind(review_notes)
        .bind(amount)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Submission with id {} not found",
                id
            )));
        }

        Ok(())
    }

    pub async fn list_kpi_results(&self, submission_id: i64) -> Result<Vec<KpiResultRow>> {
        sqlx::query_as::<_, KpiResultRow>(
            r#"
            SELECT id, submission_id, name, target, achieved, status
            FROM kpi_results
            WHERE submission_id = ?
            ORDER BY id
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn list_supporting_files(
        &self,
        submission_id: i64,
    ) -> Result<Vec<SupportingFileRow>> {
        sqlx::query_as::<_, SupportingFileRow>(
            r#"
            SELECT id, submission_id, name, size, file_type, url
            FROM supporting_files
            WHERE submission_id = ?
            ORDER BY id
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    // ========== Payment Operations ==========

    pub async fn create_payment(&self, payment: &NewPayment<'_>) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (stream_id, amount, token, from_address, to_address, tx_hash, builder_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.stream_id)
        .bind(payment.amount)
        .bind(payment.token)
        .bind(payment.from_address)
        .bind(payment.to_address)
        .bind(payment.tx_hash)
        .bind(payment.builder_id)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_payment(&self, id: i64) -> Result<PaymentRow> {
        sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, stream_id, amount, token, from_address, to_address,
                   tx_hash, builder_id, created_at
            FROM payments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound(format!("Payment with id {} not found", id))
            }
            e => DatabaseError::Query(e),
        })
    }

    pub async fn list_payments(&self) -> Result<Vec<PaymentWithBuilderRow>> {
        sqlx::query_as::<_, PaymentWithBuilderRow>(
            r#"
            SELECT p.id, p.stream_id, p.amount, p.token, p.from_address, p.to_address,
                   p.tx_hash, p.builder_id, p.created_at,
                   u.name AS builder_name, u.email AS builder_email
            FROM payments p
            LEFT JOIN users u ON u.id = p.builder_id
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    // ========== Analytics Operations ==========

    pub async fn count_users_with_role(&self, role: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    pub async fn count_tasks(&self, status: Option<&str>) -> Result<i64> {
        let count = match status {
            Some(status) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE status = ?")
                    .bind(status)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count)
    }

    pub async fn count_applications(&self, status: Option<&str>) -> Result<i64> {
        let count = match status {
            Some(status) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM applications WHERE status = ?")
                    .bind(status)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM applications")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count)
    }

    pub async fn count_submissions(&self, status: Option<&str>) -> Result<i64> {
        let count = match status {
            Some(status) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions WHERE status = ?")
                    .bind(status)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count)
    }

    pub async fn sum_task_budgets(&self) -> Result<f64> {
        sqlx::query_scalar::<_, f64>("SELECT COALESCE(SUM(budget), 0.0) FROM tasks")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    pub async fn recent_applications(&self, limit: i64) -> Result<Vec<RecentApplicationRow>> {
        sqlx::query_as::<_, RecentApplicationRow>(
            r#"
            SELECT a.id, u.name AS builder_name, u.email AS builder_email,
                   t.title AS task_title, a.status, a.created_at
            FROM applications a
            JOIN users u ON u.id = a.builder_id
            JOIN tasks t ON t.id = a.task_id
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn top_builders(&self, limit: i64) -> Result<Vec<BuilderStatsRow>> {
        sqlx::query_as::<_, BuilderStatsRow>(
            r#"
            SELECT u.id, u.name, u.email,
                   (SELECT COUNT(*) FROM submissions s
                    WHERE s.builder_id = u.id) AS total_submissions,
                   (SELECT COUNT(*) FROM submissions s
                    WHERE s.builder_id = u.id AND s.status = 'Approved') AS approved_submissions,
                   (SELECT COUNT(*) FROM applications a
                    WHERE a.builder_id = u.id) AS total_applications,
                   (SELECT COUNT(*) FROM applications a
                    WHERE a.builder_id = u.id AND a.status = 'Approved') AS approved_applications
            FROM users u
            WHERE u.role = 'builder'
            ORDER BY total_submissions DESC, u.id
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn tasks_by_type(&self) -> Result<Vec<TypeCountRow>> {
        sqlx::query_as::<_, TypeCountRow>(
            r#"
            SELECT task_type, COUNT(*) AS count
            FROM tasks
            GROUP BY task_type
            ORDER BY task_type
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn applications_by_status(&self) -> Result<Vec<StatusCountRow>> {
        sqlx::query_as::<_, StatusCountRow>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM applications
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }
}
