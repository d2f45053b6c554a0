//! SQLite-backed job store.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};

use super::{JobError, JobItemError, JobItemErrorKind, JobStatus, JobStore, PrintJob};
use crate::codec::Category;

const JOB_COLUMNS: &str = "id, category, range_start, range_end, template, total_tickets, total_pages, status, progress_percent, printed_count, cancel_requested, error, created_at, started_at, completed_at";

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> JobError {
    JobError::Database(e.to_string())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl SqliteJobStore {
    /// Open or create the job tables at `path`.
    pub fn new(path: &Path) -> Result<Self, JobError> {
        Self::with_busy_timeout(path, Duration::from_secs(5))
    }

    pub fn with_busy_timeout(path: &Path, busy_timeout: Duration) -> Result<Self, JobError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.busy_timeout(busy_timeout).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self, JobError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS print_jobs (
                id TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                range_start INTEGER NOT NULL,
                range_end INTEGER NOT NULL,
                template TEXT NOT NULL,
                total_tickets INTEGER NOT NULL,
                total_pages INTEGER NOT NULL,
                status TEXT NOT NULL,
                progress_percent INTEGER NOT NULL DEFAULT 0,
                printed_count INTEGER NOT NULL DEFAULT 0,
                cancel_requested INTEGER NOT NULL DEFAULT 0,
                error TEXT,
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_print_jobs_created ON print_jobs(created_at DESC);

            CREATE TABLE IF NOT EXISTS print_job_errors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL,
                ticket_id TEXT NOT NULL,
                ticket_number TEXT NOT NULL,
                kind TEXT NOT NULL,
                message TEXT NOT NULL,
                FOREIGN KEY (job_id) REFERENCES print_jobs(id)
            );

            CREATE INDEX IF NOT EXISTS idx_print_job_errors_job ON print_job_errors(job_id);
            "#,
        )
        .map_err(db_err)
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<PrintJob> {
        let category_str: String = row.get(1)?;
        let status_str: String = row.get(7)?;
        let created_at: String = row.get(12)?;
        let started_at: Option<String> = row.get(13)?;
        let completed_at: Option<String> = row.get(14)?;

        let category: Category = category_str
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
        let status = JobStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(7, "status".to_string(), Type::Text)
        })?;

        Ok(PrintJob {
            id: row.get(0)?,
            category,
            range_start: row.get(2)?,
            range_end: row.get(3)?,
            template: row.get(4)?,
            total_tickets: row.get(5)?,
            total_pages: row.get(6)?,
            status,
            progress_percent: row.get(8)?,
            printed_count: row.get(9)?,
            cancel_requested: row.get(10)?,
            error: row.get(11)?,
            errors: Vec::new(),
            created_at: parse_timestamp(&created_at),
            started_at: started_at.as_deref().map(parse_timestamp),
            completed_at: completed_at.as_deref().map(parse_timestamp),
        })
    }

    fn load_errors(conn: &Connection, job_id: &str) -> Result<Vec<JobItemError>, JobError> {
        let mut stmt = conn
            .prepare(
                "SELECT ticket_id, ticket_number, kind, message FROM print_job_errors WHERE job_id = ? ORDER BY id ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![job_id], |row| {
                let kind_str: String = row.get(2)?;
                let kind = JobItemErrorKind::parse(&kind_str).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(2, "kind".to_string(), Type::Text)
                })?;
                Ok(JobItemError {
                    ticket_id: row.get(0)?,
                    ticket_number: row.get(1)?,
                    kind,
                    message: row.get(3)?,
                })
            })
            .map_err(db_err)?;

        let mut errors = Vec::new();
        for row in rows {
            errors.push(row.map_err(db_err)?);
        }
        Ok(errors)
    }

    fn get_locked(conn: &Connection, id: &str) -> Result<Option<PrintJob>, JobError> {
        let result = conn.query_row(
            &format!("SELECT {} FROM print_jobs WHERE id = ?", JOB_COLUMNS),
            params![id],
            Self::row_to_job,
        );

        match result {
            Ok(mut job) => {
                job.errors = Self::load_errors(conn, id)?;
                Ok(Some(job))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    fn require_locked(conn: &Connection, id: &str) -> Result<PrintJob, JobError> {
        Self::get_locked(conn, id)?.ok_or_else(|| JobError::NotFound(id.to_string()))
    }
}

impl JobStore for SqliteJobStore {
    fn create(&self, job: &PrintJob) -> Result<(), JobError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO print_jobs (id, category, range_start, range_end, template, total_tickets, total_pages, status, progress_percent, printed_count, cancel_requested, error, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                job.id,
                job.category.as_str(),
                job.range_start,
                job.range_end,
                job.template,
                job.total_tickets,
                job.total_pages,
                job.status.as_str(),
                job.progress_percent,
                job.printed_count,
                job.cancel_requested,
                job.error,
                job.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<PrintJob>, JobError> {
        let conn = self.conn.lock().unwrap();
        Self::get_locked(&conn, id)
    }

    fn list(&self, limit: i64, offset: i64) -> Result<Vec<PrintJob>, JobError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM print_jobs ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
                JOB_COLUMNS
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit, offset], Self::row_to_job)
            .map_err(db_err)?;

        let mut jobs = Vec::new();
        for row in rows {
            let mut job = row.map_err(db_err)?;
            job.errors = Self::load_errors(&conn, &job.id)?;
            jobs.push(job);
        }
        Ok(jobs)
    }

    fn transition(
        &self,
        id: &str,
        from: &[JobStatus],
        to: JobStatus,
    ) -> Result<PrintJob, JobError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::require_locked(&conn, id)?;
        if !from.contains(&current.status) {
            return Err(JobError::InvalidState {
                job_id: id.to_string(),
                current: current.status,
                operation: format!("move to {}", to),
            });
        }

        let now = Utc::now().to_rfc3339();
        let changed = match to {
            JobStatus::Generating => conn.execute(
                "UPDATE print_jobs SET status = ?, started_at = COALESCE(started_at, ?), completed_at = NULL, error = NULL, cancel_requested = CASE WHEN status = 'failed' THEN 0 ELSE cancel_requested END WHERE id = ? AND status = ?",
                params![to.as_str(), now, id, current.status.as_str()],
            ),
            JobStatus::Completed | JobStatus::Failed => conn.execute(
                "UPDATE print_jobs SET status = ?, completed_at = ? WHERE id = ? AND status = ?",
                params![to.as_str(), now, id, current.status.as_str()],
            ),
            JobStatus::Scheduled | JobStatus::Printing => conn.execute(
                "UPDATE print_jobs SET status = ? WHERE id = ? AND status = ?",
                params![to.as_str(), id, current.status.as_str()],
            ),
        }
        .map_err(db_err)?;

        if changed == 0 {
            let latest = Self::require_locked(&conn, id)?;
            return Err(JobError::InvalidState {
                job_id: id.to_string(),
                current: latest.status,
                operation: format!("move to {}", to),
            });
        }

        Self::require_locked(&conn, id)
    }

    fn fail(&self, id: &str, message: &str) -> Result<PrintJob, JobError> {
        let conn = self.conn.lock().unwrap();

        let changed = conn
            .execute(
                "UPDATE print_jobs SET status = 'failed', error = ?, completed_at = ? WHERE id = ? AND status IN ('scheduled', 'generating', 'printing')",
                params![message, Utc::now().to_rfc3339(), id],
            )
            .map_err(db_err)?;

        let current = Self::require_locked(&conn, id)?;
        if changed == 0 {
            return Err(JobError::InvalidState {
                job_id: id.to_string(),
                current: current.status,
                operation: "fail".to_string(),
            });
        }
        Ok(current)
    }

    fn raise_progress(&self, id: &str, percent: u8) -> Result<u8, JobError> {
        let conn = self.conn.lock().unwrap();

        let changed = conn
            .execute(
                "UPDATE print_jobs SET progress_percent = MAX(progress_percent, MIN(?, 100)) WHERE id = ?",
                params![percent, id],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(JobError::NotFound(id.to_string()));
        }

        conn.query_row(
            "SELECT progress_percent FROM print_jobs WHERE id = ?",
            params![id],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    fn record_errors(&self, id: &str, errors: &[JobItemError]) -> Result<(), JobError> {
        if errors.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO print_job_errors (job_id, ticket_id, ticket_number, kind, message) VALUES (?, ?, ?, ?, ?)",
                )
                .map_err(db_err)?;
            for error in errors {
                stmt.execute(params![
                    id,
                    error.ticket_id,
                    error.ticket_number,
                    error.kind.as_str(),
                    error.message
                ])
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)
    }

    fn clear_errors(&self, id: &str) -> Result<(), JobError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM print_job_errors WHERE job_id = ?", params![id])
            .map_err(db_err)?;
        Ok(())
    }

    fn set_printed_count(&self, id: &str, count: u32) -> Result<(), JobError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE print_jobs SET printed_count = ? WHERE id = ?",
                params![count, id],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(JobError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn request_cancel(&self, id: &str) -> Result<PrintJob, JobError> {
        let conn = self.conn.lock().unwrap();

        let changed = conn
            .execute(
                "UPDATE print_jobs SET cancel_requested = 1 WHERE id = ? AND status IN ('scheduled', 'generating', 'printing')",
                params![id],
            )
            .map_err(db_err)?;

        let current = Self::require_locked(&conn, id)?;
        if changed == 0 {
            return Err(JobError::InvalidState {
                job_id: id.to_string(),
                current: current.status,
                operation: "cancel".to_string(),
            });
        }
        Ok(current)
    }

    fn is_cancel_requested(&self, id: &str) -> Result<bool, JobError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT cancel_requested FROM print_jobs WHERE id = ?",
            params![id],
            |row| row.get(0),
        );
        match result {
            Ok(flag) => Ok(flag),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(JobError::NotFound(id.to_string())),
            Err(e) => Err(db_err(e)),
        }
    }
}
