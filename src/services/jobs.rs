//! Durable job tracking for ingestion scans.
//!
//! One SQLite row per scan request, driven through the state machine
//! `Pending → InProgress → Completed | Failed`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::JobError;
use crate::models::{JobRecord, JobState};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS scan_jobs (
    job_id TEXT PRIMARY KEY,
    state TEXT NOT NULL,
    message TEXT NOT NULL,
    urls TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT
);
"#;

pub struct JobStore {
    conn: Mutex<Connection>,
}

impl JobStore {
    pub fn open(path: &Path) -> Result<Self, JobError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Non-durable store, used by tests and default deployments without
    /// a data directory.
    pub fn open_in_memory() -> Result<Self, JobError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Allocates a new job in `Pending`. An empty URL list is rejected
    /// before any id is allocated.
    pub fn create_job(&self, urls: &[String]) -> Result<String, JobError> {
        if urls.is_empty() {
            return Err(JobError::NoUrls);
        }

        let job_id = Uuid::new_v4().to_string();
        let urls_json =
            serde_json::to_string(urls).map_err(|err| JobError::Encoding(err.to_string()))?;

        self.lock().execute(
            "INSERT INTO scan_jobs (job_id, state, message, urls, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
            params![
                job_id,
                JobState::Pending.to_string(),
                "Started",
                urls_json,
                Utc::now().to_rfc3339(),
            ],
        )?;

        info!(job_id = %job_id, urls = urls.len(), "created scan job");
        Ok(job_id)
    }

    /// Snapshot of one job, or `None` for an unknown id.
    pub fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>, JobError> {
        let row: Option<(String, String, String, String, String, Option<String>)> = self
            .lock()
            .query_row(
                "SELECT job_id, state, message, urls, created_at, updated_at
                 FROM scan_jobs WHERE job_id = ?1",
                params![job_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(
            |(job_id, state, message, urls, created_at, updated_at)| JobRecord {
                job_id,
                state: state.parse().unwrap_or(JobState::Pending),
                message,
                urls: serde_json::from_str(&urls).unwrap_or_default(),
                created_at: created_at
                    .parse::<DateTime<Utc>>()
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                updated_at: updated_at.and_then(|raw| raw.parse().ok()),
            },
        ))
    }

    /// Overwrites state, message, and `updated_at`. Passing no message
    /// keeps the previous one. Updating an unknown id is a logged no-op
    /// rather than an error.
    pub fn update_job(
        &self,
        job_id: &str,
        state: JobState,
        message: Option<&str>,
    ) -> Result<(), JobError> {
        let now = Utc::now().to_rfc3339();
        let changed = match message {
            Some(message) => self.lock().execute(
                "UPDATE scan_jobs SET state = ?1, message = ?2, updated_at = ?3
                 WHERE job_id = ?4",
                params![state.to_string(), message, now, job_id],
            )?,
            None => self.lock().execute(
                "UPDATE scan_jobs SET state = ?1, updated_at = ?2 WHERE job_id = ?3",
                params![state.to_string(), now, job_id],
            )?,
        };

        if changed == 0 {
            warn!(job_id = %job_id, "attempted to update non-existent job");
        } else {
            info!(job_id = %job_id, state = %state, "updated scan job");
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> JobStore {
        JobStore::open_in_memory().unwrap()
    }

    fn urls() -> Vec<String> {
        vec!["http://example.com/a".to_string()]
    }

    #[test]
    fn test_create_job_starts_pending() {
        let store = store();
        let job_id = store.create_job(&urls()).unwrap();

        let record = store.get_job(&job_id).unwrap().unwrap();
        assert_eq!(record.state, JobState::Pending);
        assert_eq!(record.message, "Started");
        assert_eq!(record.urls, urls());
        assert!(record.updated_at.is_none());
    }

    #[test]
    fn test_create_job_rejects_empty_urls() {
        assert!(matches!(store().create_job(&[]), Err(JobError::NoUrls)));
    }

    #[test]
    fn test_get_unknown_job_is_none() {
        assert!(store().get_job("no-such-job").unwrap().is_none());
    }

    #[test]
    fn test_update_overwrites_state_and_message() {
        let store = store();
        let job_id = store.create_job(&urls()).unwrap();

        store
            .update_job(&job_id, JobState::InProgress, Some("Processing"))
            .unwrap();
        let record = store.get_job(&job_id).unwrap().unwrap();
        assert_eq!(record.state, JobState::InProgress);
        assert_eq!(record.message, "Processing");
        assert!(record.updated_at.is_some());

        store
            .update_job(&job_id, JobState::Completed, Some("Completed"))
            .unwrap();
        let record = store.get_job(&job_id).unwrap().unwrap();
        assert_eq!(record.state, JobState::Completed);
    }

    #[test]
    fn test_update_without_message_keeps_previous() {
        let store = store();
        let job_id = store.create_job(&urls()).unwrap();

        store.update_job(&job_id, JobState::InProgress, None).unwrap();
        let record = store.get_job(&job_id).unwrap().unwrap();
        assert_eq!(record.state, JobState::InProgress);
        assert_eq!(record.message, "Started");
    }

    #[test]
    fn test_update_unknown_job_is_noop() {
        let store = store();
        store
            .update_job("no-such-job", JobState::Failed, Some("boom"))
            .unwrap();
        assert!(store.get_job("no-such-job").unwrap().is_none());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");

        let job_id = {
            let store = JobStore::open(&path).unwrap();
            store.create_job(&urls()).unwrap()
        };

        // Records survive reopening the database.
        let store = JobStore::open(&path).unwrap();
        let record = store.get_job(&job_id).unwrap().unwrap();
        assert_eq!(record.state, JobState::Pending);
    }
}
