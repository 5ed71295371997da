//! # Run History
//!
//! Every strategy request and its outcome, stored in `.pitchcraft/pitchcraft.db`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::marketing::StrategyRequest;

/// Schema version for migrations
const SCHEMA_VERSION: i32 = 1;

/// Database file name inside the data directory
pub const DB_FILE: &str = "pitchcraft.db";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Running,
        }
    }
}

/// One strategy run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub customer_domain: String,
    pub project_description: String,
    pub status: RunStatus,
    /// Final task output, once completed
    pub output: Option<String>,
    /// Message shown to the user, once failed
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// SQLite-backed run history
#[derive(Clone)]
pub struct RunStore {
    conn: Arc<Mutex<Connection>>,
}

impl RunStore {
    /// Open database at a specific path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(path.as_ref()).context("Failed to open run database")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// In-memory store, nothing survives the process
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(&conn)?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                [1],
            )?;
        }

        Ok(())
    }

    fn migrate_v1(conn: &Connection) -> Result<()> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                customer_domain TEXT NOT NULL,
                project_description TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'running',
                output TEXT,
                error TEXT,
                created_at TEXT NOT NULL,
                finished_at TEXT
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_created ON runs(created_at)",
            [],
        )?;

        tracing::info!("Run history initialized with schema version {}", SCHEMA_VERSION);
        Ok(())
    }

    /// Record a new running request and return its id
    pub fn create(&self, request: &StrategyRequest) -> Result<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            r#"
            INSERT INTO runs (id, customer_domain, project_description, status, created_at)
            VALUES (?1, ?2, ?3, 'running', ?4)
            "#,
            params![
                id,
                request.customer_domain,
                request.project_description,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(id)
    }

    pub fn complete(&self, id: &str, output: &str) -> Result<()> {
        self.finish(id, RunStatus::Completed, Some(output), None)
    }

    pub fn fail(&self, id: &str, error: &str) -> Result<()> {
        self.finish(id, RunStatus::Failed, None, Some(error))
    }

    fn finish(
        &self,
        id: &str,
        status: RunStatus,
        output: Option<&str>,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let affected = conn.execute(
            r#"
            UPDATE runs
            SET status = ?1, output = ?2, error = ?3, finished_at = ?4
            WHERE id = ?5
            "#,
            params![status.as_str(), output, error, Utc::now().to_rfc3339(), id],
        )?;

        if affected == 0 {
            anyhow::bail!("Run not found: {}", id);
        }
        Ok(())
    }

    /// Load a run by id, `None` if unknown
    pub fn get(&self, id: &str) -> Result<Option<RunRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, customer_domain, project_description, status, output, error,
                   created_at, finished_at
            FROM runs WHERE id = ?1
            "#,
        )?;

        let record = stmt
            .query_row(params![id], Self::row_to_record)
            .optional()
            .context("Failed to read run")?;
        Ok(record)
    }

    /// Most recent runs first
    pub fn list(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, customer_domain, project_description, status, output, error,
                   created_at, finished_at
            FROM runs
            ORDER BY rowid DESC
            LIMIT ?1
            "#,
        )?;

        let runs = stmt
            .query_map(params![limit as i64], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list runs")?;

        Ok(runs)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<RunRecord> {
        let created_at_str: String = row.get(6)?;
        let finished_at_str: Option<String> = row.get(7)?;

        Ok(RunRecord {
            id: row.get(0)?,
            customer_domain: row.get(1)?,
            project_description: row.get(2)?,
            status: RunStatus::from_str(&row.get::<_, String>(3)?),
            output: row.get(4)?,
            error: row.get(5)?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            finished_at: finished_at_str.and_then(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|t| t.with_timezone(&Utc))
                    .ok()
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StrategyRequest {
        StrategyRequest::new("crewai.com", "Launch of a new agent platform")
    }

    #[test]
    fn test_create_and_complete() {
        let store = RunStore::in_memory().unwrap();
        let id = store.create(&request()).unwrap();

        let run = store.get(&id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.customer_domain, "crewai.com");
        assert!(run.finished_at.is_none());

        store.complete(&id, "# Copies").unwrap();
        let run = store.get(&id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.output.as_deref(), Some("# Copies"));
        assert!(run.error.is_none());
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_fail_records_message() {
        let store = RunStore::in_memory().unwrap();
        let id = store.create(&request()).unwrap();
        store.fail(&id, "rate limited").unwrap();

        let run = store.get(&id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("rate limited"));
        assert!(run.output.is_none());
    }

    #[test]
    fn test_unknown_run() {
        let store = RunStore::in_memory().unwrap();
        assert!(store.get("missing").unwrap().is_none());
        assert!(store.complete("missing", "x").is_err());
    }

    #[test]
    fn test_list_newest_first_with_limit() {
        let store = RunStore::in_memory().unwrap();
        let first = store.create(&request()).unwrap();
        let second = store.create(&request()).unwrap();
        let third = store.create(&request()).unwrap();

        let runs = store.list(2).unwrap();
        let ids: Vec<&str> = runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![third.as_str(), second.as_str()]);
        assert!(!ids.contains(&first.as_str()));
    }

    #[test]
    fn test_reopen_keeps_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.db");

        let id = {
            let store = RunStore::open_at(&path).unwrap();
            store.create(&request()).unwrap()
        };

        let store = RunStore::open_at(&path).unwrap();
        assert!(store.get(&id).unwrap().is_some());
    }
}
