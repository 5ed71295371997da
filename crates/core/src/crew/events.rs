//! # Crew Events
//!
//! Progress notifications emitted while a crew runs. The server forwards
//! them to the browser over SSE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of crew event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CrewEventKind {
    CrewStarted,
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    CrewCompleted,
    CrewFailed,
}

/// An event in a crew run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewEvent {
    /// Unique event ID
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: CrewEventKind,
    /// Role of the agent involved, or "crew"
    pub agent: String,
    /// Task the event belongs to, if any
    #[serde(default)]
    pub task_id: Option<String>,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl CrewEvent {
    /// Create a new event
    pub fn new(kind: CrewEventKind, agent: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            agent: agent.to_string(),
            task_id: None,
            data: None,
        }
    }

    /// Add data to the event
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach the task id
    pub fn with_task(mut self, task_id: &str) -> Self {
        self.task_id = Some(task_id.to_string());
        self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            CrewEventKind::CrewCompleted | CrewEventKind::CrewFailed
        )
    }
}
