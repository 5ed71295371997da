//! # Run Progress
//!
//! Tracks how far a crew run has got, for status displays.

use serde::{Deserialize, Serialize};

/// Stage of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    /// Nothing has been started
    #[default]
    Idle,
    /// Tasks are executing
    Running,
    /// Every task finished
    Complete,
    /// A task failed and the run stopped
    Failed,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

/// The run progress state machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub stage: RunStage,
    /// Tasks finished so far
    pub completed: usize,
    /// Tasks in the crew
    pub total: usize,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a run of `total` tasks
    pub fn start(&mut self, total: usize) {
        self.total = total;
        self.completed = 0;
        self.stage = if total == 0 {
            RunStage::Complete
        } else {
            RunStage::Running
        };
    }

    /// Record one finished task
    pub fn advance(&mut self) {
        if self.stage != RunStage::Running {
            return;
        }
        self.completed += 1;
        if self.completed >= self.total {
            self.stage = RunStage::Complete;
        }
    }

    /// Fail the run
    pub fn fail(&mut self) {
        self.stage = RunStage::Failed;
    }

    /// Index of the task currently executing
    pub fn current_task(&self) -> Option<usize> {
        (self.stage == RunStage::Running).then_some(self.completed)
    }

    pub fn is_running(&self) -> bool {
        self.stage == RunStage::Running
    }

    /// Check if the run is over, successfully or not
    pub fn is_finished(&self) -> bool {
        matches!(self.stage, RunStage::Complete | RunStage::Failed)
    }

    /// Share of tasks completed, 0.0 to 1.0
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return if self.stage == RunStage::Complete { 1.0 } else { 0.0 };
        }
        self.completed as f32 / self.total as f32
    }
}
