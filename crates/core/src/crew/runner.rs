//! # Crew Runner
//!
//! Runs a crew's tasks strictly in order, one LLM call per task, passing
//! earlier results forward as context.
//!
//! ```text
//! inputs → render all descriptions
//!        → task 1 (agent A) → task 2 (agent B, ctx: 1) → ... → task N
//!        → CrewOutput (final = task N)
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::agent::Agent;
use super::events::{CrewEvent, CrewEventKind};
use super::task::{build_prompt, Inputs, Task, TaskOutput};
use crate::error::{CrewError, CrewResult};
use crate::llm::LlmClient;

/// Serializable crew definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrewSpec {
    pub name: String,
    pub agents: Vec<Agent>,
    /// Executed in this order
    pub tasks: Vec<Task>,
}

impl CrewSpec {
    pub fn from_json(json: &str) -> CrewResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CrewError::InvalidCrew(format!("failed to parse crew definition: {}", e)))
    }

    /// Load a crew definition from a JSON file
    pub fn load(path: impl AsRef<Path>) -> CrewResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Strip web tools from every agent
    pub fn without_tools(mut self) -> Self {
        self.agents = self.agents.into_iter().map(Agent::without_tools).collect();
        self
    }
}

/// Results of a finished crew run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Every task's output, in execution order
    pub tasks: Vec<TaskOutput>,
    /// The last task's output
    pub final_output: String,
}

impl CrewOutput {
    fn from_tasks(tasks: Vec<TaskOutput>) -> Self {
        let final_output = tasks.last().map(|t| t.raw.clone()).unwrap_or_default();
        Self {
            tasks,
            final_output,
        }
    }

    pub fn final_output(&self) -> &str {
        &self.final_output
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskOutput> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// Every task's output as one Markdown document
    pub fn to_markdown(&self) -> String {
        self.tasks
            .iter()
            .map(|t| format!("## {} ({})\n\n{}\n", humanize(&t.task_id), t.agent_role, t.raw))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// "marketing_strategy_task" → "Marketing Strategy"
fn humanize(task_id: &str) -> String {
    task_id
        .trim_end_matches("_task")
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A validated crew, ready to run
pub struct Crew {
    spec: CrewSpec,
    event_tx: Option<mpsc::Sender<CrewEvent>>,
}

impl Crew {
    /// Validate a crew definition
    ///
    /// Rejects empty crews, duplicate ids, tasks naming unknown agents, and
    /// context references that are not earlier tasks.
    pub fn new(spec: CrewSpec) -> CrewResult<Self> {
        if spec.tasks.is_empty() {
            return Err(CrewError::InvalidCrew("crew has no tasks".to_string()));
        }

        let mut agent_ids = HashSet::new();
        for agent in &spec.agents {
            if !agent_ids.insert(agent.id.as_str()) {
                return Err(CrewError::InvalidCrew(format!(
                    "duplicate agent id '{}'",
                    agent.id
                )));
            }
        }

        let mut earlier = HashSet::new();
        for task in &spec.tasks {
            if !agent_ids.contains(task.agent.as_str()) {
                return Err(CrewError::InvalidCrew(format!(
                    "task '{}' uses unknown agent '{}'",
                    task.id, task.agent
                )));
            }
            for dep in &task.context {
                if !earlier.contains(dep.as_str()) {
                    return Err(CrewError::InvalidCrew(format!(
                        "task '{}' reads context from '{}', which is not an earlier task",
                        task.id, dep
                    )));
                }
            }
            if !earlier.insert(task.id.as_str()) {
                return Err(CrewError::InvalidCrew(format!(
                    "duplicate task id '{}'",
                    task.id
                )));
            }
        }

        Ok(Self {
            spec,
            event_tx: None,
        })
    }

    /// Set event channel for streaming events
    pub fn with_event_channel(mut self, tx: mpsc::Sender<CrewEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn spec(&self) -> &CrewSpec {
        &self.spec
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.spec.agents.iter().find(|a| a.id == id)
    }

    /// Render every task description; fails on the first missing input
    pub fn render_all(&self, inputs: &Inputs) -> CrewResult<Vec<String>> {
        self.spec.tasks.iter().map(|t| t.render(inputs)).collect()
    }

    async fn emit(&self, event: CrewEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    /// Run every task in order and collect the results
    #[tracing::instrument(skip_all, fields(crew = %self.spec.name, tasks = self.spec.tasks.len()))]
    pub async fn kickoff(&self, client: &dyn LlmClient, inputs: &Inputs) -> CrewResult<CrewOutput> {
        let descriptions = self.render_all(inputs)?;

        tracing::info!("Crew started");
        self.emit(
            CrewEvent::new(CrewEventKind::CrewStarted, "crew")
                .with_data(serde_json::json!({ "tasks": self.spec.tasks.len() })),
        )
        .await;

        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(self.spec.tasks.len());
        let mut index_of: HashMap<&str, usize> = HashMap::new();

        for (position, (task, description)) in
            self.spec.tasks.iter().zip(descriptions).enumerate()
        {
            // Validated in Crew::new
            let Some(agent) = self.agent(&task.agent) else {
                return Err(CrewError::InvalidCrew(format!(
                    "task '{}' uses unknown agent '{}'",
                    task.id, task.agent
                )));
            };

            let context: Vec<&TaskOutput> = if task.context.is_empty() {
                outputs.last().into_iter().collect()
            } else {
                task.context
                    .iter()
                    .filter_map(|dep| index_of.get(dep.as_str()).map(|&i| &outputs[i]))
                    .collect()
            };

            tracing::info!(task = %task.id, agent = %agent.role, "Task started");
            self.emit(
                CrewEvent::new(CrewEventKind::TaskStarted, &agent.role)
                    .with_task(&task.id)
                    .with_data(serde_json::json!({
                        "index": position,
                        "description": description,
                    })),
            )
            .await;

            let prompt = build_prompt(&description, task.expected_output.as_deref(), &context);

            let raw = match agent.execute(client, &task.id, prompt).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::error!(task = %task.id, "Task failed: {}", e);
                    self.emit(
                        CrewEvent::new(CrewEventKind::TaskFailed, &agent.role)
                            .with_task(&task.id)
                            .with_data(serde_json::json!({ "error": e.to_string() })),
                    )
                    .await;
                    self.emit(
                        CrewEvent::new(CrewEventKind::CrewFailed, "crew")
                            .with_data(serde_json::json!({ "error": e.to_string() })),
                    )
                    .await;
                    return Err(e);
                }
            };

            tracing::info!(task = %task.id, chars = raw.len(), "Task completed");
            self.emit(
                CrewEvent::new(CrewEventKind::TaskCompleted, &agent.role)
                    .with_task(&task.id)
                    .with_data(serde_json::json!({ "index": position, "output": raw })),
            )
            .await;

            index_of.insert(task.id.as_str(), outputs.len());
            outputs.push(TaskOutput {
                task_id: task.id.clone(),
                agent_role: agent.role.clone(),
                description,
                raw,
            });
        }

        let output = CrewOutput::from_tasks(outputs);

        tracing::info!("Crew completed");
        self.emit(
            CrewEvent::new(CrewEventKind::CrewCompleted, "crew")
                .with_data(serde_json::json!({ "tasks": output.tasks.len() })),
        )
        .await;

        Ok(output)
    }
}
