//! # Crew Tasks
//!
//! A task is a natural-language instruction run by one agent. Descriptions
//! may contain `{name}` placeholders filled from the run inputs; `{{` and
//! `}}` produce literal braces.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CrewError, CrewResult};

/// Named values substituted into task descriptions
pub type Inputs = BTreeMap<String, String>;

/// Divider placed between context blocks
pub const CONTEXT_DIVIDER: &str = "\n\n----------\n\n";

/// A single instruction in the crew
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Stable identifier (e.g. "research_task")
    pub id: String,
    /// Description template with `{name}` placeholders
    pub description: String,
    /// Id of the agent that runs this task
    pub agent: String,
    /// Ids of earlier tasks whose output this task reads.
    /// Empty means "the previous task's output".
    #[serde(default)]
    pub context: Vec<String>,
    /// What a good answer looks like
    #[serde(default)]
    pub expected_output: Option<String>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        agent: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            agent: agent.into(),
            context: Vec::new(),
            expected_output: None,
        }
    }

    pub fn with_context(mut self, tasks: &[&str]) -> Self {
        self.context = tasks.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    /// Substitute inputs into the description
    pub fn render(&self, inputs: &Inputs) -> CrewResult<String> {
        render_template(&self.description, inputs)
    }

    /// Names of every placeholder in the description
    pub fn placeholders(&self) -> Vec<String> {
        let mut names = Vec::new();
        scan_template(&self.description, |name| {
            names.push(name.to_string());
            Some(String::new())
        });
        names
    }
}

/// Result of one task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskOutput {
    pub task_id: String,
    pub agent_role: String,
    /// Rendered description the agent received
    pub description: String,
    pub raw: String,
}

/// Build the user prompt for a task
pub fn build_prompt(
    description: &str,
    expected_output: Option<&str>,
    context: &[&TaskOutput],
) -> String {
    let mut prompt = format!("Current Task: {}\n", description.trim());

    if let Some(expected) = expected_output.filter(|e| !e.trim().is_empty()) {
        prompt.push_str(&format!(
            "\nThis is the expected criteria for your final answer: {}\n",
            expected.trim()
        ));
    }
    prompt.push_str(
        "You MUST return the actual complete content as the final answer, not a summary.\n",
    );

    let context_text = context
        .iter()
        .map(|c| c.raw.as_str())
        .filter(|raw| !raw.trim().is_empty())
        .collect::<Vec<_>>()
        .join(CONTEXT_DIVIDER);
    if !context_text.is_empty() {
        prompt.push_str(&format!(
            "\nThis is the context you're working with:\n{}\n",
            context_text
        ));
    }

    prompt.push_str("\nBegin! Give your best final answer.");
    prompt
}

/// Fill `{name}` placeholders; unknown names are an error
pub fn render_template(template: &str, inputs: &Inputs) -> CrewResult<String> {
    let mut missing = None;
    let rendered = scan_template(template, |name| match inputs.get(name) {
        Some(value) => Some(value.clone()),
        None => {
            missing.get_or_insert_with(|| name.to_string());
            None
        }
    });
    match missing {
        Some(name) => Err(CrewError::MissingInput(name)),
        None => Ok(rendered),
    }
}

/// Walk a template, asking `resolve` for each placeholder.
/// A `None` from `resolve` leaves the placeholder text in place.
fn scan_template<F>(template: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('{') {
            if let Some(end) = tail.find('}') {
                let name = &tail[1..end];
                if is_placeholder_name(name) {
                    match resolve(name) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&tail[..=end]),
                    }
                    rest = &tail[end + 1..];
                    continue;
                }
            }
        }

        // Lone brace that is not part of a placeholder
        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    out.push_str(rest);
    out
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> Inputs {
        let mut inputs = Inputs::new();
        inputs.insert("customer_domain".to_string(), "crewai.com".to_string());
        inputs.insert("project_description".to_string(), "A launch".to_string());
        inputs
    }

    #[test]
    fn test_render_substitutes_inputs() {
        let task = Task::new(
            "research_task",
            "analyst",
            "Research {customer_domain} for {project_description}. Again: {customer_domain}",
        );
        assert_eq!(
            task.render(&inputs()).unwrap(),
            "Research crewai.com for A launch. Again: crewai.com"
        );
    }

    #[test]
    fn test_render_reports_first_missing_input() {
        let task = Task::new("t", "a", "In {current_year}, for {audience}");
        let err = task.render(&inputs()).unwrap_err();
        assert!(matches!(err, CrewError::MissingInput(ref n) if n == "current_year"));
    }

    #[test]
    fn test_render_handles_escapes_and_stray_braces() {
        let task = Task::new("t", "a", "Use {{json}} like {\"k\": 1} for {customer_domain}}");
        assert_eq!(
            task.render(&inputs()).unwrap(),
            "Use {json} like {\"k\": 1} for crewai.com}"
        );
    }

    #[test]
    fn test_placeholders_lists_names() {
        let task = Task::new("t", "a", "{a} and {b_2} but not {{c}} or {not valid}");
        assert_eq!(task.placeholders(), vec!["a".to_string(), "b_2".to_string()]);
    }

    #[test]
    fn test_build_prompt_with_context() {
        let strategy = TaskOutput {
            task_id: "marketing_strategy_task".to_string(),
            agent_role: "Chief Marketing Strategist".to_string(),
            description: "Strategy".to_string(),
            raw: "Position as premium.".to_string(),
        };
        let ideas = TaskOutput {
            task_id: "campaign_idea_task".to_string(),
            agent_role: "Creative Content Creator".to_string(),
            description: "Ideas".to_string(),
            raw: "Run a teaser campaign.".to_string(),
        };

        let prompt = build_prompt("Write copy.", Some("Three ad copies"), &[&strategy, &ideas]);
        assert!(prompt.starts_with("Current Task: Write copy."));
        assert!(prompt.contains("expected criteria for your final answer: Three ad copies"));
        assert!(prompt.contains("Position as premium.\n\n----------\n\nRun a teaser campaign."));
    }

    #[test]
    fn test_build_prompt_without_context() {
        let prompt = build_prompt("Research.", None, &[]);
        assert!(!prompt.contains("context you're working with"));
        assert!(!prompt.contains("expected criteria"));
        assert!(prompt.ends_with("Begin! Give your best final answer."));
    }
}
