//! # Crew Agents
//!
//! An agent is a role, a goal and a backstory. Executing it is exactly one
//! LLM call with those fields as the system prompt.

use serde::{Deserialize, Serialize};

use crate::error::{CrewError, CrewResult};
use crate::llm::{CompletionRequest, LlmClient};

fn default_tools() -> bool {
    true
}

/// A role-playing agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    /// Stable identifier tasks refer to (e.g. "lead_market_analyst")
    pub id: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Whether the agent may search the web and read pages
    #[serde(default = "default_tools")]
    pub tools: bool,
    /// Carried for crew files; agents never delegate
    #[serde(default)]
    pub allow_delegation: bool,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: true,
            allow_delegation: false,
        }
    }

    /// Disable web tools for this agent
    pub fn without_tools(mut self) -> Self {
        self.tools = false;
        self
    }

    /// System prompt forwarded with every task this agent runs
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role.trim(),
            self.backstory.trim(),
            self.goal.trim()
        );
        if self.tools {
            prompt.push_str(
                "\n\nYou can search the internet and read websites. Use them to ground \
                 your answer in current, verifiable information.",
            );
        }
        prompt
    }

    /// Run one task prompt through the LLM
    pub async fn execute(
        &self,
        client: &dyn LlmClient,
        task_id: &str,
        prompt: String,
    ) -> CrewResult<String> {
        let request = CompletionRequest {
            system: self.system_prompt(),
            prompt,
            use_tools: self.tools,
        };

        let raw = client
            .complete(&request)
            .await
            .map_err(|source| CrewError::Llm {
                task: task_id.to_string(),
                source,
            })?;

        let answer = raw.trim();
        if answer.is_empty() {
            return Err(CrewError::EmptyAnswer(task_id.to_string()));
        }
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recording {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmClient for Recording {
        async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn analyst() -> Agent {
        Agent::new(
            "analyst",
            "Lead Market Analyst",
            "Find insights.",
            "You dissect online business landscapes.",
        )
    }

    #[test]
    fn test_system_prompt_contains_triple() {
        let prompt = analyst().system_prompt();
        assert!(prompt.starts_with("You are Lead Market Analyst."));
        assert!(prompt.contains("dissect online business landscapes"));
        assert!(prompt.contains("Your personal goal is: Find insights."));
        assert!(prompt.contains("search the internet"));

        let prompt = analyst().without_tools().system_prompt();
        assert!(!prompt.contains("search the internet"));
    }

    #[tokio::test]
    async fn test_execute_forwards_prompt_and_trims() {
        let client = Recording {
            reply: "  insight  \n".to_string(),
            seen: Mutex::new(Vec::new()),
        };
        let agent = analyst();

        let answer = agent
            .execute(&client, "research_task", "Research acme.com".to_string())
            .await
            .unwrap();
        assert_eq!(answer, "insight");

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].prompt, "Research acme.com");
        assert_eq!(seen[0].system, agent.system_prompt());
        assert!(seen[0].use_tools);
    }

    #[tokio::test]
    async fn test_execute_rejects_blank_answer() {
        let client = Recording {
            reply: "   ".to_string(),
            seen: Mutex::new(Vec::new()),
        };
        let err = analyst()
            .execute(&client, "research_task", "x".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CrewError::EmptyAnswer(ref t) if t == "research_task"));
    }

    #[test]
    fn test_agent_defaults_from_json() {
        let agent: Agent = serde_json::from_str(
            r#"{"id":"a","role":"R","goal":"G","backstory":"B"}"#,
        )
        .unwrap();
        assert!(agent.tools);
        assert!(!agent.allow_delegation);
    }
}
