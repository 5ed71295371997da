//! # Marketing Strategy Crew
//!
//! The built-in crew and the request it runs on.

pub mod definitions;
pub mod request;

use tokio::sync::mpsc;

use crate::crew::{Crew, CrewEvent, CrewOutput, CrewSpec};
use crate::error::CrewResult;
use crate::llm::LlmClient;

pub use definitions::{
    chief_marketing_strategist, creative_content_creator, lead_market_analyst, marketing_crew,
};
pub use request::{
    check_credentials, check_credentials_with, preflight, preflight_with, StrategyRequest,
};

/// Validate the request and run `spec` on it
///
/// Field validation happens before the crew is built, so an incomplete
/// form never reaches the LLM.
pub async fn generate_strategy(
    client: &dyn LlmClient,
    spec: CrewSpec,
    request: &StrategyRequest,
    events: Option<mpsc::Sender<CrewEvent>>,
) -> CrewResult<CrewOutput> {
    request.validate()?;

    let mut crew = Crew::new(spec)?;
    if let Some(tx) = events {
        crew = crew.with_event_channel(tx);
    }

    tracing::info!(
        domain = %request.customer_domain,
        "Generating marketing strategy"
    );
    crew.kickoff(client, &request.inputs_now()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrewError;
    use crate::llm::CompletionRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    #[async_trait]
    impl LlmClient for Counting {
        async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("answer {} to: {}", n, request.prompt.lines().next().unwrap_or("")))
        }
    }

    #[tokio::test]
    async fn test_generate_strategy_runs_all_tasks() {
        let client = Counting(AtomicUsize::new(0));
        let request = StrategyRequest::new("crewai.com", "Launch of a new agent platform");

        let output = generate_strategy(&client, marketing_crew(), &request, None)
            .await
            .unwrap();

        assert_eq!(client.0.load(Ordering::SeqCst), 5);
        assert_eq!(output.tasks.len(), 5);
        assert!(output.final_output().starts_with("answer 4 to: Current Task: Create marketing copies"));
        assert!(output.tasks[0].description.contains("crewai.com"));
        assert!(!output.tasks[0].description.contains("{current_year}"));
    }

    #[tokio::test]
    async fn test_incomplete_form_never_calls_llm() {
        let client = Counting(AtomicUsize::new(0));
        let request = StrategyRequest::new("crewai.com", "");

        let err = generate_strategy(&client, marketing_crew(), &request, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CrewError::MissingField(_)));
        assert_eq!(client.0.load(Ordering::SeqCst), 0);
    }
}
