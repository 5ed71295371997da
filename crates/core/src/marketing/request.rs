//! # Strategy Requests
//!
//! The two form fields, their validation, and the API key check that runs
//! before any LLM call is made.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::crew::Inputs;
use crate::error::{CrewError, CrewResult};
use crate::models::LlmProvider;

/// What the user typed into the form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategyRequest {
    /// e.g. "crewai.com"
    pub customer_domain: String,
    pub project_description: String,
}

impl StrategyRequest {
    pub fn new(customer_domain: impl Into<String>, project_description: impl Into<String>) -> Self {
        Self {
            customer_domain: customer_domain.into(),
            project_description: project_description.into(),
        }
    }

    /// Both fields must contain something other than whitespace
    pub fn validate(&self) -> CrewResult<()> {
        if self.customer_domain.trim().is_empty() {
            return Err(CrewError::MissingField("customer_domain"));
        }
        if self.project_description.trim().is_empty() {
            return Err(CrewError::MissingField("project_description"));
        }
        Ok(())
    }

    /// Template inputs for the marketing crew
    pub fn inputs(&self, current_year: i32) -> Inputs {
        let mut inputs = Inputs::new();
        inputs.insert(
            "customer_domain".to_string(),
            self.customer_domain.trim().to_string(),
        );
        inputs.insert(
            "project_description".to_string(),
            self.project_description.trim().to_string(),
        );
        inputs.insert("current_year".to_string(), current_year.to_string());
        inputs
    }

    /// Template inputs using this year's date
    pub fn inputs_now(&self) -> Inputs {
        self.inputs(chrono::Utc::now().year())
    }
}

/// Check the keys a run needs are present in the process environment
pub fn check_credentials(provider: LlmProvider, search_enabled: bool) -> CrewResult<()> {
    check_credentials_with(provider, search_enabled, |name| std::env::var(name).ok())
}

/// [`check_credentials`] with an injectable variable lookup
pub fn check_credentials_with<F>(
    provider: LlmProvider,
    search_enabled: bool,
    lookup: F,
) -> CrewResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let present = |name: &str| lookup(name).is_some_and(|v| !v.trim().is_empty());

    if !present(provider.api_key_env()) {
        return Err(CrewError::MissingApiKey {
            env_var: provider.api_key_env().to_string(),
        });
    }

    if search_enabled && !present("SERPER_API_KEY") && !present("SEARXNG_URL") {
        return Err(CrewError::MissingApiKey {
            env_var: "SERPER_API_KEY".to_string(),
        });
    }

    Ok(())
}

/// Everything checked before a run: keys first, then the form fields
pub fn preflight(
    provider: LlmProvider,
    search_enabled: bool,
    request: &StrategyRequest,
) -> CrewResult<()> {
    check_credentials(provider, search_enabled)?;
    request.validate()
}

/// [`preflight`] with an injectable variable lookup
pub fn preflight_with<F>(
    provider: LlmProvider,
    search_enabled: bool,
    request: &StrategyRequest,
    lookup: F,
) -> CrewResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    check_credentials_with(provider, search_enabled, lookup)?;
    request.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_validate_requires_both_fields() {
        assert_ok!(StrategyRequest::new("crewai.com", "Launch").validate());

        let err = StrategyRequest::new("  ", "Launch").validate().unwrap_err();
        assert!(matches!(err, CrewError::MissingField("customer_domain")));

        let err = StrategyRequest::new("crewai.com", "\n").validate().unwrap_err();
        assert!(matches!(err, CrewError::MissingField("project_description")));
    }

    #[test]
    fn test_inputs_are_trimmed_and_dated() {
        let inputs = StrategyRequest::new(" crewai.com ", " Launch ").inputs(2026);
        assert_eq!(inputs["customer_domain"], "crewai.com");
        assert_eq!(inputs["project_description"], "Launch");
        assert_eq!(inputs["current_year"], "2026");
    }

    #[test]
    fn test_llm_key_required() {
        let err = check_credentials_with(LlmProvider::OpenAI, false, env(&[])).unwrap_err();
        assert!(matches!(err, CrewError::MissingApiKey { ref env_var } if env_var == "OPENAI_API_KEY"));

        let err = check_credentials_with(
            LlmProvider::Anthropic,
            false,
            env(&[("OPENAI_API_KEY", "sk-1")]),
        )
        .unwrap_err();
        assert!(matches!(err, CrewError::MissingApiKey { ref env_var } if env_var == "ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_search_key_required_only_when_enabled() {
        let llm_only = env(&[("OPENAI_API_KEY", "sk-1")]);
        assert_ok!(check_credentials_with(LlmProvider::OpenAI, false, &llm_only));

        let err = check_credentials_with(LlmProvider::OpenAI, true, &llm_only).unwrap_err();
        assert!(matches!(err, CrewError::MissingApiKey { ref env_var } if env_var == "SERPER_API_KEY"));
    }

    #[test]
    fn test_searxng_satisfies_search() {
        let vars = env(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("SEARXNG_URL", "http://localhost:8888"),
        ]);
        assert_ok!(check_credentials_with(LlmProvider::OpenAI, true, vars));
    }

    #[test]
    fn test_blank_keys_count_as_missing() {
        let vars = env(&[("OPENAI_API_KEY", "   ")]);
        assert_err!(check_credentials_with(LlmProvider::OpenAI, false, vars));
    }

    #[test]
    fn test_missing_key_reported_before_missing_fields() {
        let empty = StrategyRequest::new("", "");

        let err = preflight_with(LlmProvider::Gemini, false, &empty, env(&[])).unwrap_err();
        assert!(matches!(err, CrewError::MissingApiKey { ref env_var } if env_var == "GEMINI_API_KEY"));
        assert_eq!(err.user_message(), "Please enter your API keys in the settings.");

        let err = preflight_with(
            LlmProvider::Gemini,
            false,
            &empty,
            env(&[("GEMINI_API_KEY", "g-1")]),
        )
        .unwrap_err();
        assert!(matches!(err, CrewError::MissingField("customer_domain")));
    }
}
