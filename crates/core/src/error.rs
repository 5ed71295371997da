//! # Crew Errors
//!
//! Typed failures for crew validation and execution. The server maps these
//! to status codes and to the generic messages shown in the form.

use thiserror::Error;

/// Errors raised while preparing or running a crew
#[derive(Debug, Error)]
pub enum CrewError {
    /// An API key the run needs is not present in the environment
    #[error("missing API key: {env_var}")]
    MissingApiKey { env_var: String },

    /// A required request field is empty
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A task description references an input that was not supplied
    #[error("task description references unknown input '{{{0}}}'")]
    MissingInput(String),

    /// The crew definition is inconsistent
    #[error("invalid crew: {0}")]
    InvalidCrew(String),

    /// The LLM call for a task failed
    #[error("task '{task}' failed: {source}")]
    Llm {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    /// The LLM returned nothing usable for a task
    #[error("task '{0}' produced an empty answer")]
    EmptyAnswer(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CrewError {
    /// Whether the error came from user input rather than the run itself
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CrewError::MissingApiKey { .. } | CrewError::MissingField(_)
        )
    }

    /// Generic message suitable for showing to the person who pressed the button
    pub fn user_message(&self) -> String {
        match self {
            CrewError::MissingApiKey { .. } => {
                "Please enter your API keys in the settings.".to_string()
            }
            CrewError::MissingField(_) => "Please fill in all the required fields.".to_string(),
            other => format!(
                "An error occurred while generating the marketing strategy: {}",
                other
            ),
        }
    }
}

pub type CrewResult<T> = Result<T, CrewError>;
