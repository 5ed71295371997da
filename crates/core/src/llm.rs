//! # LLM Client
//!
//! The seam between the crew runtime and the LLM providers. Agents only see
//! [`LlmClient`]; the production implementation runs radkit functions and
//! workers, and tests plug in scripted clients.

use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::ModelConfig;
use crate::tools::agent_tools;

/// Macro to run an LlmFunction with any provider.
/// Handles the provider matching once in a central place.
#[macro_export]
macro_rules! run_llm_function {
    ($config:expr, $output_type:ty, $system_prompt:expr, $input:expr) => {{
        use radkit::agent::LlmFunction;
        use radkit::models::providers::{
            AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
        };
        use $crate::models::LlmProvider;

        let config = $config;
        let result: anyhow::Result<$output_type> = match config.provider {
            LlmProvider::Anthropic => {
                let llm = AnthropicLlm::from_env(&config.model)?;
                let func =
                    LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt);
                func.run($input).await.map_err(Into::into)
            }
            LlmProvider::OpenAI => {
                let mut llm = OpenAILlm::from_env(&config.model)?;
                if let Some(base_url) = &config.base_url {
                    llm = llm.with_base_url(base_url);
                }
                let func =
                    LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt);
                func.run($input).await.map_err(Into::into)
            }
            LlmProvider::Gemini => {
                let llm = GeminiLlm::from_env(&config.model)?;
                let func =
                    LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt);
                func.run($input).await.map_err(Into::into)
            }
            LlmProvider::OpenRouter => {
                let llm = OpenRouterLlm::from_env(&config.model)?;
                let func =
                    LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt);
                func.run($input).await.map_err(Into::into)
            }
            LlmProvider::Grok => {
                let llm = GrokLlm::from_env(&config.model)?;
                let func =
                    LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt);
                func.run($input).await.map_err(Into::into)
            }
            LlmProvider::DeepSeek => {
                let llm = DeepSeekLlm::from_env(&config.model)?;
                let func =
                    LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt);
                func.run($input).await.map_err(Into::into)
            }
        };
        result
    }};
}

/// Macro to run an LlmWorker with any provider.
/// Use this for agents that are allowed to call tools.
#[macro_export]
macro_rules! run_llm_worker {
    ($config:expr, $output_type:ty, $system_prompt:expr, $input:expr, $($tool:expr),* $(,)?) => {{
        use $crate::models::LlmProvider;
        use radkit::agent::LlmWorker;
        use radkit::models::providers::{
            AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
        };

        let config = $config;
        let result: anyhow::Result<$output_type> = match config.provider {
            LlmProvider::Anthropic => {
                let llm = AnthropicLlm::from_env(&config.model)?;
                let worker = LlmWorker::<$output_type>::builder(llm)
                    .with_system_instructions($system_prompt)
                    $(.with_tool($tool))*
                    .build();
                worker.run($input).await.map_err(Into::into)
            }
            LlmProvider::OpenAI => {
                let mut llm = OpenAILlm::from_env(&config.model)?;
                if let Some(base_url) = &config.base_url {
                    llm = llm.with_base_url(base_url);
                }
                let worker = LlmWorker::<$output_type>::builder(llm)
                    .with_system_instructions($system_prompt)
                    $(.with_tool($tool))*
                    .build();
                worker.run($input).await.map_err(Into::into)
            }
            LlmProvider::Gemini => {
                let llm = GeminiLlm::from_env(&config.model)?;
                let worker = LlmWorker::<$output_type>::builder(llm)
                    .with_system_instructions($system_prompt)
                    $(.with_tool($tool))*
                    .build();
                worker.run($input).await.map_err(Into::into)
            }
            LlmProvider::OpenRouter => {
                let llm = OpenRouterLlm::from_env(&config.model)?;
                let worker = LlmWorker::<$output_type>::builder(llm)
                    .with_system_instructions($system_prompt)
                    $(.with_tool($tool))*
                    .build();
                worker.run($input).await.map_err(Into::into)
            }
            LlmProvider::Grok => {
                let llm = GrokLlm::from_env(&config.model)?;
                let worker = LlmWorker::<$output_type>::builder(llm)
                    .with_system_instructions($system_prompt)
                    $(.with_tool($tool))*
                    .build();
                worker.run($input).await.map_err(Into::into)
            }
            LlmProvider::DeepSeek => {
                let llm = DeepSeekLlm::from_env(&config.model)?;
                let worker = LlmWorker::<$output_type>::builder(llm)
                    .with_system_instructions($system_prompt)
                    $(.with_tool($tool))*
                    .build();
                worker.run($input).await.map_err(Into::into)
            }
        };
        result
    }};
}

pub use run_llm_function;
pub use run_llm_worker;

/// One LLM call: the agent's system prompt plus the rendered task prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    /// Attach the web search and scrape tools to this call
    pub use_tools: bool,
}

/// Anything that can answer a [`CompletionRequest`]
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String>;
}

/// Structured answer every task asks the model for
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct TaskAnswer {
    /// The complete final answer for the task, in Markdown
    pub content: String,
}

/// Production client backed by radkit providers
#[derive(Debug, Clone)]
pub struct RadkitClient {
    config: ModelConfig,
}

impl RadkitClient {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

#[async_trait]
impl LlmClient for RadkitClient {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let system = request.system.as_str();
        let prompt = request.prompt.clone();

        tracing::debug!(
            provider = self.config.provider.id(),
            model = %self.config.model,
            tools = request.use_tools,
            "Sending completion request"
        );

        let answer = if request.use_tools {
            run_llm_worker!(
                &self.config,
                TaskAnswer,
                system,
                prompt,
                agent_tools::search_web,
                agent_tools::scrape_website,
            )?
        } else {
            run_llm_function!(&self.config, TaskAnswer, system, prompt)?
        };

        Ok(answer.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_answer_deserializes() {
        let answer: TaskAnswer =
            serde_json::from_str(r##"{"content":"# Strategy\n\nGo wide."}"##).unwrap();
        assert!(answer.content.starts_with("# Strategy"));
    }

    #[test]
    fn test_radkit_client_keeps_config() {
        let client = RadkitClient::new(ModelConfig::new("gpt-4o-mini"));
        assert_eq!(client.config().model, "gpt-4o-mini");
    }
}
