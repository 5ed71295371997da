//! # Pitchcraft Core
//!
//! The "Brain" of Pitchcraft - the crew runtime, the built-in marketing
//! crew, the web tools its agents use, and persisted settings and history.
//!
//! ## Architecture
//!
//! - `crew/` - Agents, tasks and the sequential runner
//! - `marketing/` - The marketing strategy crew and its request
//! - `models` - Centralized LLM provider configuration
//! - `llm` - The LLM seam used by agents
//! - `tools/` - Web search and scraping
//! - `config` / `history` - `.pitchcraft/` settings and run database
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pitchcraft_core::llm::RadkitClient;
//! use pitchcraft_core::marketing::{generate_strategy, marketing_crew, StrategyRequest};
//!
//! let client = RadkitClient::new(ModelConfig::default());
//! let request = StrategyRequest::new("crewai.com", "Launch of a new agent platform");
//! let output = generate_strategy(&client, marketing_crew(), &request, None).await?;
//! println!("{}", output.final_output());
//! ```

pub mod config;
pub mod crew;
pub mod error;
pub mod history;
pub mod llm;
pub mod marketing;
pub mod models;
pub mod tools;

pub use error::{CrewError, CrewResult};
