//! # Crew Runtime
//!
//! Agents, tasks and the sequential runner that ties them together.
//!
//! ## Flow
//!
//! ```text
//! Crew::kickoff(inputs)
//!   └── for each Task (in order)
//!         └── Agent::execute (one LLM call, optional web tools)
//! ```

pub mod agent;
pub mod events;
pub mod progress;
pub mod runner;
pub mod task;

pub use agent::Agent;
pub use events::{CrewEvent, CrewEventKind};
pub use progress::{RunProgress, RunStage};
pub use runner::{Crew, CrewOutput, CrewSpec};
pub use task::{build_prompt, render_template, Inputs, Task, TaskOutput};
