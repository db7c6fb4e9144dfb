//! bedrock-browser - browser automation agent on Amazon Bedrock
//!
//! Validates run parameters, drives an agent-browser session with a Claude
//! model on Bedrock for a bounded number of steps, and reports the outcome.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, run-parameter resolution and errors
//! - **LLM**: Provider abstraction with a SigV4-signed Bedrock implementation
//! - **Tools**: Browser runtime (agent-browser) and the tool registry
//! - **Agent**: The session driver and its loop state
//! - **Report**: Display payloads for finished runs
//! - **CLI**: One-shot runner and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use bedrock_browser::agent::{AgentSession, StepSink};
//! use bedrock_browser::core::{resolve, Config, RawInputs, TaskRequest};
//! use bedrock_browser::report::present;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load();
//!     let run = resolve(&RawInputs::gather(&config).await?)?;
//!     let task = TaskRequest::new("Go to example.com and report the page title", run.clone())?;
//!
//!     let (sink, mut steps) = StepSink::channel();
//!     let session = AgentSession::for_task(&config, &run);
//!     let handle = tokio::spawn(session.run(task, sink, CancellationToken::new()));
//!
//!     while let Some(step) = steps.recv().await {
//!         println!("{}: {}", step.step_index, step.description);
//!     }
//!     println!("{}", present(&handle.await?).render_text());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod report;
pub mod tools;

// Re-export commonly used items
pub use agent::{AgentSession, StepSink};
pub use cli::Repl;
pub use core::{resolve, BrowserAgentError, Config, ConfigError, Result, RunConfig, RunResult};
pub use report::{present, DisplayPayload};
