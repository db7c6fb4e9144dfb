//! Core module - shared infrastructure
//!
//! Foundational types, configuration, run-parameter resolution and error
//! handling used throughout the crate.

pub mod config;
pub mod credentials;
pub mod error;
pub mod run_config;
pub mod types;

pub use config::Config;
pub use credentials::{AwsSettings, AwsSource, Credentials};
pub use error::{BrowserAgentError, ConfigError, ConfigErrorKind, ConfigField, ErrorKind, Result};
pub use run_config::{resolve, ClaudeModel, ModelId, RawInputs, Region, RunConfig};
pub use types::*;
