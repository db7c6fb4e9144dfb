//! CLI module - command-line interface
//!
//! Contains the REPL, command parsing and the task runner shared by both
//! front-ends.

pub mod commands;
pub mod repl;
pub mod runner;
pub mod sample_tasks;

pub use repl::Repl;
pub use runner::{run_task, Overrides, TaskOutcome, EXIT_CONFIG_ERROR};
pub use sample_tasks::{format_sample_tasks, sample_task, SAMPLE_TASKS};
