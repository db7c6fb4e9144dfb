//! Shared types used across bedrock-browser modules
//!
//! Contains message structures, tool definitions, step events and run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{ConfigError, ErrorKind};
use crate::core::run_config::RunConfig;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A tool call made by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Get a string argument by key
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Get a boolean argument by key
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.arguments.get(key).and_then(|v| v.as_bool())
    }

    /// Get an unsigned integer argument by key
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }

    /// One-line summary used in step descriptions
    pub fn summary(&self) -> String {
        let args = match &self.arguments {
            serde_json::Value::Object(map) if !map.is_empty() => map
                .iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(s) => format!("{}={}", k, s),
                    other => format!("{}={}", k, other),
                })
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        };
        if args.is_empty() {
            self.name.clone()
        } else {
            format!("{}({})", self.name, args)
        }
    }
}

/// Definition of a tool that can be called by the LLM
///
/// Serializes in the Anthropic Messages tool shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the input
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Result of executing a tool
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Name of the tool that was executed
    pub tool_name: String,
    /// Whether the execution was successful
    pub success: bool,
    /// Output from the tool
    pub output: String,
    /// Optional structured data
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: output.into(),
            data: None,
        }
    }

    /// Create a successful result with structured data
    pub fn success_with_data(
        tool_name: impl Into<String>,
        output: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: output.into(),
            data: Some(data),
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: error.into(),
            data: None,
        }
    }
}

/// Category of tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Web browsing and automation
    Browser,
    /// Loop control (finishing the task)
    Control,
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolCategory::Browser => write!(f, "browser"),
            ToolCategory::Control => write!(f, "control"),
        }
    }
}

/// A task to run, paired with its validated configuration
#[derive(Debug, Clone)]
pub struct TaskRequest {
    instruction: String,
    config: RunConfig,
}

impl TaskRequest {
    /// Create a request; the instruction must contain non-whitespace text
    pub fn new(
        instruction: impl Into<String>,
        config: RunConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let instruction = instruction.into();
        if instruction.trim().is_empty() {
            return Err(ConfigError::EmptyTask);
        }
        Ok(Self {
            instruction: instruction.trim().to_string(),
            config,
        })
    }

    /// The natural-language task
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// The validated run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }
}

/// One executed agent action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// 1-based, strictly increasing within a run
    pub step_index: u32,
    /// Tool that was executed
    pub action: String,
    /// Human-readable description of the action
    pub description: String,
    /// Whether the action succeeded
    pub success: bool,
    /// When the action finished
    pub timestamp: DateTime<Utc>,
}

/// Failure details of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Terminal outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    Success {
        transcript: Vec<StepEvent>,
        final_answer: String,
        /// The answer was synthesized after the step ceiling was reached
        truncated: bool,
    },
    Failure(RunFailure),
}

impl RunResult {
    /// Build a failure result
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        RunResult::Failure(RunFailure {
            kind,
            message: message.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Success { .. })
    }

    /// Kind of the failure, if any
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            RunResult::Success { .. } => None,
            RunResult::Failure(f) => Some(f.kind),
        }
    }
}
