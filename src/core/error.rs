//! Error types for bedrock-browser
//!
//! `ConfigError` covers everything the resolver rejects before a session
//! starts. `BrowserAgentError` covers runtime failures, and `ErrorKind` is the
//! failure taxonomy a finished run reports.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A run parameter that can fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    Model,
    Region,
    Temperature,
    MaxSteps,
}

impl std::fmt::Display for ConfigField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigField::Model => write!(f, "model"),
            ConfigField::Region => write!(f, "region"),
            ConfigField::Temperature => write!(f, "temperature"),
            ConfigField::MaxSteps => write!(f, "max_steps"),
        }
    }
}

/// Validation failures raised before any network or browser resource exists
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Model id is not one of the recognized Claude models
    #[error("Unknown model '{0}'. Run `bedrock-browser models` to list supported models")]
    UnknownModel(String),

    /// Region is not one of the recognized Bedrock regions
    #[error("Unknown region '{0}'. Supported regions: us-east-1, us-west-2, eu-west-1, ap-southeast-1")]
    UnknownRegion(String),

    /// A numeric parameter is outside its allowed range
    #[error("{field} = {value} is out of range (allowed {range})")]
    OutOfRange {
        field: ConfigField,
        value: String,
        range: &'static str,
    },

    /// A numeric parameter could not be parsed
    #[error("{field} = '{value}' is not a valid number")]
    InvalidNumber { field: ConfigField, value: String },

    /// No usable AWS credentials were found
    #[error("AWS credentials not found: {0}")]
    MissingCredentials(String),

    /// The task instruction is empty
    #[error("Task instruction must not be empty")]
    EmptyTask,
}

/// Discriminant of a `ConfigError`, for callers that branch on the kind only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigErrorKind {
    UnknownModel,
    UnknownRegion,
    OutOfRange,
    InvalidNumber,
    MissingCredentials,
    EmptyTask,
}

impl ConfigErrorKind {
    /// Stable machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigErrorKind::UnknownModel => "unknown_model",
            ConfigErrorKind::UnknownRegion => "unknown_region",
            ConfigErrorKind::OutOfRange => "out_of_range",
            ConfigErrorKind::InvalidNumber => "invalid_number",
            ConfigErrorKind::MissingCredentials => "missing_credentials",
            ConfigErrorKind::EmptyTask => "empty_task",
        }
    }
}

impl ConfigError {
    /// Kind of this error
    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            ConfigError::UnknownModel(_) => ConfigErrorKind::UnknownModel,
            ConfigError::UnknownRegion(_) => ConfigErrorKind::UnknownRegion,
            ConfigError::OutOfRange { .. } => ConfigErrorKind::OutOfRange,
            ConfigError::InvalidNumber { .. } => ConfigErrorKind::InvalidNumber,
            ConfigError::MissingCredentials(_) => ConfigErrorKind::MissingCredentials,
            ConfigError::EmptyTask => ConfigErrorKind::EmptyTask,
        }
    }

    /// The offending field, when the error is tied to one
    pub fn field(&self) -> Option<ConfigField> {
        match self {
            ConfigError::UnknownModel(_) => Some(ConfigField::Model),
            ConfigError::UnknownRegion(_) => Some(ConfigField::Region),
            ConfigError::OutOfRange { field, .. } | ConfigError::InvalidNumber { field, .. } => {
                Some(*field)
            }
            ConfigError::MissingCredentials(_) | ConfigError::EmptyTask => None,
        }
    }
}

/// Main error type for runtime operations
#[derive(Error, Debug)]
pub enum BrowserAgentError {
    /// Bedrock rejected the credentials or the request signature
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Credentials are valid but lack access to the model
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The model is not offered (or not ready) in the selected region
    #[error("Model '{model}' is not available in {region}: {message}")]
    ModelUnavailable {
        model: String,
        region: String,
        message: String,
    },

    /// Any other Bedrock API error
    #[error("Bedrock error: {0}")]
    Bedrock(String),

    /// Browser automation errors
    #[error("Browser error: {0}")]
    Browser(String),

    /// agent-browser not installed
    #[error("agent-browser not found. Install with: npm install -g agent-browser && agent-browser install")]
    AgentBrowserNotFound,

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Config file errors
    #[error("Configuration file error: {0}")]
    ConfigFile(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type
pub type Result<T> = std::result::Result<T, BrowserAgentError>;

impl BrowserAgentError {
    /// Create a browser error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create a Bedrock error
    pub fn bedrock(msg: impl Into<String>) -> Self {
        Self::Bedrock(msg.into())
    }

    /// Create a config file error
    pub fn config_file(msg: impl Into<String>) -> Self {
        Self::ConfigFile(msg.into())
    }
}

/// Failure taxonomy reported by a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AuthError,
    AccessDenied,
    ModelUnavailable,
    StepLimitExceeded,
    AgentError,
    MissingDependency,
    Cancelled,
}

impl ErrorKind {
    /// Stable machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthError => "auth_error",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::ModelUnavailable => "model_unavailable",
            ErrorKind::StepLimitExceeded => "step_limit_exceeded",
            ErrorKind::AgentError => "agent_error",
            ErrorKind::MissingDependency => "missing_dependency",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&BrowserAgentError> for ErrorKind {
    fn from(err: &BrowserAgentError) -> Self {
        match err {
            BrowserAgentError::Auth(_) => ErrorKind::AuthError,
            BrowserAgentError::AccessDenied(_) => ErrorKind::AccessDenied,
            BrowserAgentError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            BrowserAgentError::AgentBrowserNotFound => ErrorKind::MissingDependency,
            BrowserAgentError::Config(ConfigError::MissingCredentials(_)) => ErrorKind::AuthError,
            _ => ErrorKind::AgentError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_kind_and_field() {
        let err = ConfigError::OutOfRange {
            field: ConfigField::Temperature,
            value: "1.5".to_string(),
            range: "0.0..=1.0",
        };
        assert_eq!(err.kind(), ConfigErrorKind::OutOfRange);
        assert_eq!(err.field(), Some(ConfigField::Temperature));
        assert!(err.to_string().contains("temperature"));

        assert_eq!(ConfigError::EmptyTask.field(), None);
    }

    #[test]
    fn test_error_kind_classification() {
        assert_eq!(
            ErrorKind::from(&BrowserAgentError::Auth("bad token".into())),
            ErrorKind::AuthError
        );
        assert_eq!(
            ErrorKind::from(&BrowserAgentError::AgentBrowserNotFound),
            ErrorKind::MissingDependency
        );
        assert_eq!(
            ErrorKind::from(&BrowserAgentError::browser("navigation timeout")),
            ErrorKind::AgentError
        );
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::StepLimitExceeded).unwrap();
        assert_eq!(json, "\"step_limit_exceeded\"");
    }
}
