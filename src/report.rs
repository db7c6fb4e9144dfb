//! Result/error reporting
//!
//! Turns a finished run (or a rejected configuration) into a
//! [`DisplayPayload`] that any front-end can render. Presentation is pure:
//! the same input always yields a byte-identical payload.

use serde::Serialize;

use crate::core::{ConfigError, ConfigErrorKind, ErrorKind, RunConfig, RunResult, StepEvent};

/// Outcome category of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Success,
    Failure,
    ConfigError,
}

/// Error section of a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDisplay {
    /// Machine-readable kind (`auth_error`, `out_of_range`, ...)
    pub kind: String,
    pub message: String,
    /// What the user can do about it
    pub hint: String,
}

/// Front-end-agnostic rendering of a run outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPayload {
    pub status: DisplayStatus,
    pub headline: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<String>,
    pub transcript: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDisplay>,
}

impl DisplayPayload {
    /// Whether the payload reports a successful run
    pub fn is_success(&self) -> bool {
        self.status == DisplayStatus::Success
    }

    /// Pretty-printed JSON rendering
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain terminal rendering
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.headline);
        out.push('\n');

        if !self.config.is_empty() {
            out.push('\n');
            for line in &self.config {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }

        if !self.transcript.is_empty() {
            out.push_str("\nSteps:\n");
            for line in &self.transcript {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }

        if let Some(answer) = &self.final_answer {
            out.push_str("\nAnswer:\n");
            out.push_str(answer);
            out.push('\n');
        }

        if let Some(error) = &self.error {
            out.push_str(&format!("\nError ({}): {}\n", error.kind, error.message));
            out.push_str(&format!("Hint: {}\n", error.hint));
        }

        out
    }
}

/// One transcript line for a step
pub fn format_step(event: &StepEvent) -> String {
    let status = if event.success { "ok" } else { "failed" };
    format!(
        "{:>2}. [{}] {} ({})",
        event.step_index,
        status,
        event.description,
        event.timestamp.format("%H:%M:%S")
    )
}

/// Remediation hint for a run failure
pub fn hint_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::AuthError => {
            "Check AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY in your .env file, or run `aws configure`."
        }
        ErrorKind::AccessDenied => {
            "Enable access to this model in the Amazon Bedrock console (Model access) for the selected region."
        }
        ErrorKind::ModelUnavailable => {
            "This model is not offered in the selected region. Try a different region or model (`bedrock-browser models`)."
        }
        ErrorKind::StepLimitExceeded => {
            "The agent ran out of steps. Increase max steps (up to 20) or simplify the task."
        }
        ErrorKind::MissingDependency => {
            "Install agent-browser: npm install -g agent-browser && agent-browser install"
        }
        ErrorKind::AgentError => {
            "Check that the browser runtime and network are working, then rerun with --debug for details."
        }
        ErrorKind::Cancelled => "The run was stopped before it finished. Rerun the task when ready.",
    }
}

fn headline_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::AuthError => "Authentication with AWS failed",
        ErrorKind::AccessDenied => "Access to the model was denied",
        ErrorKind::ModelUnavailable => "The model is unavailable in this region",
        ErrorKind::StepLimitExceeded => "The step limit was reached without an answer",
        ErrorKind::MissingDependency => "agent-browser is not installed",
        ErrorKind::AgentError => "The agent failed",
        ErrorKind::Cancelled => "The run was cancelled",
    }
}

fn config_hint(err: &ConfigError) -> String {
    match err {
        ConfigError::UnknownModel(_) => {
            "Choose one of the models listed by `bedrock-browser models`.".to_string()
        }
        ConfigError::UnknownRegion(_) => {
            "Choose one of the regions listed by `bedrock-browser regions`.".to_string()
        }
        ConfigError::OutOfRange { field, range, .. } => {
            format!("Set {} to a value within {}.", field, range)
        }
        ConfigError::InvalidNumber { field, .. } => format!("Set {} to a number.", field),
        ConfigError::MissingCredentials(_) => hint_for(ErrorKind::AuthError).to_string(),
        ConfigError::EmptyTask => "Describe what the agent should do.".to_string(),
    }
}

/// Present a finished run
pub fn present(result: &RunResult) -> DisplayPayload {
    match result {
        RunResult::Success {
            transcript,
            final_answer,
            truncated,
        } => {
            let steps = transcript.len();
            let plural = if steps == 1 { "" } else { "s" };
            let headline = if *truncated {
                format!(
                    "Task finished after {} step{} (step limit reached; answer synthesized from partial results)",
                    steps, plural
                )
            } else {
                format!("Task completed in {} step{}", steps, plural)
            };
            DisplayPayload {
                status: DisplayStatus::Success,
                headline,
                config: Vec::new(),
                transcript: transcript.iter().map(format_step).collect(),
                final_answer: Some(final_answer.clone()),
                error: None,
            }
        }
        RunResult::Failure(failure) => DisplayPayload {
            status: DisplayStatus::Failure,
            headline: headline_for(failure.kind).to_string(),
            config: Vec::new(),
            transcript: Vec::new(),
            final_answer: None,
            error: Some(ErrorDisplay {
                kind: failure.kind.as_str().to_string(),
                message: failure.message.clone(),
                hint: hint_for(failure.kind).to_string(),
            }),
        },
    }
}

/// Present a finished run together with the configuration it ran with
pub fn present_with_config(result: &RunResult, config: &RunConfig) -> DisplayPayload {
    DisplayPayload {
        config: config.summary_lines(),
        ..present(result)
    }
}

/// Present a configuration rejected before any session started
pub fn present_config_error(err: &ConfigError) -> DisplayPayload {
    let kind: ConfigErrorKind = err.kind();
    DisplayPayload {
        status: DisplayStatus::ConfigError,
        headline: "Invalid configuration".to_string(),
        config: Vec::new(),
        transcript: Vec::new(),
        final_answer: None,
        error: Some(ErrorDisplay {
            kind: kind.as_str().to_string(),
            message: err.to_string(),
            hint: config_hint(err),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConfigField;
    use chrono::TimeZone;

    fn step(step_index: u32, success: bool) -> StepEvent {
        StepEvent {
            step_index,
            action: "browser_url".to_string(),
            description: "browser_url(url=https://example.com)".to_string(),
            success,
            timestamp: chrono::Utc
                .with_ymd_and_hms(2024, 11, 5, 9, 30, step_index)
                .unwrap(),
        }
    }

    #[test]
    fn test_success_payload() {
        let result = RunResult::Success {
            transcript: vec![step(1, true), step(2, false)],
            final_answer: "Example Domain".to_string(),
            truncated: false,
        };
        let payload = present(&result);
        assert!(payload.is_success());
        assert_eq!(payload.headline, "Task completed in 2 steps");
        assert_eq!(
            payload.transcript[0],
            " 1. [ok] browser_url(url=https://example.com) (09:30:01)"
        );
        assert!(payload.transcript[1].contains("[failed]"));
        assert_eq!(payload.final_answer.as_deref(), Some("Example Domain"));
        assert!(payload.error.is_none());
    }

    #[test]
    fn test_truncated_success_says_so() {
        let result = RunResult::Success {
            transcript: vec![step(1, true)],
            final_answer: "partial".to_string(),
            truncated: true,
        };
        let text = present(&result).render_text();
        assert!(text.contains("step limit reached"));
        assert!(text.contains("Answer:\npartial"));
    }

    #[test]
    fn test_every_failure_kind_has_hint() {
        for kind in [
            ErrorKind::AuthError,
            ErrorKind::AccessDenied,
            ErrorKind::ModelUnavailable,
            ErrorKind::StepLimitExceeded,
            ErrorKind::AgentError,
            ErrorKind::MissingDependency,
            ErrorKind::Cancelled,
        ] {
            let payload = present(&RunResult::failure(kind, "boom"));
            let error = payload.error.unwrap();
            assert_eq!(error.kind, kind.as_str());
            assert!(!error.hint.is_empty());
            assert!(payload.final_answer.is_none());
        }
    }

    #[test]
    fn test_auth_hint_mentions_credentials() {
        let payload = present(&RunResult::failure(ErrorKind::AuthError, "invalid token"));
        let hint = payload.error.unwrap().hint;
        assert!(hint.contains(".env"));
        assert!(hint.contains("aws configure"));
    }

    #[test]
    fn test_present_is_idempotent() {
        let result = RunResult::Success {
            transcript: vec![step(1, true), step(2, true)],
            final_answer: "done".to_string(),
            truncated: false,
        };
        let first = present(&result);
        let second = present(&result);
        assert_eq!(first, second);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        assert_eq!(first.render_text(), second.render_text());
    }

    #[test]
    fn test_config_error_payload_names_field() {
        let err = ConfigError::OutOfRange {
            field: ConfigField::MaxSteps,
            value: "25".to_string(),
            range: "1..=20",
        };
        let payload = present_config_error(&err);
        assert_eq!(payload.status, DisplayStatus::ConfigError);
        let error = payload.error.unwrap();
        assert_eq!(error.kind, "out_of_range");
        assert!(error.message.contains("max_steps"));
        assert_eq!(error.hint, "Set max_steps to a value within 1..=20.");
    }

    #[test]
    fn test_json_shape() {
        let json = present(&RunResult::failure(ErrorKind::Cancelled, "stopped"))
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["error"]["kind"], "cancelled");
        assert!(value.get("final_answer").is_none());
        assert!(value.get("config").is_none());
    }
}
