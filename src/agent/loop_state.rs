//! Agent loop state management
//!
//! Tracks steps taken against the step ceiling and the observations that are
//! fed back to the model on every turn.

use serde::{Deserialize, Serialize};

use crate::core::ToolResult;

/// State of the agent reasoning loop
#[derive(Debug, Clone)]
pub struct AgentLoopState {
    /// Model turns taken so far
    pub turn: usize,
    /// Actions executed so far
    pub steps: u32,
    /// Maximum allowed actions
    pub max_steps: u32,
    /// Observations collected from tool executions
    pub observations: Vec<Observation>,
    /// Final answer if the agent has completed reasoning
    pub final_answer: Option<String>,
    /// Observation outputs longer than this are cut in prompts
    max_observation_chars: usize,
}

impl AgentLoopState {
    /// Create a new loop state with the given step ceiling
    pub fn new(max_steps: u32) -> Self {
        Self {
            turn: 0,
            steps: 0,
            max_steps,
            observations: Vec::new(),
            final_answer: None,
            max_observation_chars: 6000,
        }
    }

    pub fn with_max_observation_chars(mut self, chars: usize) -> Self {
        self.max_observation_chars = chars;
        self
    }

    /// Check if the loop should continue
    pub fn should_continue(&self) -> bool {
        self.steps < self.max_steps && self.final_answer.is_none()
    }

    /// Actions left before the ceiling
    pub fn remaining_steps(&self) -> u32 {
        self.max_steps.saturating_sub(self.steps)
    }

    /// Whether the ceiling was hit without an answer
    pub fn exhausted(&self) -> bool {
        self.steps >= self.max_steps && self.final_answer.is_none()
    }

    /// Record one executed action and return its 1-based step index
    pub fn record(&mut self, observation: Observation) -> u32 {
        self.steps += 1;
        self.observations.push(observation);
        self.steps
    }

    /// Increment the turn counter
    pub fn next_turn(&mut self) {
        self.turn += 1;
    }

    /// Format observations for inclusion in the next prompt
    pub fn format_observations(&self) -> String {
        if self.observations.is_empty() {
            return String::new();
        }

        let mut output = String::from("\n\n## Tool Observations:\n");
        for (i, obs) in self.observations.iter().enumerate() {
            let status = if obs.success { "ok" } else { "failed" };
            output.push_str(&format!(
                "\n### Step {} ({}, {})\n{}\n",
                i + 1,
                obs.tool_name,
                status,
                truncate_chars(&obs.output, self.max_observation_chars)
            ));
        }
        output
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}\n... [truncated]", &s[..idx]),
        None => s.to_string(),
    }
}

/// An observation from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Name of the tool that produced this observation
    pub tool_name: String,
    /// Whether the tool execution was successful
    pub success: bool,
    /// Human-readable output from the tool
    pub output: String,
    /// Optional structured data from the tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Observation {
    /// Create a successful observation
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: output.into(),
            data: None,
        }
    }

    /// Create an error observation
    pub fn error(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: error.into(),
            data: None,
        }
    }
}

impl From<ToolResult> for Observation {
    fn from(result: ToolResult) -> Self {
        Self {
            tool_name: result.tool_name,
            success: result.success,
            output: result.output,
            data: result.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_state_new() {
        let state = AgentLoopState::new(10);
        assert_eq!(state.steps, 0);
        assert_eq!(state.max_steps, 10);
        assert!(state.observations.is_empty());
        assert!(state.final_answer.is_none());
    }

    #[test]
    fn test_step_ceiling() {
        let mut state = AgentLoopState::new(2);
        assert!(state.should_continue());

        assert_eq!(state.record(Observation::success("browser_url", "ok")), 1);
        assert!(state.should_continue());
        assert_eq!(state.remaining_steps(), 1);

        assert_eq!(state.record(Observation::error("browser_click", "no such ref")), 2);
        assert!(!state.should_continue());
        assert!(state.exhausted());
    }

    #[test]
    fn test_final_answer_stops_loop() {
        let mut state = AgentLoopState::new(5);
        state.final_answer = Some("done".to_string());
        assert!(!state.should_continue());
        assert!(!state.exhausted());
    }

    #[test]
    fn test_format_observations() {
        let mut state = AgentLoopState::new(10);
        state.record(Observation::success("browser_url", "Navigated to example.com"));
        state.record(Observation::error("browser_click", "Element @e9 not found"));

        let formatted = state.format_observations();
        assert!(formatted.contains("### Step 1 (browser_url, ok)"));
        assert!(formatted.contains("### Step 2 (browser_click, failed)"));
    }

    #[test]
    fn test_long_observations_are_truncated() {
        let mut state = AgentLoopState::new(3).with_max_observation_chars(5);
        state.record(Observation::success("browser_get_text", "héllo world"));

        let formatted = state.format_observations();
        assert!(formatted.contains("héllo\n... [truncated]"));
        assert!(!formatted.contains("world"));
    }
}
