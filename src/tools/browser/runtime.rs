//! Browser runtime abstraction
//!
//! The agent loop talks to the browser only through this trait so a session
//! can be driven by agent-browser in production and by doubles in tests.

use async_trait::async_trait;

use crate::core::{Result, ToolCall, ToolResult};

/// A browser session that executes tool calls
#[async_trait]
pub trait BrowserRuntime: Send + Sync {
    /// Execute a browser tool call
    ///
    /// Action-level failures (bad ref, navigation error) may be returned
    /// either as `Err` or as a failed [`ToolResult`]; the agent records both
    /// as observations. `BrowserAgentError::AgentBrowserNotFound` ends the run.
    async fn execute(&self, tool_call: &ToolCall) -> Result<ToolResult>;

    /// Release the browser session
    async fn close(&self) -> Result<()>;
}
