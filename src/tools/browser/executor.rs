//! Browser executor - wraps agent-browser CLI
//!
//! Every run gets its own agent-browser session so concurrent or successive
//! runs never share page state.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::core::config::BrowserConfig;
use crate::core::{BrowserAgentError, Result, ToolCall, ToolResult};
use crate::tools::browser::runtime::BrowserRuntime;
use crate::tools::browser::snapshot::Snapshot;

/// Interactive elements listed per snapshot observation
const LISTING_LIMIT: usize = 60;

/// Executor for browser automation via agent-browser CLI
#[derive(Debug, Clone)]
pub struct BrowserExecutor {
    /// agent-browser executable
    binary: String,
    /// Session name for isolation
    session_name: String,
    /// Whether to run in headed mode
    headed: bool,
    /// Per-command timeout
    timeout: Duration,
}

impl BrowserExecutor {
    /// Create an executor bound to an explicit session name
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            binary: "agent-browser".to_string(),
            session_name: session_name.into(),
            headed: false,
            timeout: Duration::from_millis(30_000),
        }
    }

    /// Create an executor with a fresh `<prefix>-<uuid>` session
    pub fn from_config(config: &BrowserConfig) -> Self {
        let session = format!("{}-{}", config.session_prefix, uuid::Uuid::new_v4());
        Self::new(session)
            .with_binary(&config.binary)
            .with_headed(config.headed)
            .with_timeout(Duration::from_millis(config.timeout_ms))
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_headed(mut self, headed: bool) -> Self {
        self.headed = headed;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Check if the agent-browser binary can be launched
    pub async fn is_available(binary: &str) -> bool {
        Command::new(binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Run an agent-browser command
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["--session", &self.session_name]);

        if self.headed {
            cmd.arg("--headed");
        }

        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(session = %self.session_name, ?args, "agent-browser");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                BrowserAgentError::browser(format!(
                    "agent-browser {} timed out after {}ms",
                    args.first().copied().unwrap_or_default(),
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BrowserAgentError::AgentBrowserNotFound
                } else {
                    BrowserAgentError::browser(format!("Failed to run agent-browser: {}", e))
                }
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(BrowserAgentError::browser(format!(
                "agent-browser {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )))
        }
    }

    /// Run a command and return JSON output
    async fn run_json_command(&self, args: &[&str]) -> Result<String> {
        let mut full_args: Vec<&str> = args.to_vec();
        full_args.push("--json");
        self.run_command(&full_args).await
    }

    /// Interactive snapshot rendered as a compact listing
    async fn snapshot_listing(&self) -> Result<(String, Option<Snapshot>)> {
        let output = self.run_json_command(&["snapshot", "-i"]).await?;
        match Snapshot::parse(&output) {
            Some(snapshot) => Ok((snapshot.compact_listing(LISTING_LIMIT), Some(snapshot))),
            None => Ok((output.trim().to_string(), None)),
        }
    }

    /// Navigate to a URL
    pub async fn open(&self, url: &str, wait_for_load: bool) -> Result<ToolResult> {
        if url.trim().is_empty() {
            return Ok(ToolResult::failure("browser_url", "Missing required argument: url"));
        }

        self.run_command(&["open", url]).await?;

        if wait_for_load {
            // networkidle never settles on some pages; the snapshot still works
            if let Err(e) = self.run_command(&["wait", "--load", "networkidle"]).await {
                debug!(error = %e, "network idle wait failed");
            }
        }

        let title = self.get_title().await.unwrap_or_default();
        let (listing, snapshot) = self.snapshot_listing().await?;
        let output = format!(
            "Navigated to {} (title: \"{}\"). Interactive elements:\n{}",
            url, title, listing
        );

        Ok(with_snapshot("browser_url", output, snapshot))
    }

    /// Click an element by ref
    pub async fn click(&self, ref_id: &str) -> Result<ToolResult> {
        let target = normalize_ref(ref_id);
        self.run_command(&["click", &target]).await?;

        let (listing, snapshot) = self.snapshot_listing().await?;
        Ok(with_snapshot(
            "browser_click",
            format!("Clicked {}. Updated page:\n{}", target, listing),
            snapshot,
        ))
    }

    /// Fill an input field
    pub async fn fill(&self, ref_id: &str, text: &str) -> Result<ToolResult> {
        let target = normalize_ref(ref_id);
        self.run_command(&["fill", &target, text]).await?;

        Ok(ToolResult::success(
            "browser_fill",
            format!("Filled {} with '{}'", target, text),
        ))
    }

    /// Press a key
    pub async fn press(&self, key: &str) -> Result<ToolResult> {
        self.run_command(&["press", key]).await?;
        Ok(ToolResult::success("browser_press", format!("Pressed {}", key)))
    }

    /// Scroll the page
    pub async fn scroll(&self, direction: &str, pixels: Option<u32>) -> Result<ToolResult> {
        let mut args = vec!["scroll", direction];
        let px_str;

        if let Some(px) = pixels {
            px_str = px.to_string();
            args.push(&px_str);
        }

        self.run_command(&args).await?;
        Ok(ToolResult::success(
            "browser_scroll",
            format!("Scrolled {}", direction),
        ))
    }

    /// Get text from an element, or from the whole page body
    pub async fn get_text(&self, ref_id: Option<&str>) -> Result<ToolResult> {
        let target = ref_id.map(normalize_ref).unwrap_or_else(|| "body".to_string());
        let output = self.run_command(&["get", "text", &target]).await?;

        Ok(ToolResult::success("browser_get_text", output.trim()))
    }

    /// Get page snapshot
    pub async fn snapshot(&self, interactive_only: bool) -> Result<ToolResult> {
        if interactive_only {
            let (listing, snapshot) = self.snapshot_listing().await?;
            let count = snapshot.as_ref().map(|s| s.count_elements()).unwrap_or(0);
            return Ok(with_snapshot(
                "browser_snapshot",
                format!("Page snapshot ({} elements):\n{}", count, listing),
                snapshot,
            ));
        }

        let output = self.run_json_command(&["snapshot"]).await?;
        match Snapshot::parse(&output) {
            Some(snapshot) => {
                let tree = snapshot
                    .data
                    .as_ref()
                    .map(|d| d.snapshot.clone())
                    .unwrap_or_default();
                Ok(with_snapshot(
                    "browser_snapshot",
                    format!("Page snapshot ({} elements):\n{}", snapshot.count_elements(), tree),
                    Some(snapshot),
                ))
            }
            None => Ok(ToolResult::success("browser_snapshot", output.trim())),
        }
    }

    /// Take a screenshot
    pub async fn screenshot(&self, path: Option<&str>, full_page: bool) -> Result<ToolResult> {
        let mut args = vec!["screenshot"];

        if let Some(p) = path {
            args.push(p);
        }

        if full_page {
            args.push("--full");
        }

        let output = self.run_command(&args).await?;

        let message = match path {
            Some(p) => format!("Screenshot saved to {}", p),
            None => format!("Screenshot captured ({} bytes of output)", output.len()),
        };

        Ok(ToolResult::success("browser_screenshot", message))
    }

    /// Get page title
    pub async fn get_title(&self) -> Result<String> {
        self.run_command(&["get", "title"])
            .await
            .map(|s| s.trim().to_string())
    }
}

#[async_trait]
impl BrowserRuntime for BrowserExecutor {
    async fn execute(&self, tool_call: &ToolCall) -> Result<ToolResult> {
        match tool_call.name.as_str() {
            "browser_url" => {
                let url = tool_call.get_string("url").unwrap_or_default();
                let wait = tool_call.get_bool("wait_for_load").unwrap_or(true);
                self.open(&url, wait).await
            }
            "browser_click" => match tool_call.get_string("ref") {
                Some(ref_id) => self.click(&ref_id).await,
                None => Ok(missing_argument(tool_call, "ref")),
            },
            "browser_fill" => match (tool_call.get_string("ref"), tool_call.get_string("text")) {
                (Some(ref_id), Some(text)) => self.fill(&ref_id, &text).await,
                (None, _) => Ok(missing_argument(tool_call, "ref")),
                (_, None) => Ok(missing_argument(tool_call, "text")),
            },
            "browser_press" => match tool_call.get_string("key") {
                Some(key) => self.press(&key).await,
                None => Ok(missing_argument(tool_call, "key")),
            },
            "browser_scroll" => {
                let direction = tool_call
                    .get_string("direction")
                    .unwrap_or_else(|| "down".to_string());
                self.scroll(&direction, tool_call.get_u32("pixels")).await
            }
            "browser_get_text" => {
                let ref_id = tool_call.get_string("ref");
                self.get_text(ref_id.as_deref()).await
            }
            "browser_snapshot" => {
                let interactive = tool_call.get_bool("interactive_only").unwrap_or(true);
                self.snapshot(interactive).await
            }
            "browser_screenshot" => {
                let path = tool_call.get_string("path");
                let full = tool_call.get_bool("full_page").unwrap_or(false);
                self.screenshot(path.as_deref(), full).await
            }
            _ => Ok(ToolResult::failure(
                &tool_call.name,
                format!("Unknown browser tool: {}", tool_call.name),
            )),
        }
    }

    async fn close(&self) -> Result<()> {
        self.run_command(&["close"]).await?;
        debug!(session = %self.session_name, "browser session closed");
        Ok(())
    }
}

/// Refs from snapshots are `e12`; agent-browser expects `@e12`
fn normalize_ref(ref_id: &str) -> String {
    let trimmed = ref_id.trim();
    if trimmed.starts_with('@') || !looks_like_ref(trimmed) {
        trimmed.to_string()
    } else {
        format!("@{}", trimmed)
    }
}

fn looks_like_ref(s: &str) -> bool {
    s.strip_prefix('e')
        .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

fn with_snapshot(tool: &str, output: String, snapshot: Option<Snapshot>) -> ToolResult {
    match snapshot.and_then(|s| serde_json::to_value(s).ok()) {
        Some(data) => ToolResult::success_with_data(tool, output, data),
        None => ToolResult::success(tool, output),
    }
}

fn missing_argument(tool_call: &ToolCall, arg: &str) -> ToolResult {
    ToolResult::failure(
        &tool_call.name,
        format!("Missing required argument: {}", arg),
    )
}
