//! Tool registry - manages and dispatches tool calls
//!
//! Holds the tool definitions offered to the model, in a stable order, and
//! routes browser calls to a [`BrowserRuntime`].

use std::collections::HashMap;

use crate::core::{Result, ToolCall, ToolCategory, ToolDefinition, ToolResult};
use crate::tools::browser::BrowserRuntime;

/// Name of the tool the model calls to finish a task
pub const DONE_TOOL: &str = "done";

/// Registry of available tools
pub struct ToolRegistry {
    /// Tool definitions in registration order
    definitions: Vec<ToolDefinition>,
    /// Tool categories by name
    categories: HashMap<String, ToolCategory>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            definitions: Vec::new(),
            categories: HashMap::new(),
        }
    }

    /// Create a registry with the browser tools and `done`
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_browser_tools();
        registry.register_control_tools();
        registry
    }

    /// Register browser automation tools
    fn register_browser_tools(&mut self) {
        self.register(
            ToolDefinition::new(
                "browser_url",
                "Navigate to a URL and get the interactive elements of the page",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": "string",
                            "description": "The URL to navigate to"
                        },
                        "wait_for_load": {
                            "type": "boolean",
                            "description": "Wait for network idle before snapshot"
                        }
                    },
                    "required": ["url"]
                }),
            ),
            ToolCategory::Browser,
        );

        self.register(
            ToolDefinition::new(
                "browser_click",
                "Click an element on the page by its ref from the latest snapshot",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "ref": {
                            "type": "string",
                            "description": "Element ref from snapshot (e.g., e1, e2)"
                        }
                    },
                    "required": ["ref"]
                }),
            ),
            ToolCategory::Browser,
        );

        self.register(
            ToolDefinition::new(
                "browser_fill",
                "Fill text into an input field by its ref",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "ref": {
                            "type": "string",
                            "description": "Element ref from snapshot"
                        },
                        "text": {
                            "type": "string",
                            "description": "Text to enter"
                        }
                    },
                    "required": ["ref", "text"]
                }),
            ),
            ToolCategory::Browser,
        );

        self.register(
            ToolDefinition::new(
                "browser_press",
                "Press a keyboard key, e.g. Enter, Tab, Escape",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "key": {
                            "type": "string",
                            "description": "Key name"
                        }
                    },
                    "required": ["key"]
                }),
            ),
            ToolCategory::Browser,
        );

        self.register(
            ToolDefinition::new(
                "browser_scroll",
                "Scroll the page",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "direction": {
                            "type": "string",
                            "enum": ["up", "down", "left", "right"],
                            "description": "Scroll direction"
                        },
                        "pixels": {
                            "type": "integer",
                            "description": "Distance in pixels (optional)"
                        }
                    },
                    "required": ["direction"]
                }),
            ),
            ToolCategory::Browser,
        );

        self.register(
            ToolDefinition::new(
                "browser_get_text",
                "Get text content of an element, or of the whole page when no ref is given",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "ref": {
                            "type": "string",
                            "description": "Element ref from snapshot (optional)"
                        }
                    }
                }),
            ),
            ToolCategory::Browser,
        );

        self.register(
            ToolDefinition::new(
                "browser_snapshot",
                "Get the current page accessibility tree with element refs",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "interactive_only": {
                            "type": "boolean",
                            "description": "Only return interactive elements (buttons, links, inputs)"
                        }
                    }
                }),
            ),
            ToolCategory::Browser,
        );

        self.register(
            ToolDefinition::new(
                "browser_screenshot",
                "Take a screenshot of the current page",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "File path to save screenshot (optional)"
                        },
                        "full_page": {
                            "type": "boolean",
                            "description": "Capture full page instead of viewport"
                        }
                    }
                }),
            ),
            ToolCategory::Browser,
        );
    }

    /// Register the loop control tool
    fn register_control_tools(&mut self) {
        self.register(
            ToolDefinition::new(
                DONE_TOOL,
                "Finish the task and report the final answer to the user",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "answer": {
                            "type": "string",
                            "description": "The final answer"
                        }
                    },
                    "required": ["answer"]
                }),
            ),
            ToolCategory::Control,
        );
    }

    /// Register a tool definition, replacing any with the same name
    pub fn register(&mut self, definition: ToolDefinition, category: ToolCategory) {
        let name = definition.name.clone();
        self.definitions.retain(|d| d.name != name);
        self.definitions.push(definition);
        self.categories.insert(name, category);
    }

    /// All tool definitions, in registration order
    pub fn all_definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Get tool definitions by category
    pub fn definitions_by_category(&self, category: ToolCategory) -> Vec<&ToolDefinition> {
        self.definitions
            .iter()
            .filter(|def| self.categories.get(&def.name) == Some(&category))
            .collect()
    }

    /// Get browser tool definitions
    pub fn browser_tools(&self) -> Vec<&ToolDefinition> {
        self.definitions_by_category(ToolCategory::Browser)
    }

    /// Category of a tool, if registered
    pub fn category(&self, name: &str) -> Option<ToolCategory> {
        self.categories.get(name).copied()
    }

    /// Whether the call finishes the task
    pub fn is_terminal(&self, tool_call: &ToolCall) -> bool {
        self.category(&tool_call.name) == Some(ToolCategory::Control)
    }

    /// Execute a tool call against a browser session
    ///
    /// Unknown tools yield a failed result rather than an error.
    pub async fn execute(
        &self,
        browser: &dyn BrowserRuntime,
        tool_call: &ToolCall,
    ) -> Result<ToolResult> {
        match self.category(&tool_call.name) {
            Some(ToolCategory::Browser) => browser.execute(tool_call).await,
            Some(ToolCategory::Control) => Ok(ToolResult::success(
                &tool_call.name,
                tool_call.get_string("answer").unwrap_or_default(),
            )),
            None => Ok(ToolResult::failure(
                &tool_call.name,
                format!("Unknown tool: {}", tool_call.name),
            )),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
