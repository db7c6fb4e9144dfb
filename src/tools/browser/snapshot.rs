//! Snapshot parsing for agent-browser output
//!
//! Parses the accessibility-tree JSON that `agent-browser snapshot --json`
//! prints and renders a compact element listing for the model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parsed snapshot from agent-browser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Whether the operation succeeded
    #[serde(default)]
    pub success: bool,
    /// Snapshot data
    #[serde(default)]
    pub data: Option<SnapshotData>,
}

/// Snapshot data content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Raw accessibility tree
    #[serde(default)]
    pub snapshot: String,
    /// Element refs mapped to their info
    #[serde(default)]
    pub refs: BTreeMap<String, Element>,
}

/// An element in the snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Element {
    /// ARIA role
    #[serde(default)]
    pub role: String,
    /// Accessible name
    #[serde(default)]
    pub name: String,
    /// Element value (for inputs)
    #[serde(default)]
    pub value: Option<String>,
}

impl Snapshot {
    /// Parse agent-browser JSON output
    pub fn parse(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }

    /// Count the number of elements with refs
    pub fn count_elements(&self) -> usize {
        self.data.as_ref().map(|d| d.refs.len()).unwrap_or(0)
    }

    /// Get an element by ref, with or without the `@` prefix
    pub fn get_element(&self, ref_id: &str) -> Option<&Element> {
        let clean_ref = ref_id.strip_prefix('@').unwrap_or(ref_id);
        self.data.as_ref().and_then(|d| d.refs.get(clean_ref))
    }

    /// Interactive elements ordered by ref number (e1, e2, ..., e10)
    pub fn interactive_elements(&self) -> Vec<(&str, &Element)> {
        let mut elements: Vec<(&str, &Element)> = self
            .data
            .as_ref()
            .map(|d| {
                d.refs
                    .iter()
                    .filter(|(_, el)| el.is_interactive())
                    .map(|(r, el)| (r.as_str(), el))
                    .collect()
            })
            .unwrap_or_default();
        elements.sort_by_key(|(r, _)| ref_number(r));
        elements
    }

    /// Compact listing of interactive elements, at most `limit` lines
    pub fn compact_listing(&self, limit: usize) -> String {
        let elements = self.interactive_elements();
        if elements.is_empty() {
            return "No interactive elements found".to_string();
        }

        let mut lines: Vec<String> = elements
            .iter()
            .take(limit)
            .map(|(ref_id, el)| {
                let value = el
                    .value
                    .as_ref()
                    .map(|v| format!(" = \"{}\"", v))
                    .unwrap_or_default();
                format!("  [ref={}] {} \"{}\"{}", ref_id, el.role, el.name, value)
            })
            .collect();

        if elements.len() > limit {
            lines.push(format!("  ... {} more", elements.len() - limit));
        }
        lines.join("\n")
    }
}

fn ref_number(ref_id: &str) -> u64 {
    ref_id
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(u64::MAX)
}

impl Element {
    /// Check if this is an interactive element
    pub fn is_interactive(&self) -> bool {
        matches!(
            self.role.as_str(),
            "button"
                | "link"
                | "textbox"
                | "checkbox"
                | "radio"
                | "combobox"
                | "menuitem"
                | "tab"
                | "switch"
                | "searchbox"
        )
    }
}
