//! Model definitions and presets
//!
//! Display metadata for the Claude models recognized on Bedrock.

use serde::Serialize;

use crate::core::run_config::{ClaudeModel, Region};

/// Model preset with recommended settings
#[derive(Debug, Clone, Serialize)]
pub struct ModelPreset {
    /// Model identifier
    pub model: ClaudeModel,
    /// Human-readable display name
    pub display_name: &'static str,
    /// Description of the model
    pub description: &'static str,
    /// Recommended temperature
    pub default_temperature: f64,
}

impl ModelPreset {
    pub fn id(&self) -> &'static str {
        self.model.as_str()
    }
}

/// Get predefined model presets
pub fn get_model_presets() -> Vec<ModelPreset> {
    vec![
        ModelPreset {
            model: ClaudeModel::Sonnet35V2,
            display_name: "Claude 3.5 Sonnet v2",
            description: "Balanced speed and capability, good default for browsing",
            default_temperature: 0.7,
        },
        ModelPreset {
            model: ClaudeModel::Haiku3,
            display_name: "Claude 3 Haiku",
            description: "Fastest and cheapest, fine for short navigation tasks",
            default_temperature: 0.3,
        },
        ModelPreset {
            model: ClaudeModel::Opus3,
            display_name: "Claude 3 Opus",
            description: "Most capable of the Claude 3 family, slower",
            default_temperature: 0.7,
        },
        ModelPreset {
            model: ClaudeModel::Sonnet37,
            display_name: "Claude 3.7 Sonnet",
            description: "Latest Sonnet; usually needs the `us.` inference profile",
            default_temperature: 0.7,
        },
    ]
}

/// Find a model preset by id (with or without an inference-profile prefix)
pub fn find_preset(id: &str) -> Option<ModelPreset> {
    let base = id
        .split_once('.')
        .filter(|(prefix, _)| matches!(*prefix, "us" | "eu" | "apac"))
        .map(|(_, rest)| rest)
        .unwrap_or(id);
    get_model_presets().into_iter().find(|p| p.id() == base)
}

/// Human-readable listing of models
pub fn format_models() -> String {
    get_model_presets()
        .iter()
        .map(|p| format!("  {:<45} {} - {}", p.id(), p.display_name, p.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-readable listing of regions
pub fn format_regions() -> String {
    Region::ALL
        .iter()
        .map(|r| format!("  {:<16} (inference profile prefix: {}.)", r, r.geography().prefix()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_model_has_preset() {
        for model in ClaudeModel::ALL {
            assert!(find_preset(model.as_str()).is_some(), "{:?}", model);
        }
    }

    #[test]
    fn test_find_preset_with_profile_prefix() {
        let preset = find_preset("us.anthropic.claude-3-haiku-20240307-v1:0").unwrap();
        assert_eq!(preset.model, ClaudeModel::Haiku3);
        assert!(find_preset("anthropic.claude-instant-v1").is_none());
    }

    #[test]
    fn test_listings() {
        assert!(format_models().contains("anthropic.claude-3-opus-20240229-v1:0"));
        assert!(format_regions().contains("ap-southeast-1"));
    }
}
