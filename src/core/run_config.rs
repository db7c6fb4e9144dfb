//! Run configuration resolver
//!
//! Turns raw, loosely typed inputs (config file, environment, CLI flags) into a
//! validated [`RunConfig`]. Resolution never touches the network and never
//! clamps: anything outside the recognized sets or ranges is rejected with a
//! [`ConfigError`] naming the problem.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::config::Config;
use crate::core::credentials::{AwsSettings, AwsSource, Credentials};
use crate::core::error::{ConfigError, ConfigField};

pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=1.0;
pub const MAX_STEPS_RANGE: std::ops::RangeInclusive<i64> = 1..=20;

pub const DEFAULT_MODEL: &str = "anthropic.claude-3-5-sonnet-20241022-v2:0";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_STEPS: u32 = 5;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Geography of a region, also used as the inference-profile prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geography {
    Us,
    Eu,
    Apac,
}

impl Geography {
    pub fn prefix(&self) -> &'static str {
        match self {
            Geography::Us => "us",
            Geography::Eu => "eu",
            Geography::Apac => "apac",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "us" => Some(Geography::Us),
            "eu" => Some(Geography::Eu),
            "apac" => Some(Geography::Apac),
            _ => None,
        }
    }
}

/// Recognized Bedrock regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "us-east-1")]
    UsEast1,
    #[serde(rename = "us-west-2")]
    UsWest2,
    #[serde(rename = "eu-west-1")]
    EuWest1,
    #[serde(rename = "ap-southeast-1")]
    ApSoutheast1,
}

impl Region {
    pub const ALL: [Region; 4] = [
        Region::UsEast1,
        Region::UsWest2,
        Region::EuWest1,
        Region::ApSoutheast1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::UsEast1 => "us-east-1",
            Region::UsWest2 => "us-west-2",
            Region::EuWest1 => "eu-west-1",
            Region::ApSoutheast1 => "ap-southeast-1",
        }
    }

    pub fn geography(&self) -> Geography {
        match self {
            Region::UsEast1 | Region::UsWest2 => Geography::Us,
            Region::EuWest1 => Geography::Eu,
            Region::ApSoutheast1 => Geography::Apac,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Region::ALL
            .into_iter()
            .find(|r| r.as_str() == trimmed)
            .ok_or_else(|| ConfigError::UnknownRegion(trimmed.to_string()))
    }
}

/// Recognized Claude models on Bedrock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaudeModel {
    #[serde(rename = "anthropic.claude-3-7-sonnet-20250219-v1:0")]
    Sonnet37,
    #[serde(rename = "anthropic.claude-3-5-sonnet-20241022-v2:0")]
    Sonnet35V2,
    #[serde(rename = "anthropic.claude-3-haiku-20240307-v1:0")]
    Haiku3,
    #[serde(rename = "anthropic.claude-3-opus-20240229-v1:0")]
    Opus3,
}

impl ClaudeModel {
    pub const ALL: [ClaudeModel; 4] = [
        ClaudeModel::Sonnet35V2,
        ClaudeModel::Haiku3,
        ClaudeModel::Opus3,
        ClaudeModel::Sonnet37,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaudeModel::Sonnet37 => "anthropic.claude-3-7-sonnet-20250219-v1:0",
            ClaudeModel::Sonnet35V2 => "anthropic.claude-3-5-sonnet-20241022-v2:0",
            ClaudeModel::Haiku3 => "anthropic.claude-3-haiku-20240307-v1:0",
            ClaudeModel::Opus3 => "anthropic.claude-3-opus-20240229-v1:0",
        }
    }
}

/// A model selection, optionally routed through a cross-region inference profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId {
    pub model: ClaudeModel,
    pub profile: Option<Geography>,
}

impl ModelId {
    pub fn new(model: ClaudeModel) -> Self {
        Self {
            model,
            profile: None,
        }
    }

    /// Identifier sent to Bedrock (`us.anthropic...` for inference profiles)
    pub fn invoke_id(&self) -> String {
        match self.profile {
            Some(geo) => format!("{}.{}", geo.prefix(), self.model.as_str()),
            None => self.model.as_str().to_string(),
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.invoke_id())
    }
}

impl FromStr for ModelId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unknown = || ConfigError::UnknownModel(trimmed.to_string());

        let (profile, base) = match trimmed.split_once('.') {
            Some((prefix, rest)) => match Geography::from_prefix(prefix) {
                Some(geo) => (Some(geo), rest),
                None => (None, trimmed),
            },
            None => (None, trimmed),
        };

        let model = ClaudeModel::ALL
            .into_iter()
            .find(|m| m.as_str() == base)
            .ok_or_else(unknown)?;

        Ok(Self { model, profile })
    }
}

/// Unvalidated run inputs, layered from config file, AWS profile, environment and flags
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub model: Option<String>,
    pub region: Option<String>,
    pub temperature: Option<f64>,
    pub max_steps: Option<i64>,
    pub max_tokens: Option<u32>,
    pub credentials: Option<Credentials>,
}

impl RawInputs {
    /// Seed inputs from the config file values
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: Some(config.run.model.clone()),
            region: config.aws.region.clone(),
            temperature: Some(config.run.temperature),
            max_steps: Some(i64::from(config.run.max_steps)),
            max_tokens: Some(config.run.max_tokens),
            credentials: None,
        }
    }

    /// Overlay values from the process environment
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from an environment lookup
    ///
    /// Empty variables are treated as unset.
    pub fn apply_env_with(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = lookup("BEDROCK_BROWSER_MODEL") {
            self.model = Some(model);
        }
        if let Some(region) = lookup("AWS_DEFAULT_REGION").or_else(|| lookup("AWS_REGION")) {
            self.region = Some(region);
        }
        if let Some(raw) = lookup("BEDROCK_BROWSER_TEMPERATURE") {
            self.temperature = Some(parse_number(ConfigField::Temperature, &raw)?);
        }
        if let Some(raw) = lookup("BEDROCK_BROWSER_MAX_STEPS") {
            self.max_steps = Some(parse_number(ConfigField::MaxSteps, &raw)?);
        }
        Ok(self)
    }

    /// Fill region and credentials the AWS profile supplied
    ///
    /// A region already set (config file) is kept.
    pub fn with_aws(mut self, aws: AwsSettings) -> Self {
        if self.region.is_none() {
            self.region = aws.region;
        }
        if self.credentials.is_none() {
            self.credentials = aws.credentials;
        }
        self
    }

    /// Config file, then the AWS environment and profile, then overrides from
    /// the environment
    pub async fn gather(config: &Config) -> Result<Self, ConfigError> {
        let aws = AwsSource::from_config(config).load().await;
        Self::from_config(config).with_aws(aws).apply_env()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_steps(mut self, max_steps: i64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

fn parse_number<T: FromStr>(field: ConfigField, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

/// Validated parameters governing one agent session
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub model: ModelId,
    pub region: Region,
    pub temperature: f64,
    pub max_steps: u32,
    pub max_tokens: u32,
    pub credentials: Credentials,
}

impl RunConfig {
    /// Short human-readable summary lines (no secrets)
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Model:       {}", self.model),
            format!("Region:      {}", self.region),
            format!("Temperature: {}", self.temperature),
            format!("Max steps:   {}", self.max_steps),
        ]
    }
}

/// Validate raw inputs into a [`RunConfig`]
///
/// Checks run in order: model, region, temperature, max_steps, credentials.
pub fn resolve(raw: &RawInputs) -> Result<RunConfig, ConfigError> {
    let model: ModelId = raw.model.as_deref().unwrap_or(DEFAULT_MODEL).parse()?;
    let region: Region = raw.region.as_deref().unwrap_or(DEFAULT_REGION).parse()?;

    if let Some(geo) = model.profile {
        if geo != region.geography() {
            return Err(ConfigError::UnknownModel(format!(
                "{} (inference profile '{}' does not serve {})",
                model,
                geo.prefix(),
                region
            )));
        }
    }

    let temperature = raw.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    if !TEMPERATURE_RANGE.contains(&temperature) {
        return Err(ConfigError::OutOfRange {
            field: ConfigField::Temperature,
            value: temperature.to_string(),
            range: "0.0..=1.0",
        });
    }

    let max_steps = raw.max_steps.unwrap_or(i64::from(DEFAULT_MAX_STEPS));
    if !MAX_STEPS_RANGE.contains(&max_steps) {
        return Err(ConfigError::OutOfRange {
            field: ConfigField::MaxSteps,
            value: max_steps.to_string(),
            range: "1..=20",
        });
    }

    let credentials = match &raw.credentials {
        Some(creds) if !creds.is_blank() => creds.clone(),
        Some(_) => {
            return Err(ConfigError::MissingCredentials(
                "AWS_ACCESS_KEY_ID or AWS_SECRET_ACCESS_KEY is empty".to_string(),
            ))
        }
        None => {
            return Err(ConfigError::MissingCredentials(
                "set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY in .env or run `aws configure`"
                    .to_string(),
            ))
        }
    };

    Ok(RunConfig {
        model,
        region,
        temperature,
        max_steps: max_steps as u32,
        max_tokens: raw.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        credentials,
    })
}
