//! Amazon Bedrock client
//!
//! Calls `InvokeModel` through `aws-sdk-bedrockruntime` with the Anthropic
//! Messages body and maps Bedrock's error codes onto the crate's auth / access
//! / availability errors.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::config::http::HttpResponse;
use aws_sdk_bedrockruntime::config::timeout::TimeoutConfig;
use aws_sdk_bedrockruntime::config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockruntime::operation::invoke_model::InvokeModelError;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::run_config::RunConfig;
use crate::core::{BrowserAgentError, Config, Message, Result, Role, ToolCall, ToolDefinition};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Bedrock runtime client bound to one region and credential set
#[derive(Clone)]
pub struct BedrockClient {
    client: Client,
    region: String,
    temperature: f64,
    max_tokens: u32,
}

/// Anthropic Messages request body
#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<BedrockMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct BedrockMessage {
    role: &'static str,
    content: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestContent {
    Text { text: String },
}

/// Anthropic Messages response body
#[derive(Debug, Deserialize)]
struct InvokeResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ResponseContent>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseContent {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl BedrockClient {
    /// Create a client for a validated run configuration
    pub fn from_run_config(run: &RunConfig, config: &Config) -> Self {
        let mut builder = aws_sdk_bedrockruntime::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(run.region.as_str()))
            .credentials_provider(run.credentials.to_sdk())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(config.aws.timeout_secs))
                    .build(),
            );
        if let Some(url) = &config.aws.endpoint_url {
            builder = builder.endpoint_url(url.trim_end_matches('/'));
        }

        Self {
            client: Client::from_conf(builder.build()),
            region: run.region.as_str().to_string(),
            temperature: run.temperature,
            max_tokens: run.max_tokens,
        }
    }

    /// Region requests are sent to
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Split internal messages into the system prompt and Bedrock turns
    fn to_bedrock_messages(messages: &[Message]) -> (Option<String>, Vec<BedrockMessage>) {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let turns = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| BedrockMessage {
                role: if m.role == Role::Assistant {
                    "assistant"
                } else {
                    "user"
                },
                content: vec![RequestContent::Text {
                    text: m.content.clone(),
                }],
            })
            .collect();

        let system = (!system.is_empty()).then(|| system.join("\n\n"));
        (system, turns)
    }

    fn to_llm_response(response: InvokeResponse, model: &str) -> LLMResponse {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                ResponseContent::Text { text } => {
                    if !content.is_empty() {
                        content.push('\n');
                    }
                    content.push_str(&text);
                }
                ResponseContent::ToolUse { name, input } => {
                    tool_calls.push(ToolCall::new(name, input));
                }
                ResponseContent::Other => {}
            }
        }

        LLMResponse {
            content,
            tool_calls,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
            model: response.model.unwrap_or_else(|| model.to_string()),
            stop_reason: response.stop_reason,
        }
    }

    async fn invoke(
        &self,
        model: &str,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let options = options.unwrap_or_default();
        let (system, turns) = Self::to_bedrock_messages(messages);

        let request = InvokeRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: options.max_tokens.unwrap_or(self.max_tokens),
            temperature: options.temperature.unwrap_or(self.temperature),
            system,
            messages: turns,
            tools: tools.filter(|t| !t.is_empty()),
            stop_sequences: options.stop,
        };
        let body = serde_json::to_vec(&request)?;

        debug!(model = %model, region = %self.region, bytes = body.len(), "Invoking Bedrock model");

        let output = self
            .client
            .invoke_model()
            .model_id(model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| from_sdk_error(&e, model, &self.region))?;

        let bytes = output.body().as_ref();
        debug!(bytes = bytes.len(), "Bedrock response received");

        let parsed: InvokeResponse = serde_json::from_slice(bytes).map_err(|e| {
            BrowserAgentError::bedrock(format!("Failed to parse response: {}", e))
        })?;

        Ok(Self::to_llm_response(parsed, model))
    }
}

/// Map an `InvokeModel` failure onto the crate error taxonomy
fn from_sdk_error(
    err: &SdkError<InvokeModelError, HttpResponse>,
    model: &str,
    region: &str,
) -> BrowserAgentError {
    if matches!(err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)) {
        return BrowserAgentError::bedrock(format!(
            "Cannot reach Bedrock in {}: {}",
            region,
            DisplayErrorContext(err)
        ));
    }

    let status = err.raw_response().map(|r| r.status().as_u16());
    let message = err
        .message()
        .map(|m| m.to_string())
        .unwrap_or_else(|| DisplayErrorContext(err).to_string());
    classify_error(status, err.code(), Some(&message), model, region)
}

/// Map a Bedrock error code and HTTP status onto the crate error taxonomy
pub(crate) fn classify_error(
    status: Option<u16>,
    code: Option<&str>,
    message: Option<&str>,
    model: &str,
    region: &str,
) -> BrowserAgentError {
    let message = message.unwrap_or_default().trim().to_string();
    let code = code.unwrap_or_default();
    let lowered = message.to_lowercase();
    let unavailable = |message: String| BrowserAgentError::ModelUnavailable {
        model: model.to_string(),
        region: region.to_string(),
        message,
    };

    match code {
        "UnrecognizedClientException"
        | "InvalidSignatureException"
        | "ExpiredTokenException"
        | "IncompleteSignature"
        | "MissingAuthenticationToken"
        | "InvalidClientTokenId" => BrowserAgentError::Auth(message),
        "AccessDeniedException" => BrowserAgentError::AccessDenied(message),
        "ResourceNotFoundException" | "ModelNotReadyException" => unavailable(message),
        "ValidationException"
            if lowered.contains("model identifier")
                || lowered.contains("on-demand throughput")
                || lowered.contains("inference profile") =>
        {
            unavailable(message)
        }
        "" if status == Some(401) => BrowserAgentError::Auth(message),
        "" if status == Some(403) => BrowserAgentError::AccessDenied(message),
        "" if status == Some(404) => unavailable(message),
        _ => BrowserAgentError::bedrock(format!(
            "{} ({}): {}",
            if code.is_empty() { "error" } else { code },
            status.map_or_else(|| "no status".to_string(), |s| s.to_string()),
            message
        )),
    }
}

#[async_trait]
impl LLMProvider for BedrockClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.invoke(model, messages, None, options).await
    }

    async fn chat_with_tools(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.invoke(model, messages, Some(tools), options).await
    }

    fn name(&self) -> &str {
        "bedrock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Credentials, ErrorKind, RawInputs};
    use serde_json::json;

    fn run_config() -> RunConfig {
        crate::core::resolve(
            &RawInputs::default()
                .with_region("us-west-2")
                .with_credentials(Credentials::new("AKID", "secret")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = BedrockClient::from_run_config(&run_config(), &Config::default());
        assert_eq!(client.region(), "us-west-2");
        assert_eq!(client.name(), "bedrock");
        assert_eq!(
            client.client.config().region().map(|r| r.as_ref()),
            Some("us-west-2")
        );
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::system("be brief"),
            Message::user("hello"),
            Message::assistant("hi"),
        ];
        let (system, turns) = BedrockClient::to_bedrock_messages(&messages);
        assert_eq!(system.as_deref(), Some("be brief"));
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, "user");
        assert_eq!(turns[1].role, "assistant");
    }

    #[test]
    fn test_request_body_shape() {
        let tools = vec![ToolDefinition::new("done", "finish", json!({"type": "object"}))];
        let request = InvokeRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: 4096,
            temperature: 0.3,
            system: Some("sys".to_string()),
            messages: vec![BedrockMessage {
                role: "user",
                content: vec![RequestContent::Text {
                    text: "go".to_string(),
                }],
            }],
            tools: Some(&tools),
            stop_sequences: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(value["messages"][0]["content"][0]["type"], "text");
        assert_eq!(value["tools"][0]["input_schema"]["type"], "object");
        assert!(value.get("stop_sequences").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let body = json!({
            "id": "msg_1",
            "model": "claude-3-haiku",
            "content": [
                {"type": "text", "text": "Opening the page."},
                {"type": "tool_use", "id": "tu_1", "name": "browser_url",
                 "input": {"url": "https://example.com"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });
        let parsed: InvokeResponse = serde_json::from_value(body).unwrap();
        let response = BedrockClient::to_llm_response(parsed, "fallback");
        assert_eq!(response.content, "Opening the page.");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "browser_url");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
        assert_eq!(response.stop_reason.as_deref(), Some("tool_use"));
    }

    #[test]
    fn test_classify_auth_errors() {
        let err = classify_error(
            Some(403),
            Some("UnrecognizedClientException"),
            Some("The security token included in the request is invalid."),
            "m",
            "us-east-1",
        );
        assert_eq!(ErrorKind::from(&err), ErrorKind::AuthError);

        let err = classify_error(Some(403), Some("InvalidSignatureException"), None, "m", "us-east-1");
        assert_eq!(ErrorKind::from(&err), ErrorKind::AuthError);

        let err = classify_error(Some(401), None, None, "m", "us-east-1");
        assert_eq!(ErrorKind::from(&err), ErrorKind::AuthError);
    }

    #[test]
    fn test_classify_access_and_availability() {
        let err = classify_error(
            Some(403),
            Some("AccessDeniedException"),
            Some("You don't have access to the model with the specified model ID."),
            "m",
            "us-east-1",
        );
        assert_eq!(ErrorKind::from(&err), ErrorKind::AccessDenied);

        let err = classify_error(
            Some(400),
            Some("ValidationException"),
            Some("The provided model identifier is invalid."),
            "m",
            "eu-west-1",
        );
        assert_eq!(ErrorKind::from(&err), ErrorKind::ModelUnavailable);
        assert!(err.to_string().contains("eu-west-1"));

        let err = classify_error(Some(404), None, None, "m", "us-east-1");
        assert_eq!(ErrorKind::from(&err), ErrorKind::ModelUnavailable);
    }

    #[test]
    fn test_bare_forbidden_is_access_denied() {
        let err = classify_error(Some(403), None, Some("Forbidden"), "m", "us-east-1");
        assert_eq!(ErrorKind::from(&err), ErrorKind::AccessDenied);
        assert!(err.to_string().contains("Forbidden"));
    }

    #[test]
    fn test_classify_other_errors() {
        let err = classify_error(
            Some(429),
            Some("ThrottlingException"),
            Some("Too many requests"),
            "m",
            "us-east-1",
        );
        assert_eq!(ErrorKind::from(&err), ErrorKind::AgentError);
        assert!(err.to_string().contains("ThrottlingException"));

        let err = classify_error(Some(400), Some("ValidationException"), Some("bad input"), "m", "us-east-1");
        assert_eq!(ErrorKind::from(&err), ErrorKind::AgentError);
    }
}
