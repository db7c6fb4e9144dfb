//! LLM module - Language Model integrations
//!
//! Provides the provider abstraction with Amazon Bedrock as the implementation.

pub mod bedrock;
pub mod models;
pub mod traits;

pub use bedrock::BedrockClient;
pub use models::*;
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};
