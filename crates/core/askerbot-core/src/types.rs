//! Shared data types

use serde::{Deserialize, Serialize};

/// A citation attached to a reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Page title
    pub title: String,
    /// Page URL
    pub url: String,
    /// Relevance score of the cited candidate
    pub score: f64,
}

/// Token usage reported by the completion service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

/// Why a completion is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPurpose {
    /// Structured query analysis (JSON expected back)
    QueryAnalysis,
    /// Final user-facing answer
    Answer,
}

/// One system + user exchange sent to the completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// What the call is for
    pub purpose: CompletionPurpose,
    /// Model override; the provider default is used when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// System instruction
    pub system: String,
    /// User message
    pub user: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Token cap
    pub max_tokens: u32,
}

/// Text returned by the completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Content of the first choice, untrimmed
    pub text: String,
    /// Usage, when the service reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}
