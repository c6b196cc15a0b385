//! Language model adapters
//!
//! Handlers never talk to a model provider directly. They go through
//! [`LanguageModel`], and the functions in [`parsing`] turn whatever text
//! comes back into strictly typed results with explicit fallbacks.

pub mod openai;
pub mod parsing;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

pub use openai::OpenAiClient;
pub use parsing::{
    OcrResult, OverlappingSplit, ParsedExpense, parse_expense_text, parse_overlapping_split_text,
    process_receipt_ocr,
};

#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model API returned no choices")]
    EmptyResponse,
}

/// Which configured model a request should run on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Cheap text model used for parsing expense messages
    Text,
    /// Vision-capable model used for receipts
    Vision,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: Value,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: Value::String(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: Value::String(text.into()),
        }
    }

    /// A user message carrying an instruction and an image
    pub fn user_with_image(text: impl Into<String>, image_url: &str) -> Self {
        Self {
            role: "user",
            content: json!([
                { "type": "text", "text": text.into() },
                { "type": "image_url", "image_url": { "url": image_url, "detail": "high" } }
            ]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: ModelKind,
    pub messages: Vec<ChatMessage>,
    /// Ask the provider to constrain output to a JSON object
    pub json_mode: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one chat completion and return the first choice's text, if any
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, AiError>;
}
