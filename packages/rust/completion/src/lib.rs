//! Chat-completion capability for genscribe.
//!
//! Pipelines depend on the [`Completion`] trait only. [`OpenAiClient`] is the
//! production implementation speaking the OpenAI-compatible
//! `/chat/completions` protocol over `reqwest`.

mod openai;

use std::future::Future;

use genscribe_shared::{ChatMessage, ResponseFormat, Result};
use serde::Serialize;

pub use openai::OpenAiClient;

/// One request to the completion endpoint.
///
/// Serializes directly into the OpenAI-compatible request body.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            response_format: None,
        }
    }

    pub fn with_response_format(mut self, format: Option<ResponseFormat>) -> Self {
        self.response_format = format;
        self
    }
}

/// Maps a model and message list to a single completion text.
pub trait Completion: Send + Sync {
    /// Run one request and return the text of the first choice.
    fn complete(&self, request: &CompletionRequest) -> impl Future<Output = Result<String>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_absent_response_format() {
        let request = CompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn request_carries_response_format() {
        let request = CompletionRequest::new("m", vec![ChatMessage::system("json only")])
            .with_response_format(Some(ResponseFormat::JsonObject));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
    }
}
