//! OpenAI-compatible `/chat/completions` client.

use std::time::{Duration, Instant};

use genscribe_shared::{GenscribeError, Result, Settings, resolve_api_key};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use crate::{Completion, CompletionRequest};

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("genscribe/", env!("CARGO_PKG_VERSION"));

/// How much of an error body is echoed back in a failure message.
const ERROR_BODY_PREVIEW: usize = 300;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ---------------------------------------------------------------------------
// OpenAiClient
// ---------------------------------------------------------------------------

/// HTTP client for an OpenAI-compatible chat-completion endpoint.
///
/// Built once per process and shared by every pipeline invocation.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl OpenAiClient {
    /// Create a client against `api_base` (e.g. `https://api.openai.com/v1`).
    pub fn new(api_base: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = chat_endpoint(api_base)?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GenscribeError::Completion(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            api_key: api_key.into(),
        })
    }

    /// Create a client from settings, reading the API key from the environment.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = resolve_api_key(settings)?;
        Self::new(
            &settings.general.api_base,
            api_key,
            Duration::from_secs(settings.general.timeout_secs),
        )
    }

    /// The resolved `/chat/completions` URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Completion for OpenAiClient {
    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let start = Instant::now();
        debug!(endpoint = %self.endpoint, "sending completion request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GenscribeError::Completion(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            GenscribeError::Completion(format!("failed to read response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(GenscribeError::Completion(format!(
                "HTTP {status}: {}",
                error_detail(&body)
            )));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            GenscribeError::Completion(format!("invalid completion response: {e}"))
        })?;

        let content = first_content(parsed.choices)?;

        match parsed.usage {
            Some(usage) => info!(
                tokens_in = usage.prompt_tokens,
                tokens_out = usage.completion_tokens,
                latency_ms = start.elapsed().as_millis() as u64,
                "completion received"
            ),
            None => info!(
                latency_ms = start.elapsed().as_millis() as u64,
                "completion received"
            ),
        }

        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append `chat/completions` to the API base, tolerating a trailing slash.
fn chat_endpoint(api_base: &str) -> Result<Url> {
    let base = format!("{}/", api_base.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|url| url.join("chat/completions"))
        .map_err(|e| GenscribeError::config(format!("invalid API base '{api_base}': {e}")))
}

/// Text of the first choice, which must be present and non-null.
fn first_content(choices: Vec<Choice>) -> Result<String> {
    choices
        .into_iter()
        .next()
        .ok_or_else(|| GenscribeError::Completion("response contained no choices".into()))?
        .message
        .content
        .ok_or_else(|| GenscribeError::Completion("first choice has no message content".into()))
}

/// Prefer the API's own error message; otherwise echo a prefix of the body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.chars().take(ERROR_BODY_PREVIEW).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genscribe_shared::{ChatMessage, ResponseFormat};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(
            &format!("{}/v1", server.uri()),
            "test-key",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            "gpt-4o-mini",
            vec![
                ChatMessage::system("You write HTML."),
                ChatMessage::user("Make a dropdown."),
            ],
        )
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let a = chat_endpoint("https://api.openai.com/v1").unwrap();
        let b = chat_endpoint("https://api.openai.com/v1/").unwrap();
        assert_eq!(a.as_str(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(a, b);
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(chat_endpoint("not a url").is_err());
    }

    #[test]
    fn error_detail_prefers_api_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_detail(body), "Incorrect API key provided");
        assert_eq!(error_detail("upstream timeout"), "upstream timeout");
    }

    #[tokio::test]
    async fn complete_returns_first_choice() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "You write HTML."},
                    {"role": "user", "content": "Make a dropdown."}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "first"}},
                    {"index": 1, "message": {"role": "assistant", "content": "second"}}
                ],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).complete(&request()).await.unwrap();
        assert_eq!(text, "first");
    }

    #[tokio::test]
    async fn complete_sends_response_format() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"greeting\":\"hi\"}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let req = request().with_response_format(Some(ResponseFormat::JsonObject));
        let text = client_for(&server).complete(&req).await.unwrap();
        assert_eq!(text, r#"{"greeting":"hi"}"#);
    }

    #[tokio::test]
    async fn complete_surfaces_http_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, GenscribeError::Completion(_)));
        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(text.contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn complete_rejects_empty_choices() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[tokio::test]
    async fn complete_rejects_null_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("no message content"));
    }

    #[test]
    fn from_settings_requires_api_key() {
        let mut settings = Settings::default();
        settings.general.api_key_env = "GS_TEST_COMPLETION_MISSING_KEY_98765".into();
        let err = OpenAiClient::from_settings(&settings).unwrap_err();
        assert!(matches!(err, GenscribeError::Config { .. }));
    }
}
