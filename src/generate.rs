//! Answer generation through Gemini's OpenAI-compatible chat endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const CHAT_PATH: &str = "/chat/completions";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("API key not configured for {0}")]
    ApiKeyMissing(String),

    #[error("{0}")]
    Http(String),

    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Turns a composed prompt into answer text.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Single-shot, non-streaming chat completion with one fixed model.
pub struct GeminiGenerator {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, base_url: &str, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::ApiKeyMissing("gemini".into()));
        }

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let url = format!("{}{}", self.base_url, CHAT_PATH);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Http(format!("gemini connection failed ({url}): {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GenerationError::Http(format!("gemini response read failed: {e}")))?;

        if !status.is_success() {
            return Err(GenerationError::Api {
                provider: "gemini".into(),
                status: status.as_u16(),
                message: upstream_error_message(&text),
            });
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        parse_answer(&json)
    }
}

/// `choices[0].message.content` of a chat completion.
pub fn parse_answer(json: &Value) -> Result<String, GenerationError> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| GenerationError::MalformedResponse("no choices[0].message.content".into()))
}

/// Error bodies come as `[{"error": {...}}]` or `{"error": {...}}`.
fn upstream_error_message(body: &str) -> String {
    let fallback = || -> String { body.chars().take(200).collect() };
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return fallback();
    };
    let error = if parsed.is_array() {
        &parsed[0]["error"]
    } else {
        &parsed["error"]
    };
    error["message"]
        .as_str()
        .or_else(|| error.as_str())
        .map(str::to_string)
        .unwrap_or_else(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_answer_content() {
        let json = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Plants make sugar." } }]
        });
        assert_eq!(parse_answer(&json).unwrap(), "Plants make sugar.");
        assert!(matches!(
            parse_answer(&json!({ "choices": [] })),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn upstream_messages() {
        assert_eq!(
            upstream_error_message(r#"{"error":{"code":429,"message":"Quota exceeded"}}"#),
            "Quota exceeded"
        );
        assert_eq!(
            upstream_error_message(r#"[{"error":{"message":"API key not valid"}}]"#),
            "API key not valid"
        );
        assert_eq!(upstream_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let generator = GeminiGenerator::new("", "http://127.0.0.1:1", DEFAULT_MODEL);
        let err = generator.generate("hi").await.unwrap_err();
        assert!(matches!(err, GenerationError::ApiKeyMissing(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_generation_error() {
        let generator = GeminiGenerator::new("key", "http://127.0.0.1:1/v1", DEFAULT_MODEL);
        let err = generator.generate("hi").await.unwrap_err();
        assert!(matches!(err, GenerationError::Http(_)));
    }

    #[tokio::test]
    async fn round_trip_against_stub_server() {
        use axum::routing::post;
        use axum::Json;

        let app = axum::Router::new()
            .route(
                "/v1/chat/completions",
                post(|headers: axum::http::HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(headers["authorization"], "Bearer key");
                    assert_eq!(body["model"], DEFAULT_MODEL);
                    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
                    Json(json!({
                        "choices": [{ "message": { "content": format!("echo: {prompt}") } }]
                    }))
                }),
            )
            .route(
                "/bad/chat/completions",
                post(|| async {
                    (
                        axum::http::StatusCode::TOO_MANY_REQUESTS,
                        Json(json!({ "error": { "message": "Quota exceeded" } })),
                    )
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let ok = GeminiGenerator::new("key", &format!("http://{addr}/v1/"), DEFAULT_MODEL);
        assert_eq!(ok.generate("cells").await.unwrap(), "echo: cells");

        let bad = GeminiGenerator::new("key", &format!("http://{addr}/bad"), DEFAULT_MODEL);
        let err = bad.generate("cells").await.unwrap_err();
        assert_eq!(err.to_string(), "gemini API error (429): Quota exceeded");
    }
}
