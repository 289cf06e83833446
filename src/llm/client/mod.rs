//! Completion client for evidence fusion.
//!
//! Speaks the Ollama chat API (local inference) and the OpenAI-compatible
//! chat-completions API (OpenAI, Groq, Together.ai).

mod config;
mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use config::{LlmConfig, LlmProvider};
pub use prompts::{DEFAULT_FUSION_PROMPT, NOT_SPECIFIED};

use crate::services::{ChatRole, ChatTurn, CompletionService};

/// Errors that can occur during completion requests.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Failed to connect to the service
    #[error("Connection error: {0}")]
    Connection(String),
    /// The service returned an error
    #[error("API error: {0}")]
    Api(String),
    /// Failed to parse the response
    #[error("Parse error: {0}")]
    Parse(String),
    /// Completion is disabled by configuration
    #[error("LLM is disabled")]
    Disabled,
}

/// HTTP completion client.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
    }
}

impl LlmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Check if the completion service answers.
    pub async fn is_available(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        let request = match self.config.provider {
            LlmProvider::Ollama => self
                .client
                .get(format!("{}/api/tags", self.config.endpoint)),
            LlmProvider::OpenAI => self.authorize(
                self.client
                    .get(format!("{}/v1/models", self.config.endpoint)),
            ),
        };
        match request.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Keep at most `max_content_chars` characters.
    fn truncate_content<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.config.max_content_chars) {
            Some((end, _)) => &text[..end],
            None => text,
        }
    }

    fn messages<'a>(&self, turns: &'a [ChatTurn]) -> Vec<Message<'a>> {
        turns
            .iter()
            .map(|turn| Message {
                role: role_name(turn.role),
                content: match turn.role {
                    ChatRole::System => turn.content.as_str(),
                    ChatRole::User => self.truncate_content(&turn.content),
                },
            })
            .collect()
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.api_key {
            Some(ref key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        request: RequestBuilder,
        body: &T,
    ) -> Result<reqwest::Response, LlmError> {
        let resp = request
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }
        Ok(resp)
    }

    async fn call_ollama(&self, model: &str, turns: &[ChatTurn]) -> Result<String, LlmError> {
        let request = OllamaChatRequest {
            model,
            messages: self.messages(turns),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/chat", self.config.endpoint);
        let resp = self.send_json(self.client.post(&url), &request).await?;
        let parsed: OllamaChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        parsed
            .message
            .content
            .ok_or_else(|| LlmError::Parse("Missing message content".to_string()))
    }

    async fn call_openai(&self, model: &str, turns: &[ChatTurn]) -> Result<String, LlmError> {
        let request = OpenAiChatRequest {
            model,
            messages: self.messages(turns),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/v1/chat/completions", self.config.endpoint);
        let resp = self
            .send_json(self.authorize(self.client.post(&url)), &request)
            .await?;
        let parsed: OpenAiChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("No choices in response".to_string()))
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, model: &str, turns: &[ChatTurn]) -> Result<String, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }

        debug!(
            "Requesting completion from {} ({} turns, model {})",
            self.config.provider.as_str(),
            turns.len(),
            model
        );
        match self.config.provider {
            LlmProvider::Ollama => self.call_ollama(model, turns).await,
            LlmProvider::OpenAI => self.call_openai(model, turns).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn turns() -> Vec<ChatTurn> {
        vec![
            ChatTurn::system("structure"),
            ChatTurn::user("Marque ACME"),
        ]
    }

    #[test]
    fn test_truncate_content_counts_chars() {
        let mut config = LlmConfig::base_default();
        config.max_content_chars = 2;
        let client = LlmClient::new(config).unwrap();
        assert_eq!(client.truncate_content("éa"), "éa");
        assert_eq!(client.truncate_content("éèà"), "éè");
        assert_eq!(client.truncate_content("abc"), "ab");
        assert_eq!(client.truncate_content("ab"), "ab");
    }

    #[tokio::test]
    async fn test_ollama_chat_roundtrip() {
        let base = serve(Router::new().route(
            "/api/chat",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["stream"], json!(false));
                assert_eq!(body["messages"][0]["role"], json!("system"));
                assert_eq!(body["messages"][1]["content"], json!("Marque ACME"));
                Json(json!({"message": {"role": "assistant", "content": "**Titre** : Radiateur"}, "done": true}))
            }),
        ))
        .await;

        let client = LlmClient::new(LlmConfig::base_default().with_endpoint(&base)).unwrap();
        let out = client.complete("llama3.1:8b", &turns()).await.unwrap();
        assert_eq!(out, "**Titre** : Radiateur");
    }

    #[tokio::test]
    async fn test_openai_chat_roundtrip() {
        let base = serve(Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], json!("gpt-4o"));
                Json(json!({"choices": [{"message": {"role": "assistant", "content": "ok"}}]}))
            }),
        ))
        .await;

        let mut config = LlmConfig::base_default().with_endpoint(&base);
        config.provider = LlmProvider::OpenAI;
        config.api_key = Some("sk-test".to_string());
        let client = LlmClient::new(config).unwrap();
        assert_eq!(client.complete("gpt-4o", &turns()).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_http_error_is_api_error() {
        let base = serve(Router::new().route(
            "/api/chat",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;

        let client = LlmClient::new(LlmConfig::base_default().with_endpoint(&base)).unwrap();
        let err = client.complete("m", &turns()).await.unwrap_err();
        assert!(matches!(err, LlmError::Api(ref m) if m.contains("500")));
    }

    #[tokio::test]
    async fn test_disabled_fails_fast() {
        let mut config = LlmConfig::base_default().with_endpoint("http://127.0.0.1:1");
        config.enabled = false;
        let client = LlmClient::new(config).unwrap();
        assert!(matches!(
            client.complete("m", &turns()).await,
            Err(LlmError::Disabled)
        ));
        assert!(!client.is_available().await);
    }
}
