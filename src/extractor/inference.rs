//! Inference service interface and the Ollama adapter
//!
//! Requests are non-streaming: the whole completion comes back in one JSON
//! body.
//!
//! | Mode | Endpoint | Prompt field | Completion field |
//! |------|----------|--------------|------------------|
//! | `chat` | `/api/chat` | `messages[0].content` | `message.content` |
//! | `generate` | `/api/generate` | `prompt` | `response` |

use crate::config::{ExtractorConfig, InferenceMode};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the inference service
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference request failed: {0}")]
    Network(String),

    #[error("Inference service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed inference response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            InferenceError::MalformedResponse(err.to_string())
        } else {
            InferenceError::Network(err.to_string())
        }
    }
}

/// A generative model that turns a prompt into text
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Runs one completion and returns the model's raw text
    async fn infer(&self, prompt: &str) -> Result<String, InferenceError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestBody<'a> {
    Chat {
        model: &'a str,
        messages: [ChatMessage<'a>; 1],
        stream: bool,
    },
    Generate {
        model: &'a str,
        prompt: &'a str,
        stream: bool,
    },
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama HTTP client
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    token: Option<String>,
    mode: InferenceMode,
}

impl OllamaClient {
    /// Builds a client from the extractor settings
    ///
    /// # Arguments
    ///
    /// * `config` - Server address, port, model, token and mode
    ///
    /// # Returns
    ///
    /// * `Ok(OllamaClient)` - Client ready to send requests
    /// * `Err(InferenceError)` - The HTTP client could not be built
    pub fn new(config: &ExtractorConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let path = match config.mode {
            InferenceMode::Chat => "/api/chat",
            InferenceMode::Generate => "/api/generate",
        };
        let endpoint = format!(
            "{}{}",
            base_url(&config.server_address, config.server_port),
            path
        );

        tracing::debug!("Inference endpoint: {} (model {})", endpoint, config.model);

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            mode: config.mode,
        })
    }

    /// Full URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn body<'a>(&'a self, prompt: &'a str) -> RequestBody<'a> {
        match self.mode {
            InferenceMode::Chat => RequestBody::Chat {
                model: &self.model,
                messages: [ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                stream: false,
            },
            InferenceMode::Generate => RequestBody::Generate {
                model: &self.model,
                prompt,
                stream: false,
            },
        }
    }
}

#[async_trait]
impl InferenceService for OllamaClient {
    async fn infer(&self, prompt: &str) -> Result<String, InferenceError> {
        let mut request = self.client.post(&self.endpoint).json(&self.body(prompt));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                tracing::error!(
                    "Inference service rejected credentials ({}); check LLM_CLIENT_TOKEN",
                    status.as_u16()
                );
            }
            let message = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = match self.mode {
            InferenceMode::Chat => response.json::<ChatResponse>().await?.message.content,
            InferenceMode::Generate => response.json::<GenerateResponse>().await?.response,
        };

        Ok(text)
    }
}

/// Joins address and port, adding `http://` when no scheme is given
fn base_url(address: &str, port: Option<u16>) -> String {
    let address = address.trim().trim_end_matches('/');
    let address = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };

    match port {
        Some(port) => format!("{}:{}", address, port),
        None => address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, mode: InferenceMode) -> ExtractorConfig {
        ExtractorConfig {
            server_address: server.uri(),
            server_port: None,
            mode,
            ..ExtractorConfig::default()
        }
    }

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("localhost", Some(11434)), "http://localhost:11434");
        assert_eq!(base_url("http://gpu-box/", None), "http://gpu-box");
        assert_eq!(
            base_url("https://llm.example.com", Some(8443)),
            "https://llm.example.com:8443"
        );
    }

    #[test]
    fn test_endpoint_by_mode() {
        let mut config = ExtractorConfig {
            server_address: "localhost".to_string(),
            server_port: Some(11434),
            ..ExtractorConfig::default()
        };
        assert_eq!(
            OllamaClient::new(&config).unwrap().endpoint(),
            "http://localhost:11434/api/chat"
        );

        config.mode = InferenceMode::Generate;
        assert_eq!(
            OllamaClient::new(&config).unwrap().endpoint(),
            "http://localhost:11434/api/generate"
        );
    }

    #[tokio::test]
    async fn test_chat_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "llama3:8b",
                "stream": false,
                "messages": [{ "role": "user", "content": "hello" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3:8b",
                "message": { "role": "assistant", "content": "{\"address\": \"x\"}" },
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(&server, InferenceMode::Chat)).unwrap();
        assert_eq!(client.infer("hello").await.unwrap(), "{\"address\": \"x\"}");
    }

    #[tokio::test]
    async fn test_generate_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({ "prompt": "hello", "stream": false })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "done", "done": true })),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(&server, InferenceMode::Generate)).unwrap();
        assert_eq!(client.infer("hello").await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_bearer_token_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "message": { "content": "ok" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = ExtractorConfig {
            token: Some("secret".to_string()),
            ..config_for(&server, InferenceMode::Chat)
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.infer("hi").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(&server, InferenceMode::Chat)).unwrap();
        match client.infer("hi").await {
            Err(InferenceError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "forbidden");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unexpected_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "?" })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(&server, InferenceMode::Chat)).unwrap();
        assert!(matches!(
            client.infer("hi").await,
            Err(InferenceError::MalformedResponse(_))
        ));
    }
}
