//! Completion client - turns a grounded prompt into an answer
//!
//! Speaks the OpenAI `/chat/completions` protocol, which LM Studio, vLLM,
//! llama.cpp server and OpenAI itself all accept. Requests are always
//! non-streaming so a call yields exactly one answer string.

use crate::config::GenerationConfig;
use crate::context::Context;
use crate::embeddings::excerpt;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Backend name used in errors and metrics
const BACKEND: &str = "generation";

/// Output token budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxTokens {
    Limit(u32),
    /// Let the backend decide; sent as `-1`
    Unbounded,
}

impl Serialize for MaxTokens {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MaxTokens::Limit(n) => serializer.serialize_i64(i64::from(*n)),
            MaxTokens::Unbounded => serializer.serialize_i64(-1),
        }
    }
}

/// Sampling parameters applied to every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: MaxTokens,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: MaxTokens::Unbounded,
        }
    }
}

impl From<&GenerationConfig> for GenerationParams {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens(),
        }
    }
}

/// Everything the generator needs for one question
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_instruction: String,
    pub context: Context,
    pub question: String,
    pub params: GenerationParams,
}

impl CompletionRequest {
    /// Streaming is never requested; callers always get a single answer
    pub fn stream(&self) -> bool {
        false
    }

    /// The user turn: retrieved context followed by the question
    pub fn user_message(&self) -> String {
        format!("Context:\n{}\n\nQuestion: {}", self.context, self.question)
    }
}

/// Generated answer text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answer(String);

impl Answer {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for text generation backends
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer for the request
    async fn complete(&self, request: &CompletionRequest) -> Result<Answer>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: MaxTokens,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Client for any endpoint speaking the OpenAI chat completions protocol
pub struct ChatCompletionClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    timeout: Duration,
}

impl ChatCompletionClient {
    /// Create a new client from configuration
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            timeout: config.timeout(),
        })
    }

    async fn call_llm(&self, request: &CompletionRequest) -> Result<Answer> {
        let timeout_ms = self.timeout.as_millis() as u64;
        let user_message = request.user_message();

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &user_message,
                },
            ],
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
            stream: request.stream(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(endpoint = %self.endpoint, "Sending completion request");
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::from_transport(BACKEND, timeout_ms, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Backend {
                backend: BACKEND.to_string(),
                status: Some(status.as_u16()),
                message: format!("API error {}: {}", status, excerpt(&body)),
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::from_transport(BACKEND, timeout_ms, e))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| Answer::new(c.message.content))
            .ok_or_else(|| AppError::Protocol {
                backend: BACKEND.to_string(),
                message: "Empty choices in response".to_string(),
            })
    }
}

#[async_trait]
impl Generator for ChatCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Answer> {
        let start = Instant::now();
        let result = self.call_llm(request).await;
        metrics::record_generation(start.elapsed().as_secs_f64(), &self.model, result.is_ok());

        if let Err(e) = &result {
            tracing::warn!(model = %self.model, error = %e, "Completion request failed");
        }
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Offline generator for development: echoes the question and context size
pub struct MockGenerator;

#[async_trait]
impl Generator for MockGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<Answer> {
        Ok(Answer::new(format!(
            "[mock] {} ({} characters of context)",
            request.question,
            request.context.as_str().len()
        )))
    }

    fn model_name(&self) -> &str {
        "mock-generation"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(ChatCompletionClient::new(config)?)),
        "mock" => {
            tracing::warn!("Using mock generation provider");
            Ok(Arc::new(MockGenerator))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown generation provider: {}", other),
        }),
    }
}
