use crate::error::QueryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// The generation side of the pipeline. Implementations produce raw model
/// output for a fully assembled prompt; cleanup happens downstream.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, QueryError>;
}

/// Read the API key from a plaintext file, trimming surrounding whitespace.
pub fn load_api_key(path: &Path) -> Result<String, QueryError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|_| QueryError::MissingApiKey(path.display().to_string()))?;

    let key = raw.trim().to_string();
    if key.is_empty() {
        return Err(QueryError::MissingApiKey(path.display().to_string()));
    }
    Ok(key)
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// OpenAI-compatible chat-completions client. One request per answer, one
/// timeout per request, no retries; a failed call is fatal to the query
/// that made it.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl ChatCompletionsClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, QueryError> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint)?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            temperature: 0.2,
        })
    }
}

fn first_choice(response: ChatResponse) -> Result<String, QueryError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| QueryError::BackendResponse {
            backend: "llm".to_string(),
            details: "response has no choices".to_string(),
        })
}

#[async_trait]
impl AnswerGenerator for ChatCompletionsClient {
    async fn generate(&self, prompt: &str) -> Result<String, QueryError> {
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&payload);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(QueryError::BackendResponse {
                backend: "llm".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        first_choice(parsed)
    }
}
