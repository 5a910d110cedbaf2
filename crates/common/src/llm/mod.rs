//! LLM client abstraction
//!
//! Every LLM-driven step in the pipeline goes through [`LlmClient`]:
//! - [`ChatCompletionsClient`] talks to any OpenAI-compatible chat endpoint (Groq by default)
//! - [`MockLlmClient`] replays scripted replies for tests and offline runs
//!
//! A failed call is an `Err`, never a panic; callers pattern-match and apply
//! their own deterministic fallback.

pub mod parse;

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One chat-style completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
            max_output_tokens,
        }
    }
}

/// Completion text returned by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
}

/// Trait for LLM completion backends
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one completion round trip
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

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
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// OpenAI-compatible chat completions client
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
    retry_budget: Duration,
}

impl ChatCompletionsClient {
    /// Create a new client; refuses to build without an API key
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::NotConfigured {
                component: "LLM client".to_string(),
            })?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            timeout,
            retry_budget: Duration::from_millis(config.retry_budget_ms),
        })
    }

    fn retry_policy(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(4),
            max_elapsed_time: Some(self.retry_budget),
            ..ExponentialBackoff::default()
        }
    }

    /// Single HTTP attempt, classified for the retry policy
    async fn attempt(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<String, backoff::Error<AppError>> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    backoff::Error::transient(AppError::LlmTimeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    })
                } else {
                    backoff::Error::transient(AppError::Llm {
                        message: format!("LLM API request failed: {}", e),
                    })
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = AppError::Llm {
                message: format!("LLM API error {}: {}", status, text),
            };
            return if status.as_u16() == 429 || status.is_server_error() {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            backoff::Error::permanent(AppError::Llm {
                message: format!("Failed to parse LLM response: {}", e),
            })
        })?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| {
                backoff::Error::permanent(AppError::Llm {
                    message: "Empty response from LLM".to_string(),
                })
            })
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let start = Instant::now();

        let this = self;
        let result = retry(self.retry_policy(), move || async move {
            this.attempt(request).await.map_err(|e| {
                if let backoff::Error::Transient { err, .. } = &e {
                    tracing::warn!(error = %err, model = %this.model, "LLM request failed, retrying");
                }
                e
            })
        })
        .await;

        metrics::record_llm_call(start.elapsed().as_secs_f64(), &self.model, result.is_ok());

        result.map(|text| Completion {
            text: text.trim().to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

type Responder = Box<dyn Fn(&CompletionRequest) -> std::result::Result<String, String> + Send + Sync>;

/// Scripted LLM for testing
///
/// Replies are served from the script first; once it is empty the optional
/// responder decides, otherwise the call fails.
#[derive(Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mock that answers every request with a function of the request
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&CompletionRequest) -> std::result::Result<String, String> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(f)),
            ..Self::default()
        }
    }

    /// A mock whose every call fails
    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::from_fn(move |_| Err(message.clone()))
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.lock_script().push_back(Ok(text.into()));
        self
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.lock_script().push_back(Err(message.into()));
        self
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<String, String>>> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        let scripted = self.lock_script().pop_front();
        let reply = match (scripted, &self.responder) {
            (Some(reply), _) => reply,
            (None, Some(responder)) => responder(request),
            (None, None) => Err("no scripted reply left".to_string()),
        };

        reply
            .map(|text| Completion { text })
            .map_err(|message| AppError::Llm { message })
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}
