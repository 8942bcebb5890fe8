use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::error::FillError;

/// A text-completion endpoint.
pub trait CompletionService {
    fn complete(&self, prompt: &str, max_tokens: u32, model: &str) -> Result<String, FillError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Ollama,
}

impl Provider {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
            Provider::Ollama => "http://localhost:11434/api/generate",
        }
    }

    pub fn needs_credential(&self) -> bool {
        matches!(self, Provider::OpenAi)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => f.write_str("openai"),
            Provider::Ollama => f.write_str("ollama"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = FillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "ollama" => Ok(Provider::Ollama),
            other => Err(FillError::Config(format!("unknown provider '{}'", other))),
        }
    }
}

// ============================================================================
// OpenAI-compatible chat completions
// ============================================================================

pub struct OpenAiBackend {
    pub endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiBackend {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    // Reasoning models take `max_completion_tokens` instead of `max_tokens`.
    fn is_reasoning_model(model: &str) -> bool {
        model.starts_with('o') && model.chars().nth(1).is_some_and(|c| c.is_ascii_digit())
    }
}

impl CompletionService for OpenAiBackend {
    fn complete(&self, prompt: &str, max_tokens: u32, model: &str) -> Result<String, FillError> {
        let reasoning = Self::is_reasoning_model(model);
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: (!reasoning).then_some(max_tokens),
            max_completion_tokens: reasoning.then_some(max_tokens),
        };

        debug!(endpoint = %self.endpoint, model, max_tokens, "sending chat completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| FillError::Http {
                endpoint: self.endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FillError::ApiStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().map_err(|e| FillError::Http {
            endpoint: self.endpoint.clone(),
            source: e,
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| FillError::EmptyCompletion(self.endpoint.clone()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Ollama generate
// ============================================================================

pub struct OllamaBackend {
    pub endpoint: String,
    client: reqwest::blocking::Client,
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new(Provider::Ollama.default_endpoint())
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl CompletionService for OllamaBackend {
    fn complete(&self, prompt: &str, max_tokens: u32, model: &str) -> Result<String, FillError> {
        let request = OllamaRequest {
            model,
            prompt,
            stream: false,
            options: OllamaOptions {
                num_predict: max_tokens,
            },
        };

        debug!(endpoint = %self.endpoint, model, "sending ollama generate");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| FillError::Http {
                endpoint: self.endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FillError::ApiStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let parsed: OllamaResponse = response.json().map_err(|e| FillError::Http {
            endpoint: self.endpoint.clone(),
            source: e,
        })?;

        let text = parsed.response.trim().to_string();
        if text.is_empty() {
            return Err(FillError::EmptyCompletion(self.endpoint.clone()));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

// ============================================================================
// Mock (tests and offline runs)
// ============================================================================

/// One request seen by `MockCompletion`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPrompt {
    pub prompt: String,
    pub max_tokens: u32,
    pub model: String,
}

/// Replies from a script, in order; an exhausted script fails like an
/// unreachable endpoint.
#[derive(Debug, Default)]
pub struct MockCompletion {
    replies: RefCell<VecDeque<Result<String, String>>>,
    prompts: RefCell<Vec<RecordedPrompt>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for reply in replies {
            mock.push_reply(reply);
        }
        mock
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.borrow_mut().push_back(Ok(reply.into()));
    }

    /// Queue a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies.borrow_mut().push_back(Err(message.into()));
    }

    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        self.prompts.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl CompletionService for MockCompletion {
    fn complete(&self, prompt: &str, max_tokens: u32, model: &str) -> Result<String, FillError> {
        self.prompts.borrow_mut().push(RecordedPrompt {
            prompt: prompt.to_string(),
            max_tokens,
            model: model.to_string(),
        });

        match self.replies.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(body)) => Err(FillError::ApiStatus {
                endpoint: "mock".to_string(),
                status: 503,
                body,
            }),
            None => Err(FillError::EmptyCompletion("mock".to_string())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Backend for `provider`. OpenAI needs a credential; Ollama runs without.
pub fn build_completion_service(
    provider: Provider,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Box<dyn CompletionService>, FillError> {
    let endpoint = endpoint.unwrap_or(provider.default_endpoint());
    match provider {
        Provider::OpenAi => {
            let key = api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .ok_or_else(|| FillError::MissingCredential {
                    provider: provider.to_string(),
                })?;
            Ok(Box::new(OpenAiBackend::new(endpoint, key)))
        }
        Provider::Ollama => Ok(Box::new(OllamaBackend::new(endpoint))),
    }
}
