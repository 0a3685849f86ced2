//! Chat completion client for the Groq OpenAI-compatible API.
//!

use crate::core::errors::ServiceError;
use crate::core::traits::CompletionClient;
use crate::infrastructure::entities;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;

const GROQ_API_KEY: &str = "GROQ_API_KEY";
const GROQ_API_URL: &str = "GROQ_API_URL";
const GROQ_MODEL: &str = "GROQ_MODEL";

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl From<entities::Message> for ChatMessage {
    fn from(m: entities::Message) -> Self {
        Self {
            content: m.content,
            role: match m.sender {
                entities::Sender::User => Role::User,
                entities::Sender::Assistant => Role::Assistant,
            },
        }
    }
}

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    /// Falls back to the configured default model.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Credentials and endpoint of the completion provider.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub api_url: String,
    pub default_model: String,
}

impl CompletionConfig {
    pub fn from_env() -> Result<Self, ServiceError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any variable source; fails when the API key is absent or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(GROQ_API_KEY)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ServiceError::Configuration(format!("{GROQ_API_KEY} is not set")))?;

        Ok(Self {
            api_key,
            api_url: lookup(GROQ_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            default_model: lookup(GROQ_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        })
    }
}

#[derive(Debug, Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    #[serde(default)]
    choices: Vec<GroqChoice>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: Option<GroqResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct GroqResponseMessage {
    content: Option<String>,
}

pub struct GroqCompletionClient {
    client: Client,
    config: Ref<CompletionConfig>,
}

#[injectable(CompletionClient)]
impl GroqCompletionClient {
    #[inject]
    pub fn create(config: Ref<CompletionConfig>) -> GroqCompletionClient {
        GroqCompletionClient {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CompletionClient for GroqCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, ServiceError> {
        let model = options
            .model
            .as_deref()
            .unwrap_or(self.config.default_model.as_str());

        debug!("requesting completion from {model} with {} messages", messages.len());

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&GroqRequest {
                model,
                messages,
                temperature: options.temperature,
                max_tokens: options.max_tokens,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("completion API returned {status}: {body}");
            return Err(ServiceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GroqResponse = serde_json::from_str(&body)
            .map_err(|e| ServiceError::Protocol(format!("malformed response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ServiceError::Protocol("missing choices[0].message.content".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn config_requires_api_key() {
        let result = CompletionConfig::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(ServiceError::Configuration(_))));

        let result = CompletionConfig::from_lookup(lookup(&[(GROQ_API_KEY, "")]));
        assert!(matches!(result, Err(ServiceError::Configuration(_))));
    }

    #[test]
    fn config_defaults_endpoint_and_model() {
        let config = CompletionConfig::from_lookup(lookup(&[(GROQ_API_KEY, "key")])).unwrap();
        assert_eq!(config.api_key, "key");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.default_model, DEFAULT_MODEL);
    }

    #[test]
    fn options_default_to_groq_settings() {
        let options = CompletionOptions::default();
        assert_eq!(options.model, None);
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.max_tokens, 1024);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::system("be nice")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "be nice"}));
    }
}
