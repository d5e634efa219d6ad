//! ChatClient — calls the reasoning service over HTTP.
//!
//! Two wire dialects are supported:
//!
//! - `openai`    — `POST {base_url}/chat/completions`, bearer auth
//! - `anthropic` — `POST {base_url}/v1/messages`, `x-api-key` auth
//!
//! Every role (analyst, researcher, architect, judges) is one single-shot
//! call: a system prompt plus one user message, text back.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::StepError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for the reasoning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Adapter type: "openai" or "anthropic"
    pub adapter: String,
    /// API base URL
    pub base_url: String,
    /// API key; skipped when the config is written back out
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Model ID
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            adapter: "openai".to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 8192,
            temperature: None,
            request_timeout_secs: 300,
        }
    }
}

/// Text plus accounting from one completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<UsageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageInfo {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, config }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Send one system + user exchange and return the reply text.
    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<ChatResponse, StepError> {
        match self.config.adapter.as_str() {
            "openai" | "openai-compatible" => self.call_openai_compatible(system_prompt, user_prompt).await,
            "anthropic" | "claude" => self.call_anthropic_compatible(system_prompt, user_prompt).await,
            other => Err(StepError::Transport(format!("Unknown adapter type: '{}'", other))),
        }
    }

    /// POST {base_url}/chat/completions
    async fn call_openai_compatible(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<ChatResponse, StepError> {
        let config = &self.config;
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        let mut messages = vec![];
        if !system_prompt.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system_prompt
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": user_prompt
        }));

        let mut body = serde_json::json!({
            "model": config.model,
            "messages": messages
        });
        apply_temperature(&mut body, config.temperature);

        tracing::info!("[ChatClient] Calling OpenAI-compatible API: {} (model: {})", url, config.model);

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("content-type", "application/json")
            .json(&body);
        let json = send(request).await?;

        let content = json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| StepError::Schema("API returned no message content".to_string()))?
            .to_string();

        let usage = json.get("usage").map(|u| UsageInfo {
            input_tokens: u
                .get("prompt_tokens")
                .or_else(|| u.get("input_tokens"))
                .and_then(|v| v.as_u64()),
            output_tokens: u
                .get("completion_tokens")
                .or_else(|| u.get("output_tokens"))
                .and_then(|v| v.as_u64()),
        });

        Ok(ChatResponse {
            content,
            model: response_model(&json, &config.model),
            usage,
        })
    }

    /// POST {base_url}/v1/messages
    async fn call_anthropic_compatible(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<ChatResponse, StepError> {
        let config = &self.config;
        let url = format!("{}/v1/messages", config.base_url.trim_end_matches('/'));

        let mut body = serde_json::json!({
            "model": config.model,
            "max_tokens": config.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": user_prompt
                }
            ]
        });
        if !system_prompt.is_empty() {
            body["system"] = serde_json::Value::String(system_prompt.to_string());
        }
        apply_temperature(&mut body, config.temperature);

        tracing::info!("[ChatClient] Calling Anthropic-compatible API: {} (model: {})", url, config.model);

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body);
        let json = send(request).await?;

        let content = json
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|arr| {
                arr.iter()
                    .filter_map(|block| {
                        if block.get("type").and_then(|t| t.as_str()) == Some("text") {
                            block.get("text").and_then(|t| t.as_str()).map(|s| s.to_string())
                        } else {
                            None
                        }
                    })
                    .reduce(|a, b| format!("{}\n{}", a, b))
            })
            .ok_or_else(|| StepError::Schema("API returned no text blocks".to_string()))?;

        let usage = json.get("usage").map(|u| UsageInfo {
            input_tokens: u.get("input_tokens").and_then(|v| v.as_u64()),
            output_tokens: u.get("output_tokens").and_then(|v| v.as_u64()),
        });

        Ok(ChatResponse {
            content,
            model: response_model(&json, &config.model),
            usage,
        })
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<serde_json::Value, StepError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            StepError::Transport(format!("HTTP request timed out: {}", e))
        } else {
            StepError::Transport(format!("HTTP request failed: {}", e))
        }
    })?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .map_err(|e| StepError::Transport(format!("Failed to read response body: {}", e)))?;

    if !status.is_success() {
        return Err(StepError::Api {
            status: status.as_u16(),
            message: api_error_message(&response_text),
        });
    }

    serde_json::from_str(&response_text)
        .map_err(|e| StepError::Schema(format!("Failed to parse response JSON: {}", e)))
}

fn apply_temperature(body: &mut serde_json::Value, temperature: Option<f64>) {
    if let Some(temp) = temperature {
        body["temperature"] = serde_json::Value::Number(
            serde_json::Number::from_f64(temp).unwrap_or_else(|| serde_json::Number::from(0)),
        );
    }
}

fn response_model(json: &serde_json::Value, fallback: &str) -> String {
    json.get("model")
        .and_then(|m| m.as_str())
        .unwrap_or(fallback)
        .to_string()
}

/// Both dialects wrap errors as `{"error": {"message": ...}}`; fall back to
/// the raw body otherwise.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.trim().to_string())
}
