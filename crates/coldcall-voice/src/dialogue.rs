//! Prospect dialogue completion.
//!
//! Remote replies are single-attempt; the controller substitutes a fallback line
//! on error, empty reply or timeout.

use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use coldcall_core::{ChatMessage, LlmConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait]
pub trait DialogueService: Send + Sync {
    /// `Ok(None)` when the service produced no usable reply.
    async fn complete(&self, messages: &[ChatMessage]) -> VoiceResult<Option<String>>;
}

/// No remote service configured; every turn uses the fallback generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineDialogue;

#[async_trait]
impl DialogueService for OfflineDialogue {
    async fn complete(&self, _messages: &[ChatMessage]) -> VoiceResult<Option<String>> {
        Ok(None)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// OpenAI-compatible chat completions (OpenRouter by default).
pub struct OpenRouterDialogue {
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenRouterDialogue {
    /// Returns `Ok(None)` when no API key is configured.
    pub fn from_config(config: &LlmConfig) -> VoiceResult<Option<Self>> {
        let Some(api_key) = config.resolve_api_key() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Dialogue(e.to_string()))?;
        Ok(Some(Self {
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        }))
    }
}

#[async_trait]
impl DialogueService for OpenRouterDialogue {
    async fn complete(&self, messages: &[ChatMessage]) -> VoiceResult<Option<String>> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "coldcall-trainer")
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Dialogue(format!("request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Dialogue(format!("API error {}: {}", status, body)));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| VoiceError::Dialogue(format!("response parse failed: {}", e)))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }
}
