//! Speech synthesis backends.

use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use coldcall_core::TtsConfig;
use std::time::Duration;

/// Turns prospect text into audio bytes (WAV/MP3).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Empty bytes mean "nothing to play".
    async fn synthesize(&self, text: &str, voice_id: &str) -> VoiceResult<Vec<u8>>;
}

/// On-device stand-in: returns empty audio so the line is shown as text only.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderTts;

#[async_trait]
impl SpeechSynthesizer for PlaceholderTts {
    async fn synthesize(&self, _text: &str, _voice_id: &str) -> VoiceResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// OpenAI-compatible `/audio/speech` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiTts {
    api_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiTts {
    /// Key from config, falling back to `TTS_API_KEY` / `OPENAI_API_KEY`.
    pub fn from_config(config: &TtsConfig) -> VoiceResult<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            VoiceError::Config("TTS requires tts.api_key, TTS_API_KEY, or OPENAI_API_KEY".to_string())
        })?;
        Self::new(&config.api_url, api_key, &config.model)
    }

    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiTts {
    async fn synthesize(&self, text: &str, voice_id: &str) -> VoiceResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": voice_id,
        });
        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Tts(format!("TTS API error {}: {}", status, body)));
        }
        let bytes = res.bytes().await.map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
