//! Trainer configuration.
//!
//! Layering: built-in defaults, then an optional TOML file (`COLDCALL_CONFIG` or
//! `config/coldcall.toml`), then `COLDCALL__SECTION__KEY` environment overrides.

use crate::error::{CoreError, CoreResult};
use crate::evaluator::RubricConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/coldcall.toml";
const DEFAULT_LLM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_LLM_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_TTS_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Timer durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub ring_min_ms: u64,
    pub ring_max_ms: u64,
    /// Pause after playback before listening starts.
    pub settle_ms: u64,
    /// Rapid-fire answer window.
    pub response_timeout_ms: u64,
    pub silence_warning_ms: u64,
    pub silence_hangup_ms: u64,
    pub closing_delay_ms: u64,
    pub recognizer_retry_ms: u64,
    pub dialogue_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ring_min_ms: 3_000,
            ring_max_ms: 7_000,
            settle_ms: 500,
            response_timeout_ms: 5_000,
            silence_warning_ms: 10_000,
            silence_hangup_ms: 15_000,
            closing_delay_ms: 2_000,
            recognizer_retry_ms: 1_000,
            dialogue_timeout_ms: 8_000,
        }
    }
}

impl TimingConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn silence_warning(&self) -> Duration {
        Duration::from_millis(self.silence_warning_ms)
    }

    /// Second silence tier, measured from the warning.
    pub fn silence_grace(&self) -> Duration {
        Duration::from_millis(self.silence_hangup_ms.saturating_sub(self.silence_warning_ms))
    }

    pub fn closing_delay(&self) -> Duration {
        Duration::from_millis(self.closing_delay_ms)
    }

    pub fn recognizer_retry(&self) -> Duration {
        Duration::from_millis(self.recognizer_retry_ms)
    }

    pub fn dialogue_timeout(&self) -> Duration {
        Duration::from_millis(self.dialogue_timeout_ms)
    }
}

/// Per-call behaviour and randomness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Unprompted-hangup probability is drawn uniformly from this range once per call.
    pub hangup_probability_min: f64,
    pub hangup_probability_max: f64,
    /// Chance the first dial rings out and is retried once.
    pub no_answer_probability: f64,
    /// Repetition target in marathon and legend modes.
    pub marathon_target: u32,
    /// Transcripts below this confidence get a "didn't catch that" reply.
    pub min_confidence: f32,
    pub continuous_listening: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hangup_probability_min: 0.2,
            hangup_probability_max: 0.3,
            no_answer_probability: 0.15,
            marathon_target: 10,
            min_confidence: 0.4,
            continuous_listening: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_LLM_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key: None,
            temperature: 0.8,
            max_tokens: 120,
        }
    }
}

impl LlmConfig {
    /// Configured key, else `COLDCALL_LLM_API_KEY`, else `OPENROUTER_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| env_opt_string("COLDCALL_LLM_API_KEY"))
            .or_else(|| env_opt_string("OPENROUTER_API_KEY"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub api_url: String,
    pub model: String,
    pub voice: String,
    pub api_key: Option<String>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_TTS_URL.to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            api_key: None,
        }
    }
}

impl TtsConfig {
    /// Configured key, else `TTS_API_KEY`, else `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| env_opt_string("TTS_API_KEY"))
            .or_else(|| env_opt_string("OPENAI_API_KEY"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub timing: TimingConfig,
    pub rubric: RubricConfig,
    pub session: SessionConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub storage_path: PathBuf,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            rubric: RubricConfig::default(),
            session: SessionConfig::default(),
            llm: LlmConfig::default(),
            tts: TtsConfig::default(),
            storage_path: PathBuf::from("./data/coldcall_progress"),
        }
    }
}

impl TrainerConfig {
    /// Load from `COLDCALL_CONFIG` (or `config/coldcall.toml`) plus environment overrides.
    pub fn load() -> CoreResult<Self> {
        let path = std::env::var("COLDCALL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(path: &Path) -> CoreResult<Self> {
        let builder = config::Config::builder();
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };
        let built = builder
            .add_source(
                config::Environment::with_prefix("COLDCALL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let cfg: Self = built.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> CoreResult<Self> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CoreResult<()> {
        let t = &self.timing;
        if t.ring_min_ms > t.ring_max_ms {
            return Err(CoreError::Config(format!(
                "ring_min_ms ({}) exceeds ring_max_ms ({})",
                t.ring_min_ms, t.ring_max_ms
            )));
        }
        if t.silence_warning_ms > t.silence_hangup_ms {
            return Err(CoreError::Config(
                "silence_warning_ms must not exceed silence_hangup_ms".to_string(),
            ));
        }
        let s = &self.session;
        for (name, p) in [
            ("hangup_probability_min", s.hangup_probability_min),
            ("hangup_probability_max", s.hangup_probability_max),
            ("no_answer_probability", s.no_answer_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(CoreError::Config(format!("{name} must be within 0..=1, got {p}")));
            }
        }
        if s.hangup_probability_min > s.hangup_probability_max {
            return Err(CoreError::Config(
                "hangup_probability_min exceeds hangup_probability_max".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
