//! Events consumed by the call controller and updates it publishes.

use crate::timers::TimerKind;
use coldcall_core::{CallSummary, EvaluationResult, Feedback, Stage};
use serde::Serialize;

/// Everything that can wake the controller. Processed one at a time.
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// User intercepts the ring.
    Answer,
    /// User presses hang up.
    Hangup,
    PlaybackFinished { generation: u64 },
    Recognizer(RecognizerEvent),
    TimerFired { kind: TimerKind, generation: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    Result {
        text: String,
        confidence: f32,
        is_final: bool,
    },
    Error(RecognitionErrorCode),
    /// Recognition session closed by the engine.
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorCode {
    NoSpeech,
    Aborted,
    AudioCapture,
    Network,
    NotAllowed,
    Other(String),
}

impl RecognitionErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            RecognitionErrorCode::NoSpeech => "no-speech",
            RecognitionErrorCode::Aborted => "aborted",
            RecognitionErrorCode::AudioCapture => "audio-capture",
            RecognitionErrorCode::Network => "network",
            RecognitionErrorCode::NotAllowed => "not-allowed",
            RecognitionErrorCode::Other(code) => code,
        }
    }
}

/// Call lifecycle. `Ended` is terminal for the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    Idle,
    Dialing,
    Ringing,
    Connected,
    Conversing,
    Ended,
}

impl CallPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            CallPhase::Idle => "idle",
            CallPhase::Dialing => "dialing",
            CallPhase::Ringing => "ringing",
            CallPhase::Connected => "connected",
            CallPhase::Conversing => "conversing",
            CallPhase::Ended => "ended",
        }
    }
}

/// Observer-facing notifications.
#[derive(Debug, Clone)]
pub enum CallUpdate {
    Phase(CallPhase),
    AiLine { text: String, stage: Stage },
    UserLine { text: String },
    Evaluation(EvaluationResult),
    Feedback(Feedback),
    Progress { count: u32, max: u32 },
    Listening(bool),
    /// Transient, human-readable status (reconnecting, text-only, redialing).
    Status(String),
    Ended(CallSummary),
}
