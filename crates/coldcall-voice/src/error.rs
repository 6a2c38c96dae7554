//! Error types for the call runtime

use coldcall_core::CoreError;
use thiserror::Error;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur while running a practice call
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("A call is already active")]
    CallActive,

    #[error("No active call")]
    NoActiveCall,

    #[error("Access denied: {user_id} has not unlocked {module_id}")]
    AccessDenied { user_id: String, module_id: String },

    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Invalid call phase: {0}")]
    InvalidPhase(String),

    #[error("Turn conflict: {0}")]
    TurnConflict(String),

    #[error("Channel send error: {0}")]
    ChannelSend(String),

    #[error("Channel receive error: {0}")]
    ChannelReceive(String),

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Recognizer error: {0}")]
    Recognizer(String),

    #[error("Dialogue service error: {0}")]
    Dialogue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
