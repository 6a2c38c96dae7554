//! # Cold-Call Voice - practice call runtime
//!
//! Drives one practice call at a time: dialing and ringing, prospect speech,
//! listening windows, user-turn evaluation and the layered call timeouts.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Call Controller                         │
//! │  ┌────────────┐   ┌──────────────┐   ┌───────────────────┐   │
//! │  │ Recognizer │ → │  Turn Gate   │ → │ Progression       │   │
//! │  │ (injected) │   │ (who speaks) │   │ (coldcall-core)   │   │
//! │  └────────────┘   └──────────────┘   └───────────────────┘   │
//! │        ↑                 ↑                     ↓             │
//! │  ┌────────────┐   ┌──────────────┐   ┌───────────────────┐   │
//! │  │  TimerSet  │   │ AudioPlayer  │ ← │ Dialogue / TTS    │   │
//! │  │ (tokio)    │   │ (rodio)      │   │ (reqwest/fallback)│   │
//! │  └────────────┘   └──────────────┘   └───────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod controller;
pub mod dialogue;
pub mod error;
pub mod events;
pub mod playback;
pub mod recognizer;
pub mod timers;
pub mod tts;
pub mod turn;

pub use controller::{CallController, CallServices};
pub use dialogue::{DialogueService, OfflineDialogue, OpenRouterDialogue};
pub use error::{VoiceError, VoiceResult};
pub use events::{CallEvent, CallPhase, CallUpdate, RecognitionErrorCode, RecognizerEvent};
#[cfg(feature = "playback")]
pub use playback::RodioPlayer;
pub use playback::{AudioPlayer, PlaybackNotifier, SilentPlayer};
pub use recognizer::{ChannelRecognizer, RecognizerHandle, RecognizerSink, SpeechRecognizer};
pub use timers::{TimerKind, TimerSet};
pub use tts::{OpenAiTts, PlaceholderTts, SpeechSynthesizer};
pub use turn::TurnGate;
