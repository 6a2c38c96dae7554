//! # Cold-Call Trainer Core
//!
//! Pure domain logic for the cold-call practice simulator: the rubric evaluator,
//! the conversation stage machine, module progression, canned fallback lines,
//! prompt building, configuration and per-user progress.
//!
//! ```text
//! user text ──► ResponseEvaluator ──► Progression ──► TurnOutcome
//!                                        │
//!                                  StageMachine (scripted)
//! ```
//!
//! Nothing here performs audio or network I/O; see `coldcall-voice` for the runtime.

pub mod access;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod fallback;
pub mod modules;
pub mod progress;
pub mod progression;
pub mod prompts;
pub mod session;
pub mod stage;

pub use access::{AccessControl, AccessLevel, AllowAll, ProgressGatedAccess};
pub use config::{LlmConfig, SessionConfig, TimingConfig, TrainerConfig, TtsConfig};
pub use error::{CoreError, CoreResult};
pub use evaluator::{
    EvaluationResult, FailReason, LenientEvaluator, ResponseEvaluator, RubricCheck, RubricConfig,
    RubricEvaluator,
};
pub use fallback::{annotate, split_feedback, FallbackGenerator, Feedback, FeedbackKind};
pub use modules::{find_module, ModuleKind, TrainingModule, CATALOG};
pub use progress::{
    InMemoryProgressStore, ModuleProgress, ProgressState, ProgressStore, SledProgressStore,
};
pub use progression::{Progression, TurnOutcome};
pub use prompts::{build_messages, build_system_prompt, ChatMessage};
pub use session::{CallMode, CallOutcome, CallSession, CallSummary, EndReason, Speaker, Turn};
pub use stage::{
    transition, ConversationState, Stage, StageDecision, StageMachine, Transition, Verdict,
};
