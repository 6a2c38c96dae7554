//! Per-call session state: mode, progress counters, conversation state and history.

use crate::evaluator::FailReason;
use crate::modules::{ModuleKind, TrainingModule};
use crate::stage::{ConversationState, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallMode {
    #[default]
    Practice,
    Marathon,
    Legend,
}

impl CallMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CallMode::Practice => "practice",
            CallMode::Marathon => "marathon",
            CallMode::Legend => "legend",
        }
    }

    /// Legend runs end on the first failed turn.
    pub fn ends_on_failure(self) -> bool {
        self == CallMode::Legend
    }

    /// Progress target for a module in this mode.
    pub fn max_progress(self, module: &TrainingModule, marathon_target: u32) -> u32 {
        match module.kind {
            ModuleKind::Scripted => Stage::Complete.index() as u32,
            ModuleKind::RapidFire => module.prompts.len() as u32,
            ModuleKind::Repetition => match self {
                CallMode::Practice => module.practice_target.max(1),
                CallMode::Marathon | CallMode::Legend => marathon_target.max(1),
            },
        }
    }
}

impl std::str::FromStr for CallMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "practice" => Ok(CallMode::Practice),
            "marathon" => Ok(CallMode::Marathon),
            "legend" => Ok(CallMode::Legend),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Ai,
}

/// One exchange line in the call history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub stage: Stage,
}

/// Why a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndReason {
    Success,
    EvaluationFailed { stage: Stage, reason: FailReason },
    SilenceTimeout,
    ProspectHungUp,
    UserHangup,
}

impl EndReason {
    pub fn outcome(self) -> CallOutcome {
        match self {
            EndReason::Success => CallOutcome::Passed,
            _ => CallOutcome::Failed,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            EndReason::Success => "success",
            EndReason::EvaluationFailed { .. } => "evaluation_failed",
            EndReason::SilenceTimeout => "silence_timeout",
            EndReason::ProspectHungUp => "prospect_hung_up",
            EndReason::UserHangup => "user_hangup",
        }
    }

    /// Coaching message shown for failed calls.
    pub fn coaching(self) -> Option<&'static str> {
        match self {
            EndReason::Success => None,
            EndReason::EvaluationFailed { reason, .. } => Some(reason.tip()),
            EndReason::SilenceTimeout => Some("Respond within a few seconds; silence reads as hesitation."),
            EndReason::ProspectHungUp => Some("Some prospects hang up no matter what. Dial again."),
            EndReason::UserHangup => Some("Call ended early. Finish the script to unlock the next module."),
        }
    }
}

/// User-visible result of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Passed,
    Failed,
}

/// Ephemeral state of the one active call.
#[derive(Debug, Clone)]
pub struct CallSession {
    pub call_id: Uuid,
    pub user_id: String,
    pub module_id: String,
    pub mode: CallMode,
    /// Stage index (scripted), consecutive passes (repetition) or question index (rapid-fire).
    pub progress_count: u32,
    pub max_progress: u32,
    pub started_at: DateTime<Utc>,
    started: Instant,
    pub is_active: bool,
    pub conversation: ConversationState,
    pub history: Vec<Turn>,
    pub passes: u32,
    pub timeout_skips: u32,
}

impl CallSession {
    pub fn new(user_id: &str, module: &TrainingModule, mode: CallMode, max_progress: u32) -> Self {
        let conversation = match module.kind {
            ModuleKind::Scripted => ConversationState::new(),
            _ => ConversationState::starting_at(module.focus_stage),
        };
        Self {
            call_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            module_id: module.id.to_string(),
            mode,
            progress_count: 0,
            max_progress,
            started_at: Utc::now(),
            started: Instant::now(),
            is_active: true,
            conversation,
            history: Vec::new(),
            passes: 0,
            timeout_skips: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.conversation.stage
    }

    /// Wall-clock call timer for display.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn push_turn(&mut self, speaker: Speaker, text: &str) {
        self.history.push(Turn {
            speaker,
            text: text.to_string(),
            timestamp: Utc::now(),
            stage: self.conversation.stage,
        });
    }

    pub fn summary(&self, reason: EndReason) -> CallSummary {
        CallSummary {
            call_id: self.call_id,
            user_id: self.user_id.clone(),
            module_id: self.module_id.clone(),
            mode: self.mode,
            reason,
            outcome: reason.outcome(),
            stage_reached: self.conversation.stage,
            progress_count: self.progress_count,
            max_progress: self.max_progress,
            passes: self.passes,
            timeout_skips: self.timeout_skips,
            turns: self.history.len(),
            elapsed_secs: self.elapsed().as_secs(),
            started_at: self.started_at,
            ended_at: Utc::now(),
        }
    }
}

/// Derived record of a finished call; the only part persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSummary {
    pub call_id: Uuid,
    pub user_id: String,
    pub module_id: String,
    pub mode: CallMode,
    pub reason: EndReason,
    pub outcome: CallOutcome,
    pub stage_reached: Stage,
    pub progress_count: u32,
    pub max_progress: u32,
    pub passes: u32,
    pub timeout_skips: u32,
    pub turns: usize,
    pub elapsed_secs: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}
