//! Conversation stages and the stage machine for the scripted cold-call module.
//!
//! Stages advance through a fixed order. A failed turn never rewinds the stage;
//! it terminates the call with a stage-specific rejection.

use crate::evaluator::{EvaluationResult, FailReason};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// A discrete phase of the cold-call script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Caller introduces themselves and asks for a moment.
    #[default]
    Opener,
    /// Prospect pushes back; caller must defuse the objection.
    Objection,
    /// Caller delivers a short value pitch.
    Pitch,
    /// Caller asks discovery questions and requests a meeting.
    Discovery,
    /// Script finished.
    Complete,
}

impl Stage {
    /// Fixed progression order.
    pub const SEQUENCE: [Stage; 5] = [
        Stage::Opener,
        Stage::Objection,
        Stage::Pitch,
        Stage::Discovery,
        Stage::Complete,
    ];

    /// Position in [`Stage::SEQUENCE`].
    pub fn index(self) -> usize {
        match self {
            Stage::Opener => 0,
            Stage::Objection => 1,
            Stage::Pitch => 2,
            Stage::Discovery => 3,
            Stage::Complete => 4,
        }
    }

    pub fn next(self) -> Option<Stage> {
        Self::SEQUENCE.get(self.index() + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Complete
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Opener => "opener",
            Stage::Objection => "objection",
            Stage::Pitch => "pitch",
            Stage::Discovery => "discovery",
            Stage::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary outcome of one evaluated turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl From<&EvaluationResult> for Verdict {
    fn from(result: &EvaluationResult) -> Self {
        if result.pass {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}

/// Entry of the `(stage, verdict) -> transition` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advance(Stage),
    Stay,
    Terminate,
}

/// The transition table for the scripted module.
pub fn transition(stage: Stage, verdict: Verdict) -> Transition {
    match (stage, verdict) {
        (Stage::Complete, _) => Transition::Stay,
        (Stage::Opener, Verdict::Pass) => Transition::Advance(Stage::Objection),
        (Stage::Objection, Verdict::Pass) => Transition::Advance(Stage::Pitch),
        (Stage::Pitch, Verdict::Pass) => Transition::Advance(Stage::Discovery),
        (Stage::Discovery, Verdict::Pass) => Transition::Advance(Stage::Complete),
        (_, Verdict::Fail) => Transition::Terminate,
    }
}

/// Per-call conversation progress. Reset at the start of every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConversationState {
    pub stage: Stage,
    pub opener_delivered: bool,
    pub objection_handled: bool,
    pub pitch_delivered: bool,
    pub meeting_requested: bool,
    /// Objections raised by the prospect so far.
    pub objection_count: u32,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state pinned to a single focus stage (repetition and drill modules).
    pub fn starting_at(stage: Stage) -> Self {
        Self {
            stage,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn mark_passed(&mut self, stage: Stage) {
        match stage {
            Stage::Opener => self.opener_delivered = true,
            Stage::Objection => self.objection_handled = true,
            Stage::Pitch => self.pitch_delivered = true,
            Stage::Discovery => self.meeting_requested = true,
            Stage::Complete => {}
        }
    }
}

/// What the controller should do after a scripted turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageDecision {
    Advance { from: Stage, to: Stage },
    Complete,
    Fail { stage: Stage, reason: FailReason },
    /// Prospect hangs up right after a passing opener.
    UnpromptedHangup,
}

/// Applies evaluation verdicts to a [`ConversationState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StageMachine {
    hangup_after_opener: bool,
}

impl StageMachine {
    /// `hangup_after_opener` is sampled once per call by the caller.
    pub fn new(hangup_after_opener: bool) -> Self {
        Self { hangup_after_opener }
    }

    pub fn hangs_up_after_opener(&self) -> bool {
        self.hangup_after_opener
    }

    pub fn apply(&self, state: &mut ConversationState, result: &EvaluationResult) -> StageDecision {
        let from = state.stage;
        match transition(from, Verdict::from(result)) {
            Transition::Stay => StageDecision::Complete,
            Transition::Terminate => StageDecision::Fail {
                stage: from,
                reason: result.fail_reason.unwrap_or(FailReason::BelowThreshold),
            },
            Transition::Advance(to) => {
                debug_assert!(to > from);
                state.mark_passed(from);
                state.stage = to;
                if to == Stage::Objection {
                    state.objection_count += 1;
                }
                debug!(%from, %to, "stage advanced");

                if from == Stage::Opener && self.hangup_after_opener {
                    StageDecision::UnpromptedHangup
                } else if to.is_terminal() {
                    StageDecision::Complete
                } else {
                    StageDecision::Advance { from, to }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passed() -> EvaluationResult {
        EvaluationResult::passed(4, Vec::new())
    }

    #[test]
    fn table_advances_in_fixed_order() {
        assert_eq!(transition(Stage::Opener, Verdict::Pass), Transition::Advance(Stage::Objection));
        assert_eq!(transition(Stage::Discovery, Verdict::Pass), Transition::Advance(Stage::Complete));
        assert_eq!(transition(Stage::Pitch, Verdict::Fail), Transition::Terminate);
        assert_eq!(transition(Stage::Complete, Verdict::Fail), Transition::Stay);
    }

    #[test]
    fn stage_index_never_decreases() {
        let machine = StageMachine::new(false);
        let mut state = ConversationState::new();
        let mut last = state.stage.index();
        for _ in 0..6 {
            machine.apply(&mut state, &passed());
            assert!(state.stage.index() >= last);
            last = state.stage.index();
        }
        assert_eq!(state.stage, Stage::Complete);
        assert!(state.opener_delivered && state.objection_handled);
        assert!(state.pitch_delivered && state.meeting_requested);
        assert_eq!(state.objection_count, 1);
    }

    #[test]
    fn failure_keeps_stage_and_terminates() {
        let machine = StageMachine::new(false);
        let mut state = ConversationState::new();
        machine.apply(&mut state, &passed());

        let failed = EvaluationResult::failed(FailReason::PushyPhrasing, 1, Vec::new());
        let decision = machine.apply(&mut state, &failed);

        assert_eq!(
            decision,
            StageDecision::Fail {
                stage: Stage::Objection,
                reason: FailReason::PushyPhrasing
            }
        );
        assert_eq!(state.stage, Stage::Objection);
    }

    #[test]
    fn unprompted_hangup_only_after_opener() {
        let machine = StageMachine::new(true);
        let mut state = ConversationState::new();
        assert_eq!(machine.apply(&mut state, &passed()), StageDecision::UnpromptedHangup);

        let mut later = ConversationState::starting_at(Stage::Objection);
        assert!(matches!(
            machine.apply(&mut later, &passed()),
            StageDecision::Advance { from: Stage::Objection, to: Stage::Pitch }
        ));
    }
}
