//! Module-level progress decisions after each user turn.
//!
//! Scripted modules delegate to the [`StageMachine`]; repetition and rapid-fire
//! modules count passes and questions instead of walking the stage sequence.

use crate::evaluator::{
    EvaluationResult, FailReason, LenientEvaluator, ResponseEvaluator, RubricConfig, RubricEvaluator,
};
use crate::fallback::FeedbackKind;
use crate::modules::{ModuleKind, TrainingModule};
use crate::session::{CallMode, CallSession};
use crate::stage::{Stage, StageDecision, StageMachine};
use tracing::debug;

/// What the call should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Conversation continues with the prospect's next line.
    Continue { feedback: FeedbackKind },
    /// Prospect rejects the caller; the call ends after the rejection line.
    Rejected { stage: Stage, reason: FailReason },
    /// Prospect hangs up regardless of the caller's performance.
    ProspectHangup,
    /// Module target reached.
    Completed,
}

pub struct Progression {
    module: &'static TrainingModule,
    mode: CallMode,
    machine: StageMachine,
    evaluator: Box<dyn ResponseEvaluator>,
}

impl Progression {
    pub fn new(
        module: &'static TrainingModule,
        mode: CallMode,
        rubric: RubricConfig,
        hangup_after_opener: bool,
    ) -> Self {
        let evaluator: Box<dyn ResponseEvaluator> = match module.kind {
            ModuleKind::Scripted => Box::new(RubricEvaluator::new(rubric)),
            ModuleKind::Repetition | ModuleKind::RapidFire => Box::new(LenientEvaluator::new(
                module.min_words,
                rubric.max_words,
                module.keywords,
            )),
        };
        Self {
            module,
            mode,
            machine: StageMachine::new(hangup_after_opener && module.kind == ModuleKind::Scripted),
            evaluator,
        }
    }

    /// Replace the heuristic classifier without touching the stage logic.
    pub fn with_evaluator(mut self, evaluator: Box<dyn ResponseEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn module(&self) -> &'static TrainingModule {
        self.module
    }

    pub fn kind(&self) -> ModuleKind {
        self.module.kind
    }

    pub fn mode(&self) -> CallMode {
        self.mode
    }

    pub fn hangs_up_after_opener(&self) -> bool {
        self.machine.hangs_up_after_opener()
    }

    /// Drill question at the current index (rapid-fire only).
    pub fn current_prompt(&self, session: &CallSession) -> Option<&'static str> {
        if self.module.kind != ModuleKind::RapidFire {
            return None;
        }
        self.module.prompts.get(session.progress_count as usize).copied()
    }

    pub fn on_user_turn(&self, session: &mut CallSession, text: &str) -> (EvaluationResult, TurnOutcome) {
        let stage = session.stage();
        let result = self.evaluator.evaluate(text, stage);
        if result.pass {
            session.passes += 1;
        }
        debug!(
            module = self.module.id,
            %stage,
            pass = result.pass,
            pass_count = result.pass_count,
            "turn evaluated"
        );

        let outcome = match self.module.kind {
            ModuleKind::Scripted => {
                let decision = self.machine.apply(&mut session.conversation, &result);
                session.progress_count = session.stage().index() as u32;
                match decision {
                    StageDecision::Advance { .. } => TurnOutcome::Continue {
                        feedback: FeedbackKind::Success,
                    },
                    StageDecision::Complete => TurnOutcome::Completed,
                    StageDecision::Fail { stage, reason } => TurnOutcome::Rejected { stage, reason },
                    StageDecision::UnpromptedHangup => TurnOutcome::ProspectHangup,
                }
            }
            ModuleKind::Repetition => {
                if result.pass {
                    session.progress_count += 1;
                    self.completed_or(session, FeedbackKind::Success)
                } else if self.mode.ends_on_failure() {
                    self.rejected(stage, &result)
                } else {
                    session.progress_count = 0;
                    TurnOutcome::Continue {
                        feedback: FeedbackKind::Retry,
                    }
                }
            }
            ModuleKind::RapidFire => {
                if !result.pass && self.mode.ends_on_failure() {
                    self.rejected(stage, &result)
                } else {
                    session.progress_count += 1;
                    let feedback = if result.pass {
                        FeedbackKind::Success
                    } else {
                        FeedbackKind::Retry
                    };
                    self.completed_or(session, feedback)
                }
            }
        };
        (result, outcome)
    }

    /// No answer within the response window: skip the question without evaluating.
    pub fn on_response_timeout(&self, session: &mut CallSession) -> TurnOutcome {
        session.timeout_skips += 1;
        session.progress_count += 1;
        debug!(
            module = self.module.id,
            index = session.progress_count,
            "response timeout, question skipped"
        );
        self.completed_or(session, FeedbackKind::Retry)
    }

    fn completed_or(&self, session: &CallSession, feedback: FeedbackKind) -> TurnOutcome {
        if session.progress_count >= session.max_progress {
            TurnOutcome::Completed
        } else {
            TurnOutcome::Continue { feedback }
        }
    }

    fn rejected(&self, stage: Stage, result: &EvaluationResult) -> TurnOutcome {
        TurnOutcome::Rejected {
            stage,
            reason: result.fail_reason.unwrap_or(FailReason::BelowThreshold),
        }
    }
}
