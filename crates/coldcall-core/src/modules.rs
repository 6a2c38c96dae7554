//! Training module catalogue. Order defines unlock order.

use crate::stage::Stage;
use serde::{Deserialize, Serialize};

/// How a module decides progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// Rubric-gated stage sequence: opener → objection → pitch → discovery → complete.
    Scripted,
    /// Lenient checks toward a count of consecutive passing turns.
    Repetition,
    /// Fixed list of prompts answered under a response timeout.
    RapidFire,
}

/// Static description of one training module.
#[derive(Debug, Clone, Copy)]
pub struct TrainingModule {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: ModuleKind,
    /// Stage the conversation is pinned to for non-scripted modules.
    pub focus_stage: Stage,
    /// Any one of these makes a lenient turn on topic.
    pub keywords: &'static [&'static str],
    /// Drill prompts (rapid-fire only).
    pub prompts: &'static [&'static str],
    /// Consecutive passes needed in practice mode.
    pub practice_target: u32,
    pub min_words: usize,
}

pub const CATALOG: &[TrainingModule] = &[
    TrainingModule {
        id: "opener",
        title: "Cold Call Opener",
        kind: ModuleKind::Scripted,
        focus_stage: Stage::Opener,
        keywords: &[],
        prompts: &[],
        practice_target: 1,
        min_words: 3,
    },
    TrainingModule {
        id: "warmup",
        title: "Objection Warm-up",
        kind: ModuleKind::RapidFire,
        focus_stage: Stage::Objection,
        keywords: &[
            "understand", "hear you", "fair", "get that", "makes sense", "curious", "what", "how",
        ],
        prompts: &[
            "I'm not interested.",
            "Just send me an email.",
            "We already have a vendor for that.",
            "How did you get my number?",
            "We don't have budget.",
            "Call me next quarter.",
        ],
        practice_target: 6,
        min_words: 3,
    },
    TrainingModule {
        id: "pitch",
        title: "Pitch Practice",
        kind: ModuleKind::Repetition,
        focus_stage: Stage::Pitch,
        keywords: &[
            "help", "save", "reduce", "increase", "improve", "grow", "faster", "teams like",
            "companies like",
        ],
        prompts: &[],
        practice_target: 3,
        min_words: 8,
    },
    TrainingModule {
        id: "full_call",
        title: "Full Call",
        kind: ModuleKind::Repetition,
        focus_stage: Stage::Discovery,
        keywords: &[
            "meeting", "calendar", "demo", "minutes", "call", "chat", "what", "how", "help",
        ],
        prompts: &[],
        practice_target: 5,
        min_words: 5,
    },
];

pub fn find_module(id: &str) -> Option<&'static TrainingModule> {
    CATALOG.iter().find(|m| m.id == id)
}

/// Position in the unlock order.
pub fn module_index(id: &str) -> Option<usize> {
    CATALOG.iter().position(|m| m.id == id)
}

/// The module that must be passed before `id` unlocks.
pub fn prerequisite(id: &str) -> Option<&'static TrainingModule> {
    match module_index(id) {
        Some(i) if i > 0 => CATALOG.get(i - 1),
        _ => None,
    }
}
