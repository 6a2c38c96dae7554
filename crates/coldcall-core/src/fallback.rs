//! Canned prospect lines used when the dialogue service is unavailable.
//!
//! Generated lines carry the same `[[FEEDBACK:KIND|tip]]` annotation the remote
//! service is prompted to emit, so [`split_feedback`] handles both sources alike.

use crate::stage::Stage;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Module key matching every module in the fallback table.
const ANY_MODULE: &str = "*";

static FEEDBACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[\[\s*FEEDBACK\s*:\s*(SUCCESS|RETRY)\s*(?:\|\s*([^\]]*?))?\s*\]\]")
        .expect("static feedback pattern")
});

/// `(stage, module, candidates)`; module-specific rows first, then [`ANY_MODULE`] defaults.
const FALLBACK_LINES: &[(Stage, &str, &[&str])] = &[
    (
        Stage::Pitch,
        "pitch",
        &[
            "Go on, what's the pitch?",
            "Why should I care about that?",
            "Okay, and how is that different from what we have?",
            "Sounds expensive. What's in it for us?",
        ],
    ),
    (
        Stage::Discovery,
        "full_call",
        &[
            "That could be useful. What would next steps look like?",
            "We've struggled with that. How fast could we try it?",
            "Okay, I'm listening. What do you need to know about us?",
        ],
    ),
    (
        Stage::Opener,
        ANY_MODULE,
        &[
            "Hello?",
            "Yeah, this is Jordan.",
            "Hi, who's this?",
            "Speaking. What's this about?",
        ],
    ),
    (
        Stage::Objection,
        ANY_MODULE,
        &[
            "Look, I'm not really interested.",
            "We already have something for that.",
            "Can you just send me an email?",
            "I'm in the middle of something, what is this?",
            "We don't have budget for anything right now.",
        ],
    ),
    (
        Stage::Pitch,
        ANY_MODULE,
        &[
            "Okay, you've got thirty seconds. What do you do?",
            "Fine. What exactly are you selling?",
            "Alright, go on then.",
        ],
    ),
    (
        Stage::Discovery,
        ANY_MODULE,
        &[
            "Hm, that's actually a problem for us. How would that work?",
            "Interesting. What would you need from me?",
            "Maybe. Who else are you working with?",
            "Okay, I might be open to hearing more.",
        ],
    ),
    (
        Stage::Complete,
        ANY_MODULE,
        &[
            "Alright, send me an invite and we'll talk.",
            "Sure, let's do it. Put something in my calendar.",
            "Okay, that works. Talk then.",
        ],
    ),
];

fn lookup(stage: Stage, module_id: &str) -> Option<&'static [&'static str]> {
    FALLBACK_LINES
        .iter()
        .find(|(s, m, _)| *s == stage && *m == module_id)
        .map(|(_, _, lines)| *lines)
}

const REJECTIONS: &[(Stage, &[&str])] = &[
    (
        Stage::Opener,
        &["Sorry, not interested.", "I don't take sales calls. Bye.", "Please take me off your list."],
    ),
    (
        Stage::Objection,
        &["Like I said, not interested. Goodbye.", "No, I really don't have time for this."],
    ),
    (
        Stage::Pitch,
        &["That doesn't sound relevant to us. Thanks anyway.", "I've heard that before. Not for us."],
    ),
    (
        Stage::Discovery,
        &["I don't think a meeting makes sense. Take care.", "Let's leave it there, thanks."],
    ),
];

const IMPATIENCE: &[&str] = &["Hello? Are you still there?", "Hello? I can't hear you.", "Is anyone there?"];
const UNPROMPTED_HANGUP: &[&str] = &["Sorry, I've got to run.", "Not a good time. Bye.", "I have to take another call."];
const RETRY: &[&str] = &["Sorry, what was that?", "Hm, I'm not sure I follow.", "Say that again?"];
const UNCLEAR: &[&str] = &["Sorry, you broke up there.", "Didn't catch that, can you repeat it?"];
const SUCCESS_TIPS: &[&str] = &[
    "Good control of the conversation.",
    "Nice and conversational.",
    "Clear and to the point.",
];
const RETRY_TIPS: &[&str] = &[
    "Slow down and end with a question.",
    "Acknowledge what they said before moving on.",
    "Keep it shorter and more specific.",
];

/// Coaching verdict attached to a prospect line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackKind {
    Success,
    Retry,
}

impl FeedbackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackKind::Success => "SUCCESS",
            FeedbackKind::Retry => "RETRY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub tip: String,
}

/// Append a feedback annotation to a spoken line.
pub fn annotate(line: &str, feedback: &Feedback) -> String {
    format!("{} [[FEEDBACK:{}|{}]]", line.trim(), feedback.kind.as_str(), feedback.tip.trim())
}

/// Separate the spoken line from its feedback annotation, if any.
pub fn split_feedback(raw: &str) -> (String, Option<Feedback>) {
    let feedback = FEEDBACK_RE.captures(raw).map(|caps| {
        let kind = if caps[1].eq_ignore_ascii_case("SUCCESS") {
            FeedbackKind::Success
        } else {
            FeedbackKind::Retry
        };
        Feedback {
            kind,
            tip: caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
        }
    });
    let line = FEEDBACK_RE.replace_all(raw, "");
    let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
    (line, feedback)
}

/// Picks canned lines uniformly at random from static tables.
#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    rng: StdRng,
}

impl FallbackGenerator {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Candidate lines for `(stage, module)`, falling back to the stage default.
    pub fn candidates(stage: Stage, module_id: &str) -> &'static [&'static str] {
        lookup(stage, module_id)
            .or_else(|| lookup(stage, ANY_MODULE))
            .unwrap_or(RETRY)
    }

    /// Next prospect line for the stage, annotated like a dialogue-service reply.
    pub fn next_line(&mut self, stage: Stage, module_id: &str, kind: FeedbackKind) -> String {
        let line = self.pick(Self::candidates(stage, module_id));
        let tip = match kind {
            FeedbackKind::Success => self.pick(SUCCESS_TIPS),
            FeedbackKind::Retry => self.pick(RETRY_TIPS),
        };
        annotate(
            line,
            &Feedback {
                kind,
                tip: tip.to_string(),
            },
        )
    }

    pub fn pickup_line(&mut self) -> &'static str {
        self.pick(Self::candidates(Stage::Opener, ANY_MODULE))
    }

    /// Unannotated first line for a module pinned to `stage`.
    pub fn opening_line(&mut self, stage: Stage, module_id: &str) -> &'static str {
        self.pick(Self::candidates(stage, module_id))
    }

    pub fn rejection_line(&mut self, stage: Stage) -> &'static str {
        let lines = REJECTIONS
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, lines)| *lines)
            .unwrap_or(REJECTIONS[0].1);
        self.pick(lines)
    }

    pub fn closing_line(&mut self) -> &'static str {
        self.pick(Self::candidates(Stage::Complete, ANY_MODULE))
    }

    pub fn impatience_line(&mut self) -> &'static str {
        self.pick(IMPATIENCE)
    }

    pub fn hangup_line(&mut self) -> &'static str {
        self.pick(UNPROMPTED_HANGUP)
    }

    pub fn retry_line(&mut self) -> &'static str {
        self.pick(RETRY)
    }

    pub fn unclear_line(&mut self) -> &'static str {
        self.pick(UNCLEAR)
    }

    fn pick(&mut self, lines: &'static [&'static str]) -> &'static str {
        if lines.is_empty() {
            return "";
        }
        lines[self.rng.random_range(0..lines.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_line_parses_like_service_output() {
        let mut generator = FallbackGenerator::seeded(3);
        let raw = generator.next_line(Stage::Objection, "opener", FeedbackKind::Success);
        let (line, feedback) = split_feedback(&raw);

        assert!(FallbackGenerator::candidates(Stage::Objection, "opener").contains(&line.as_str()));
        let feedback = feedback.expect("annotation present");
        assert_eq!(feedback.kind, FeedbackKind::Success);
        assert!(SUCCESS_TIPS.contains(&feedback.tip.as_str()));
    }

    #[test]
    fn split_feedback_handles_service_variants() {
        let (line, fb) = split_feedback("Okay, go on. [[feedback: retry | Ask a question]]");
        assert_eq!(line, "Okay, go on.");
        let fb = fb.unwrap();
        assert_eq!(fb.kind, FeedbackKind::Retry);
        assert_eq!(fb.tip, "Ask a question");

        let (plain, none) = split_feedback("Just a normal reply.");
        assert_eq!(plain, "Just a normal reply.");
        assert!(none.is_none());
    }

    #[test]
    fn module_specific_lines_take_priority() {
        assert!(FallbackGenerator::candidates(Stage::Pitch, "pitch").contains(&"Go on, what's the pitch?"));
        assert!(FallbackGenerator::candidates(Stage::Pitch, "opener").contains(&"Alright, go on then."));
    }

    #[test]
    fn every_stage_has_three_to_five_defaults() {
        for stage in Stage::SEQUENCE {
            let n = FallbackGenerator::candidates(stage, ANY_MODULE).len();
            assert!((3..=5).contains(&n), "{stage}: {n}");
        }
    }

    #[test]
    fn same_seed_same_lines() {
        let mut a = FallbackGenerator::seeded(42);
        let mut b = FallbackGenerator::seeded(42);
        for stage in Stage::SEQUENCE {
            assert_eq!(
                a.next_line(stage, "opener", FeedbackKind::Retry),
                b.next_line(stage, "opener", FeedbackKind::Retry)
            );
        }
    }
}
