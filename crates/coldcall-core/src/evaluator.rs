//! Response evaluation: scores one free-text utterance against the rubric for a stage.
//!
//! Each stage has 3–4 independent boolean checks. A configurable threshold decides
//! the verdict, and auto-fail overrides (length, pushy phrasing, missing question)
//! apply regardless of how many checks passed.

use crate::stage::Stage;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z0-9]+(?:'[a-z]+)?").expect("static word pattern"));
static CONTRACTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-z]+'(?:s|re|m|ll|ve|d|t)\b").expect("static contraction pattern"));

const SELF_IDENTIFICATION: &[&str] = &[
    "this is", "my name is", "my name's", "i'm", "i am", "calling from", "here from",
];
const EMPATHY: &[&str] = &[
    "out of the blue", "i know you", "i know this", "caught you", "interrupting", "interrupted",
    "interrupt", "bad time", "busy", "unexpected", "cold call", "didn't expect", "don't know me",
    "middle of something",
];
const SOFT_ASK: &[&str] = &[
    "can i", "could i", "mind if", "would it be", "is it ok", "is it okay", "is that ok",
    "okay if", "ok if", "would you", "do you have", "fair", "a few seconds", "quick question",
];
const ACKNOWLEDGEMENT: &[&str] = &[
    "i understand", "i hear you", "totally get", "i get that", "i get it", "fair enough",
    "makes sense", "that's fair", "no problem", "appreciate", "understandable", "of course",
];
const CURIOSITY: &[&str] = &[
    "what", "how", "curious", "mind if", "can i ask", "would it", "is it", "fair to",
];
const ARGUMENT: &[&str] = &[
    "but you", "you're wrong", "actually you", "that's not true", "you don't understand",
    "you're missing",
];
const BENEFIT: &[&str] = &[
    "help", "helps", "helped", "save", "saves", "reduce", "reduces", "increase", "increases",
    "improve", "improves", "grow", "cut", "cuts", "faster", "without", "avoid",
];
const SPECIFICITY: &[&str] = &[
    "teams like", "companies like", "clients like", "customers like", "for example", "percent",
];
const CONFIRMING: &[&str] = &[
    "does that", "would that", "is that", "sound", "relevant", "make sense", "worth", "fair",
    "open to",
];
const OPEN_QUESTION: &[&str] = &["what", "how", "why", "tell me", "walk me through"];
const MEETING_ASK: &[&str] = &[
    "meeting", "call", "chat", "demo", "calendar", "catch up", "sit down", "minutes",
];
const TIME_SPECIFIC: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "tomorrow", "next week",
    "this week", "morning", "afternoon", "am", "pm",
];

const OBJECTION_MAX_WORDS: usize = 30;
const PITCH_MAX_WORDS: usize = 35;

fn default_pushy_phrases() -> Vec<String> {
    [
        "you need to", "you must", "you have to", "buy now", "buy our", "act now",
        "sign up today", "don't miss", "you should buy", "limited time", "listen to me",
        "trust me",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Why an utterance failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    TooShort,
    TooLong,
    PushyPhrasing,
    MissingQuestion,
    BelowThreshold,
    OffTopic,
}

impl FailReason {
    /// Stable code used in progress records and logs.
    pub fn code(self) -> &'static str {
        match self {
            FailReason::TooShort => "too_short",
            FailReason::TooLong => "too_long",
            FailReason::PushyPhrasing => "pushy_phrasing",
            FailReason::MissingQuestion => "missing_question",
            FailReason::BelowThreshold => "below_threshold",
            FailReason::OffTopic => "off_topic",
        }
    }

    /// Coaching tip shown after a failed call.
    pub fn tip(self) -> &'static str {
        match self {
            FailReason::TooShort => "Say a little more. Give the prospect a reason to stay on the line.",
            FailReason::TooLong => "Keep it tight. Long monologues get hung up on.",
            FailReason::PushyPhrasing => "Drop the pressure. Invite, don't command.",
            FailReason::MissingQuestion => "End with a soft question so the prospect can respond.",
            FailReason::BelowThreshold => "Hit more of the basics: who you are, empathy, and a soft ask.",
            FailReason::OffTopic => "Stay on the point of this drill.",
        }
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One boolean rubric check and whether the utterance satisfied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricCheck {
    pub name: String,
    pub passed: bool,
}

impl RubricCheck {
    fn new(name: &str, passed: bool) -> Self {
        Self {
            name: name.to_string(),
            passed,
        }
    }
}

/// Verdict for one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub pass: bool,
    pub fail_reason: Option<FailReason>,
    pub pass_count: usize,
    #[serde(default)]
    pub checks: Vec<RubricCheck>,
}

impl EvaluationResult {
    pub fn passed(pass_count: usize, checks: Vec<RubricCheck>) -> Self {
        Self {
            pass: true,
            fail_reason: None,
            pass_count,
            checks,
        }
    }

    pub fn failed(reason: FailReason, pass_count: usize, checks: Vec<RubricCheck>) -> Self {
        Self {
            pass: false,
            fail_reason: Some(reason),
            pass_count,
            checks,
        }
    }
}

/// Tunable rubric parameters. Defaults match the shipped training content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricConfig {
    /// Checks that must pass (clamped to the number of checks for the stage).
    pub pass_threshold: usize,
    /// Fewer words than this fails as too short.
    pub min_words: usize,
    /// Length ceiling in words; exceeding it always fails.
    pub max_words: usize,
    /// Length ceiling in characters; exceeding it always fails.
    pub max_chars: usize,
    /// Average words per sentence still considered conversational.
    pub max_sentence_words: usize,
    /// Fail utterances that do not end with a question mark.
    pub require_question: bool,
    pub pushy_phrases: Vec<String>,
}

impl Default for RubricConfig {
    fn default() -> Self {
        Self {
            pass_threshold: 3,
            min_words: 3,
            max_words: 45,
            max_chars: 300,
            max_sentence_words: 20,
            require_question: true,
            pushy_phrases: default_pushy_phrases(),
        }
    }
}

/// Classifies one utterance for a stage. Implementations must be pure.
pub trait ResponseEvaluator: Send + Sync {
    fn evaluate(&self, text: &str, stage: Stage) -> EvaluationResult;
}

/// Keyword/structure rubric used by the scripted module.
#[derive(Debug, Clone, Default)]
pub struct RubricEvaluator {
    config: RubricConfig,
}

impl RubricEvaluator {
    pub fn new(config: RubricConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RubricConfig {
        &self.config
    }

    fn stage_checks(&self, stage: Stage, text: &Utterance) -> Vec<RubricCheck> {
        let short = text.short_sentences(self.config.max_sentence_words);
        match stage {
            Stage::Opener => vec![
                RubricCheck::new("self_identification", text.has_any(SELF_IDENTIFICATION)),
                RubricCheck::new("conversational_tone", text.has_contraction() && short),
                RubricCheck::new("empathy", text.has_any(EMPATHY)),
                RubricCheck::new("soft_question", text.ends_with_question() && text.has_any(SOFT_ASK)),
            ],
            Stage::Objection => vec![
                RubricCheck::new("acknowledgement", text.has_any(ACKNOWLEDGEMENT)),
                RubricCheck::new("curiosity_question", text.ends_with_question() && text.has_any(CURIOSITY)),
                RubricCheck::new("no_argument", !text.has_any(ARGUMENT)),
                RubricCheck::new("brevity", text.words <= OBJECTION_MAX_WORDS && short),
            ],
            Stage::Pitch => vec![
                RubricCheck::new("benefit_language", text.has_any(BENEFIT)),
                RubricCheck::new(
                    "specificity",
                    text.has_digit() || text.raw.contains('%') || text.has_any(SPECIFICITY),
                ),
                RubricCheck::new("brevity", text.words <= PITCH_MAX_WORDS && short),
                RubricCheck::new("confirming_question", text.ends_with_question() && text.has_any(CONFIRMING)),
            ],
            Stage::Discovery => vec![
                RubricCheck::new("open_question", text.has_any(OPEN_QUESTION)),
                RubricCheck::new("meeting_ask", text.has_any(MEETING_ASK)),
                RubricCheck::new("time_specificity", text.has_digit() || text.has_any(TIME_SPECIFIC)),
                RubricCheck::new("conversational_tone", short),
            ],
            Stage::Complete => Vec::new(),
        }
    }
}

impl ResponseEvaluator for RubricEvaluator {
    fn evaluate(&self, text: &str, stage: Stage) -> EvaluationResult {
        if stage.is_terminal() {
            return EvaluationResult::passed(0, Vec::new());
        }

        let utterance = Utterance::new(text);
        let checks = self.stage_checks(stage, &utterance);
        let pass_count = checks.iter().filter(|c| c.passed).count();
        let threshold = self.config.pass_threshold.min(checks.len());

        // Overrides, highest precedence first.
        let override_reason = if utterance.words < self.config.min_words {
            Some(FailReason::TooShort)
        } else if utterance.words > self.config.max_words
            || utterance.chars > self.config.max_chars
        {
            Some(FailReason::TooLong)
        } else if utterance.has_any_owned(&self.config.pushy_phrases) {
            Some(FailReason::PushyPhrasing)
        } else if self.config.require_question && !utterance.ends_with_question() {
            Some(FailReason::MissingQuestion)
        } else if pass_count < threshold {
            Some(FailReason::BelowThreshold)
        } else {
            None
        };

        match override_reason {
            Some(reason) => EvaluationResult::failed(reason, pass_count, checks),
            None => EvaluationResult::passed(pass_count, checks),
        }
    }
}

/// Lenient check for repetition and drill modules: long enough and on topic.
#[derive(Debug, Clone)]
pub struct LenientEvaluator {
    min_words: usize,
    max_words: usize,
    keywords: Vec<String>,
}

impl LenientEvaluator {
    pub fn new(min_words: usize, max_words: usize, keywords: &[&str]) -> Self {
        Self {
            min_words,
            max_words,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl ResponseEvaluator for LenientEvaluator {
    fn evaluate(&self, text: &str, _stage: Stage) -> EvaluationResult {
        let utterance = Utterance::new(text);
        let matched = self
            .keywords
            .iter()
            .filter(|k| contains_phrase(&utterance.normalized, k))
            .count();
        let on_topic = self.keywords.is_empty() || matched > 0;
        let checks = vec![
            RubricCheck::new("long_enough", utterance.words >= self.min_words),
            RubricCheck::new("keyword_match", on_topic),
        ];

        if utterance.words < self.min_words {
            EvaluationResult::failed(FailReason::TooShort, matched, checks)
        } else if utterance.words > self.max_words {
            EvaluationResult::failed(FailReason::TooLong, matched, checks)
        } else if !on_topic {
            EvaluationResult::failed(FailReason::OffTopic, 0, checks)
        } else {
            EvaluationResult::passed(matched, checks)
        }
    }
}

/// Pre-computed views of one utterance.
struct Utterance<'a> {
    raw: &'a str,
    normalized: String,
    words: usize,
    chars: usize,
}

impl<'a> Utterance<'a> {
    fn new(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        let normalized = trimmed.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");
        let words = WORD_RE.find_iter(&normalized).count();
        Self {
            raw: trimmed,
            chars: trimmed.chars().count(),
            normalized,
            words,
        }
    }

    fn has_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|p| contains_phrase(&self.normalized, p))
    }

    fn has_any_owned(&self, phrases: &[String]) -> bool {
        phrases
            .iter()
            .any(|p| contains_phrase(&self.normalized, &p.to_lowercase()))
    }

    fn has_contraction(&self) -> bool {
        CONTRACTION_RE.is_match(&self.normalized)
    }

    fn has_digit(&self) -> bool {
        self.raw.chars().any(|c| c.is_ascii_digit())
    }

    fn ends_with_question(&self) -> bool {
        self.raw.ends_with('?')
    }

    fn short_sentences(&self, max_words: usize) -> bool {
        let sentences: Vec<usize> = self
            .normalized
            .split(['.', '!', '?'])
            .map(|s| WORD_RE.find_iter(s).count())
            .filter(|&n| n > 0)
            .collect();
        if sentences.is_empty() {
            return false;
        }
        sentences.iter().sum::<usize>() / sentences.len() <= max_words
    }
}

/// Phrase match on word boundaries ("cut" does not match "execute").
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    haystack.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(|c| c.is_alphanumeric()) && !after.is_some_and(|c| c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric() -> RubricEvaluator {
        RubricEvaluator::default()
    }

    #[test]
    fn opener_with_identity_empathy_and_question_passes() {
        let text = "Hi, this is Alex from Acme — I know this is out of the blue, can I take 20 seconds?";
        let result = rubric().evaluate(text, Stage::Opener);
        assert!(result.pass, "{result:?}");
        assert_eq!(result.fail_reason, None);
        assert!(result.pass_count >= 3);
    }

    #[test]
    fn pushy_opener_fails_with_pushy_reason() {
        let result = rubric().evaluate("You need to buy our product now.", Stage::Opener);
        assert!(!result.pass);
        assert_eq!(result.fail_reason, Some(FailReason::PushyPhrasing));
    }

    #[test]
    fn empathy_alongside_pushy_imperative_still_fails() {
        let text = "Hi, this is Sam, I know this is out of the blue, but you need to hear this, can I?";
        let result = rubric().evaluate(text, Stage::Opener);
        assert!(!result.pass);
        assert_eq!(result.fail_reason, Some(FailReason::PushyPhrasing));
    }

    #[test]
    fn length_ceiling_overrides_satisfied_checks() {
        let padding = " and honestly I'm here to keep it short".repeat(8);
        let text = format!(
            "Hi, this is Alex from Acme, I know this is out of the blue{padding}, can I take 20 seconds?"
        );
        let result = rubric().evaluate(&text, Stage::Opener);
        assert!(!result.pass);
        assert_eq!(result.fail_reason, Some(FailReason::TooLong));
        assert!(result.pass_count >= 3);
    }

    #[test]
    fn missing_question_fails() {
        let text = "Hi, this is Alex from Acme, I know I'm calling out of the blue.";
        let result = rubric().evaluate(text, Stage::Opener);
        assert_eq!(result.fail_reason, Some(FailReason::MissingQuestion));
    }

    #[test]
    fn empty_and_short_input_fail_gracefully() {
        for text in ["", "   ", "hi?"] {
            let result = rubric().evaluate(text, Stage::Opener);
            assert!(!result.pass);
            assert_eq!(result.fail_reason, Some(FailReason::TooShort));
        }
    }

    #[test]
    fn evaluation_is_deterministic() {
        let text = "I hear you, totally fair. Out of curiosity, what are you using today?";
        let first = rubric().evaluate(text, Stage::Objection);
        for _ in 0..5 {
            assert_eq!(rubric().evaluate(text, Stage::Objection), first);
        }
        assert!(first.pass);
    }

    #[test]
    fn pitch_and_discovery_rubrics() {
        let pitch = "We help teams like yours cut onboarding time by 30 percent. Would that be relevant?";
        assert!(rubric().evaluate(pitch, Stage::Pitch).pass);

        let discovery = "What does your process look like today? Could we grab 15 minutes Thursday afternoon?";
        assert!(rubric().evaluate(discovery, Stage::Discovery).pass);
    }

    #[test]
    fn threshold_is_configurable() {
        let strict = RubricEvaluator::new(RubricConfig {
            pass_threshold: 4,
            ..RubricConfig::default()
        });
        let text = "Hi, this is Alex from Acme — I know this is out of the blue, can I take 20 seconds?";
        let result = strict.evaluate(text, Stage::Opener);
        assert_eq!(result.fail_reason, Some(FailReason::BelowThreshold));
    }

    #[test]
    fn lenient_evaluator_needs_keyword_and_length() {
        let eval = LenientEvaluator::new(5, 60, &["save", "help"]);
        assert!(eval.evaluate("We help finance teams close their books faster", Stage::Pitch).pass);
        assert_eq!(
            eval.evaluate("Nice weather today, is it not", Stage::Pitch).fail_reason,
            Some(FailReason::OffTopic)
        );
        assert_eq!(
            eval.evaluate("We help", Stage::Pitch).fail_reason,
            Some(FailReason::TooShort)
        );
    }

    #[test]
    fn phrase_matching_respects_word_boundaries() {
        assert!(contains_phrase("we cut costs", "cut"));
        assert!(!contains_phrase("we execute well", "cut"));
        assert!(contains_phrase("i'm calling", "i'm"));
    }
}
