//! Prompt construction for the remote dialogue service.

use crate::modules::{ModuleKind, TrainingModule};
use crate::session::{Speaker, Turn};
use crate::stage::Stage;
use serde::{Deserialize, Serialize};

/// Chat message in the OpenAI-compatible wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

fn stage_brief(stage: Stage) -> &'static str {
    match stage {
        Stage::Opener => "You just picked up an unexpected call. Be guarded and a little short.",
        Stage::Objection => "Raise a realistic objection: not interested, no time, or already covered.",
        Stage::Pitch => "You are giving the caller a brief chance. Be skeptical of vague claims.",
        Stage::Discovery => "You are warming up. Answer questions briefly and consider a meeting.",
        Stage::Complete => "Agree to the meeting and wrap up politely.",
    }
}

/// System prompt for the prospect persona at the current stage.
pub fn build_system_prompt(module: &TrainingModule, stage: Stage) -> String {
    let drill = match module.kind {
        ModuleKind::Scripted => "The caller is practising a full cold call.".to_string(),
        ModuleKind::Repetition => format!(
            "The caller is drilling the {} stage repeatedly. React to each attempt on its own.",
            module.focus_stage
        ),
        ModuleKind::RapidFire => "The caller is answering rapid-fire objections.".to_string(),
    };
    format!(
        "You are a busy B2B prospect receiving a cold call in the \"{title}\" training module. \
         {drill} {brief} Reply in one or two short spoken sentences with no stage directions. \
         After your reply append exactly one annotation of the form \
         [[FEEDBACK:SUCCESS|tip]] or [[FEEDBACK:RETRY|tip]] judging the caller's last line, \
         where tip is a coaching hint of at most ten words.",
        title = module.title,
        brief = stage_brief(stage),
    )
}

/// Full message list: system prompt followed by the call history.
pub fn build_messages(module: &TrainingModule, stage: Stage, history: &[Turn]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(build_system_prompt(module, stage)));
    messages.extend(history.iter().map(|turn| match turn.speaker {
        Speaker::User => ChatMessage::user(turn.text.clone()),
        Speaker::Ai => ChatMessage::assistant(turn.text.clone()),
    }));
    messages
}
