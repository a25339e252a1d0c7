//! Transcript and checkpoint data models.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Guide,
    User,
}

/// One line of the onboarding transcript. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub text: String,
    /// Presenters reveal this message word by word.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub animate_words: bool,
}

impl Message {
    pub fn new(kind: MessageKind, text: impl Into<String>, animate_words: bool) -> Self {
        Self {
            id: new_message_id(),
            kind,
            text: text.into(),
            animate_words,
        }
    }

    pub fn guide(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Guide, text, false)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageKind::User, text, false)
    }

    pub fn is_guide(&self) -> bool {
        self.kind == MessageKind::Guide
    }
}

/// `<unix millis>-<7 base36 chars>`.
fn new_message_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..7)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Checkpoint of a settled conversation, kept by the session holder so the
/// onboarding screen can be left and resumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingProgress {
    pub messages: Vec<Message>,
    pub current_step_index: usize,
    pub show_continue: bool,
    pub show_suggested_answers: bool,
}

impl Default for OnboardingProgress {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            current_step_index: 0,
            show_continue: false,
            show_suggested_answers: true,
        }
    }
}
