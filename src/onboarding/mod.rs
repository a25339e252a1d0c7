//! Onboarding: the scripted first-launch conversation.
//!
//! A guide walks a new user through a fixed sequence of questions. Each
//! answer (a quick-reply chip or free text) advances the script by one step;
//! there is no branching. When the outcome step is reached the user continues
//! into sign-up.

pub mod delay;
pub mod engine;
pub mod model;
pub mod script;

use std::time::Duration;

pub use delay::DelayedTask;
pub use engine::{Advance, ConversationEngine, ConversationView, EngineEvent, IgnoreReason};
pub use model::{Message, MessageKind, OnboardingProgress};
pub use script::{
    BuiltinScript, JsonFileScript, Script, ScriptSource, ScriptStep, load_configured, wave_script,
};

use crate::config::TimingConfig;

/// Word-reveal animation length of `text` under default timing.
///
/// Presenters animating `animate_words` messages use this so their animation
/// ends exactly when the engine reveals the suggested answers.
pub fn reveal_duration(text: &str) -> Duration {
    TimingConfig::default().reveal_duration(text)
}
