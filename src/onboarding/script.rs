//! Onboarding script: the authored, linear sequence of guide prompts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::WaveConfig;
use crate::error::ScriptError;

/// One authored unit of the conversation: a guide prompt plus quick replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    pub id: String,
    pub guide_message: String,
    #[serde(default)]
    pub suggested_answers: Vec<String>,
    /// Terminal, result-presenting step.
    #[serde(default)]
    pub is_outcome: bool,
    /// Informational opener that expects no particular answer.
    #[serde(default)]
    pub is_reassurance: bool,
}

impl ScriptStep {
    pub fn new(id: impl Into<String>, guide_message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            guide_message: guide_message.into(),
            suggested_answers: Vec::new(),
            is_outcome: false,
            is_reassurance: false,
        }
    }

    pub fn with_answers<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggested_answers = answers.into_iter().map(Into::into).collect();
        self
    }

    pub fn outcome(mut self) -> Self {
        self.is_outcome = true;
        self
    }

    pub fn reassurance(mut self) -> Self {
        self.is_reassurance = true;
        self
    }
}

/// Immutable, index-addressed script. The next step is always `index + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    steps: Arc<[ScriptStep]>,
}

impl Script {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    pub fn step(&self, index: usize) -> Option<&ScriptStep> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the step that ends the conversation: the first outcome step,
    /// else the last step.
    pub fn terminal_index(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.is_outcome)
            .or_else(|| self.steps.len().checked_sub(1))
    }
}

/// Where the script comes from.
#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn load(&self) -> Result<Script, ScriptError>;
}

/// The authored Wave onboarding script.
pub struct BuiltinScript;

#[async_trait]
impl ScriptSource for BuiltinScript {
    async fn load(&self) -> Result<Script, ScriptError> {
        Ok(wave_script())
    }
}

/// A script stored as a JSON array of steps.
pub struct JsonFileScript {
    path: PathBuf,
}

impl JsonFileScript {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ScriptSource for JsonFileScript {
    async fn load(&self) -> Result<Script, ScriptError> {
        let path = self.path.display().to_string();
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ScriptError::Io {
                path: path.clone(),
                source,
            })?;
        let steps: Vec<ScriptStep> =
            serde_json::from_str(&raw).map_err(|source| ScriptError::Parse { path, source })?;
        if steps.is_empty() {
            return Err(ScriptError::Empty);
        }
        tracing::info!(steps = steps.len(), path = %self.path.display(), "Loaded onboarding script");
        Ok(Script::new(steps))
    }
}

/// Load the script named by `config`, or the built-in one when none is set.
pub async fn load_configured(config: &WaveConfig) -> crate::error::Result<Script> {
    let source: Box<dyn ScriptSource> = match &config.script_path {
        Some(path) => Box::new(JsonFileScript::new(path)),
        None => Box::new(BuiltinScript),
    };
    Ok(source.load().await?)
}

/// Built-in Wave onboarding: a reassurance opener, basics, three
/// personality questions, then the outcome.
pub fn wave_script() -> Script {
    Script::new(vec![
        ScriptStep::new(
            "reassurance",
            "Hey! I'm your Wave guide. I'll help you discover people and groups you'll actually \
             vibe with. Don't worry, you can update your answers anytime from your profile after \
             onboarding.",
        )
        .reassurance(),
        ScriptStep::new("name", "First things first... What do I call you?"),
        ScriptStep::new("age", "Nice to meet you! How old are you?")
            .with_answers(["18-24", "25-34", "35-44", "45+"]),
        ScriptStep::new(
            "location",
            "Sweet. And where in the world are you located right now?",
        )
        .with_answers(["San Francisco", "New York", "Austin", "Los Angeles", "Other"]),
        ScriptStep::new(
            "hobbies",
            "What do you like to do in your free time? Pick a few or describe your own.",
        )
        .with_answers(["Cafe hopping", "Yoga", "Live music", "Hiking", "Reading", "Museums"]),
        ScriptStep::new("goals", "What are you hoping to get out of Wave?").with_answers([
            "I'm hoping to network!",
            "I want to attend more fun events.",
            "I'm looking for deeper connections.",
            "Just exploring.",
        ]),
        ScriptStep::new(
            "deep-1",
            "When you're deep into a big goal and hit a wall... what's your immediate plan of \
             attack?",
        )
        .with_answers([
            "I pivot and try the weirdest new approach first.",
            "I research thoroughly, then follow a clear plan.",
            "I ask friends for advice and brainstorm together.",
        ]),
        ScriptStep::new(
            "deep-2",
            "When learning something new... do you need a clear step-by-step roadmap, or do you \
             just grab the tools and start exploring?",
        )
        .with_answers([
            "I find the best curriculum and follow it perfectly.",
            "I grab the tools and figure it out as I go.",
            "I like a mix: some structure, lots of experimentation.",
        ]),
        ScriptStep::new(
            "deep-3",
            "When you need to totally switch off and recharge... do you prefer quiet alone time, \
             or is hanging out with friends the real relief?",
        )
        .with_answers([
            "Quiet alone time, for sure.",
            "Hanging out with friends recharges me.",
            "A bit of both, depends on the day.",
        ]),
        ScriptStep::new(
            "outcome",
            "Based on your answers, you're The Steady Current: thoughtful, adaptable, and great \
             at balancing structure with spontaneity. You tend to weigh options before acting but \
             stay open to new experiences.",
        )
        .outcome(),
    ])
}
