//! Conversation engine: walks the onboarding script one answer at a time.
//!
//! Every answer advances to `current + 1` regardless of its content. The next
//! guide message arrives after a typing delay, and its suggested answers only
//! after the message's word-reveal animation would have finished. Settled
//! states are checkpointed into the session so the screen can be left and
//! resumed.

use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};

use crate::config::TimingConfig;
use crate::error::ConversationError;
use crate::session::SessionHandle;

use super::delay::DelayedTask;
use super::model::{Message, MessageKind, OnboardingProgress};
use super::script::{Script, ScriptStep};

const EVENT_CAPACITY: usize = 64;

/// Something presenters should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    MessageAppended(Message),
    /// The guide is "typing" the next message.
    TypingStarted,
    /// Quick-reply chips for the current step became visible.
    SuggestionsRevealed { answers: Vec<String> },
    /// The conversation reached its end; the continue action is shown.
    ContinueAvailable,
    /// The user accepted the outcome and left onboarding.
    Completed,
}

/// Why an answer did not advance the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    /// A guide reply is still being typed.
    Generating,
    AlreadyFinished,
    Disposed,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::EmptyInput => "empty_input",
            Self::Generating => "generating",
            Self::AlreadyFinished => "already_finished",
            Self::Disposed => "disposed",
        };
        write!(f, "{s}")
    }
}

/// Result of answering the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The next guide message is on its way.
    Advancing { next_index: usize },
    /// The answered step was the last one; continue is now shown.
    Finished,
    Ignored(IgnoreReason),
}

/// Live conversation state.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConversationState {
    messages: Vec<Message>,
    current_step_index: usize,
    draft: String,
    is_generating: bool,
    show_continue: bool,
    show_suggested_answers: bool,
    suggestions_collapsed: bool,
}

impl ConversationState {
    fn from_progress(progress: OnboardingProgress) -> Self {
        Self {
            messages: progress.messages,
            current_step_index: progress.current_step_index,
            draft: String::new(),
            is_generating: false,
            show_continue: progress.show_continue,
            show_suggested_answers: progress.show_suggested_answers,
            suggestions_collapsed: false,
        }
    }

    fn progress(&self) -> OnboardingProgress {
        OnboardingProgress {
            messages: self.messages.clone(),
            current_step_index: self.current_step_index,
            show_continue: self.show_continue,
            show_suggested_answers: self.show_suggested_answers,
        }
    }
}

/// Read-only snapshot for presenters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationView {
    pub messages: Vec<Message>,
    pub current_step_index: usize,
    pub current_step: Option<ScriptStep>,
    pub draft: String,
    pub is_generating: bool,
    pub show_continue: bool,
    pub show_suggested_answers: bool,
    pub suggestions_collapsed: bool,
    /// Chips to draw right now; empty while typing, revealing, or finished.
    pub visible_suggestions: Vec<String>,
}

struct EngineInner {
    conv: ConversationState,
    typing_task: Option<DelayedTask>,
    reveal_task: Option<DelayedTask>,
    /// Bumped whenever pending tasks are cancelled; callbacks carrying an
    /// older value are stale.
    epoch: u64,
    completed: bool,
    disposed: bool,
}

impl EngineInner {
    fn is_settled(&self) -> bool {
        !self.conv.is_generating && self.typing_task.is_none() && self.reveal_task.is_none()
    }

    fn cancel_pending(&mut self) {
        self.epoch += 1;
        let mut cancelled = 0;
        for task in [self.typing_task.take(), self.reveal_task.take()]
            .into_iter()
            .flatten()
        {
            task.cancel();
            cancelled += 1;
        }
        if cancelled > 0 {
            debug!(cancelled, "Cancelled pending reveal tasks");
        }
    }
}

struct Shared {
    script: Script,
    session: SessionHandle,
    timing: TimingConfig,
    events: broadcast::Sender<EngineEvent>,
    state: Mutex<EngineInner>,
}

impl Shared {
    fn emit(&self, event: EngineEvent) {
        // Ok if no presenter is listening
        let _ = self.events.send(event);
    }

    fn append(&self, inner: &mut EngineInner, message: Message) {
        inner.conv.messages.push(message.clone());
        self.emit(EngineEvent::MessageAppended(message));
    }

    /// Write the checkpoint, but only when no reveal is in flight.
    async fn checkpoint(&self, inner: &EngineInner) {
        if inner.is_settled() {
            self.session.replace_progress(inner.conv.progress()).await;
        }
    }
}

/// Drives the scripted onboarding conversation.
///
/// Owns its delayed tasks; dropping or disposing the engine cancels them.
pub struct ConversationEngine {
    shared: Arc<Shared>,
}

impl ConversationEngine {
    /// Create an engine resuming from the session's onboarding checkpoint.
    pub async fn new(script: Script, session: SessionHandle, timing: TimingConfig) -> Self {
        let progress = session.onboarding_progress().await;
        Self::with_progress(script, session, timing, progress)
    }

    /// Create an engine from an explicit checkpoint.
    pub fn with_progress(
        script: Script,
        session: SessionHandle,
        timing: TimingConfig,
        progress: OnboardingProgress,
    ) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                script,
                session,
                timing,
                events,
                state: Mutex::new(EngineInner {
                    conv: ConversationState::from_progress(progress),
                    typing_task: None,
                    reveal_task: None,
                    epoch: 0,
                    completed: false,
                    disposed: false,
                }),
            }),
        }
    }

    /// Subscribe to render events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    /// Show the first guide message, unanimated. No-op when the transcript
    /// already has content. Returns whether a message was added.
    pub async fn start(&self) -> bool {
        let shared = &self.shared;
        let mut inner = shared.state.lock().await;
        if inner.disposed || !inner.conv.messages.is_empty() {
            return false;
        }
        let Some(first) = shared.script.step(0) else {
            return false;
        };
        let message = Message::guide(first.guide_message.clone());
        shared.append(&mut inner, message);
        info!(step_id = %first.id, "Onboarding conversation started");
        shared.checkpoint(&inner).await;
        true
    }

    /// Replace the free-text draft.
    pub async fn set_draft(&self, text: impl Into<String>) {
        self.shared.state.lock().await.conv.draft = text.into();
    }

    /// Submit the current draft as a free-text answer.
    pub async fn submit_draft(&self) -> Advance {
        let draft = self.shared.state.lock().await.conv.draft.clone();
        self.submit_free_text(&draft).await
    }

    /// Answer with typed text. Whitespace-only text is ignored.
    pub async fn submit_free_text(&self, text: &str) -> Advance {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!(reason = %IgnoreReason::EmptyInput, "Answer ignored");
            return Advance::Ignored(IgnoreReason::EmptyInput);
        }
        self.advance(trimmed).await
    }

    /// Answer with a quick-reply chip.
    pub async fn select_suggested_answer(&self, answer: &str) -> Advance {
        self.advance(answer).await
    }

    /// Toggle the chip tray. Returns the new collapsed flag.
    pub async fn toggle_suggestions_collapsed(&self) -> bool {
        let mut inner = self.shared.state.lock().await;
        inner.conv.suggestions_collapsed = !inner.conv.suggestions_collapsed;
        inner.conv.suggestions_collapsed
    }

    /// Accept the outcome and hand over to sign-up.
    pub async fn continue_onboarding(&self) -> Result<(), ConversationError> {
        let shared = &self.shared;
        let mut inner = shared.state.lock().await;
        if inner.disposed || inner.completed || !inner.conv.show_continue {
            return Err(ConversationError::ContinueUnavailable);
        }
        inner.cancel_pending();
        inner.completed = true;
        shared.checkpoint(&inner).await;
        drop(inner);

        shared.emit(EngineEvent::Completed);
        shared.session.complete_onboarding().await;
        info!("Onboarding completed");
        Ok(())
    }

    /// Cancel every pending delayed task. The engine ignores input afterwards.
    pub async fn dispose(&self) {
        let mut inner = self.shared.state.lock().await;
        inner.cancel_pending();
        inner.disposed = true;
    }

    /// Checkpoint-shaped copy of the live state.
    pub async fn progress(&self) -> OnboardingProgress {
        self.shared.state.lock().await.conv.progress()
    }

    /// Whether no typing or reveal task is pending.
    pub async fn is_settled(&self) -> bool {
        self.shared.state.lock().await.is_settled()
    }

    pub async fn is_completed(&self) -> bool {
        self.shared.state.lock().await.completed
    }

    pub async fn view(&self) -> ConversationView {
        let shared = &self.shared;
        let inner = shared.state.lock().await;
        let conv = &inner.conv;
        let current_step = shared.script.step(conv.current_step_index).cloned();
        let visible_suggestions = match &current_step {
            Some(step) if !conv.is_generating && conv.show_suggested_answers && !conv.show_continue => {
                step.suggested_answers.clone()
            }
            _ => Vec::new(),
        };
        ConversationView {
            messages: conv.messages.clone(),
            current_step_index: conv.current_step_index,
            current_step,
            draft: conv.draft.clone(),
            is_generating: conv.is_generating,
            show_continue: conv.show_continue,
            show_suggested_answers: conv.show_suggested_answers,
            suggestions_collapsed: conv.suggestions_collapsed,
            visible_suggestions,
        }
    }

    async fn advance(&self, answer: &str) -> Advance {
        let shared = &self.shared;
        let mut inner = shared.state.lock().await;

        let ignored = if inner.disposed {
            Some(IgnoreReason::Disposed)
        } else if inner.conv.is_generating {
            Some(IgnoreReason::Generating)
        } else if inner.completed || inner.conv.show_continue {
            Some(IgnoreReason::AlreadyFinished)
        } else {
            None
        };
        if let Some(reason) = ignored {
            debug!(%reason, "Answer ignored");
            return Advance::Ignored(reason);
        }

        if !answer.is_empty() {
            shared.append(&mut inner, Message::user(answer));
        }

        let index = inner.conv.current_step_index;
        let current = shared.script.step(index);
        let next_index = index + 1;
        let next = match current {
            Some(step) if !step.is_outcome => shared.script.step(next_index).cloned(),
            _ => None,
        };

        let Some(next) = next else {
            inner.cancel_pending();
            inner.conv.show_continue = true;
            shared.emit(EngineEvent::ContinueAvailable);
            info!(step_index = index, "Reached the end of the onboarding script");
            shared.checkpoint(&inner).await;
            return Advance::Finished;
        };

        inner.cancel_pending();
        let epoch = inner.epoch;

        let conv = &mut inner.conv;
        conv.current_step_index = next_index;
        conv.draft.clear();
        conv.is_generating = true;
        conv.show_suggested_answers = false;
        conv.suggestions_collapsed = false;
        shared.emit(EngineEvent::TypingStarted);

        inner.typing_task = Some(DelayedTask::schedule(
            shared.timing.typing_delay,
            on_typing_elapsed(Arc::downgrade(&self.shared), epoch),
        ));
        info!(step_id = %next.id, next_index, "Onboarding advanced");
        Advance::Advancing { next_index }
    }
}

impl Drop for ConversationEngine {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.shared.state.try_lock() {
            inner.cancel_pending();
            inner.disposed = true;
        }
    }
}

/// Typing delay elapsed: land the guide message, then reveal chips.
async fn on_typing_elapsed(shared: Weak<Shared>, epoch: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let mut inner = shared.state.lock().await;
    if inner.disposed || inner.epoch != epoch {
        return;
    }
    inner.typing_task = None;
    inner.conv.is_generating = false;

    let Some(step) = shared.script.step(inner.conv.current_step_index).cloned() else {
        return;
    };
    let message = Message::new(MessageKind::Guide, step.guide_message.clone(), true);
    shared.append(&mut inner, message);

    inner.conv.show_continue = step.is_outcome;
    if step.is_outcome {
        shared.emit(EngineEvent::ContinueAvailable);
    }

    if step.suggested_answers.is_empty() {
        inner.conv.show_suggested_answers = true;
    } else {
        let delay = shared.timing.reveal_duration(&step.guide_message);
        inner.reveal_task = Some(DelayedTask::schedule(
            delay,
            on_reveal_elapsed(Arc::downgrade(&shared), epoch),
        ));
    }
    shared.checkpoint(&inner).await;
}

/// Word reveal finished: show the chips.
async fn on_reveal_elapsed(shared: Weak<Shared>, epoch: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let mut inner = shared.state.lock().await;
    if inner.disposed || inner.epoch != epoch {
        return;
    }
    inner.reveal_task = None;
    inner.conv.show_suggested_answers = true;

    if let Some(step) = shared.script.step(inner.conv.current_step_index) {
        shared.emit(EngineEvent::SuggestionsRevealed {
            answers: step.suggested_answers.clone(),
        });
    }
    shared.checkpoint(&inner).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::session::{Screen, SessionScope};

    const TYPING: Duration = Duration::from_millis(1300);

    fn script() -> Script {
        Script::new(vec![
            ScriptStep::new("a", "Hi"),
            ScriptStep::new("b", "Next").with_answers(["X", "Y"]),
            ScriptStep::new("c", "Done").outcome(),
        ])
    }

    async fn engine_for(script: Script) -> (ConversationEngine, SessionHandle) {
        let session = SessionScope::new().open();
        let engine = ConversationEngine::new(script, session.clone(), TimingConfig::default()).await;
        (engine, session)
    }

    async fn wait(d: Duration) {
        tokio::time::sleep(d).await;
    }

    fn texts(messages: &[Message]) -> Vec<(MessageKind, &str)> {
        messages.iter().map(|m| (m.kind, m.text.as_str())).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn start_adds_unanimated_first_message_once() {
        let (engine, session) = engine_for(script()).await;
        assert!(engine.start().await);
        assert!(!engine.start().await);

        let view = engine.view().await;
        assert_eq!(texts(&view.messages), vec![(MessageKind::Guide, "Hi")]);
        assert!(!view.messages[0].animate_words);
        assert_eq!(session.onboarding_progress().await.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_on_empty_script_is_noop() {
        let (engine, _session) = engine_for(Script::new(Vec::new())).await;
        assert!(!engine.start().await);
        assert!(engine.view().await.messages.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn advancing_appends_user_message_immediately() {
        let (engine, _session) = engine_for(script()).await;
        engine.start().await;

        let outcome = engine.select_suggested_answer("ignored").await;
        assert_eq!(outcome, Advance::Advancing { next_index: 1 });

        let view = engine.view().await;
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[1].kind, MessageKind::User);
        assert_eq!(view.messages[1].text, "ignored");
        assert!(view.is_generating);
        assert!(!view.show_suggested_answers);
        assert!(view.visible_suggestions.is_empty());
        assert_eq!(view.current_step_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn guide_message_lands_after_typing_delay() {
        let (engine, _session) = engine_for(script()).await;
        engine.start().await;
        engine.select_suggested_answer("ignored").await;

        wait(TYPING - Duration::from_millis(1)).await;
        assert_eq!(engine.view().await.messages.len(), 2);

        wait(Duration::from_millis(2)).await;
        let view = engine.view().await;
        assert_eq!(view.messages.len(), 3);
        assert_eq!(view.messages[2].text, "Next");
        assert!(view.messages[2].animate_words);
        assert!(!view.is_generating);
        assert!(!view.show_continue);
        // Chips wait for the word reveal
        assert!(!view.show_suggested_answers);
    }

    #[tokio::test(start_paused = true)]
    async fn suggestions_wait_for_reveal_duration() {
        let script = Script::new(vec![
            ScriptStep::new("a", "Hi"),
            ScriptStep::new("b", "one two three four").with_answers(["X"]),
        ]);
        let (engine, _session) = engine_for(script).await;
        engine.start().await;
        engine.submit_free_text("hello").await;

        wait(TYPING + Duration::from_millis(1)).await;
        // 3 * 35 + 180 = 285 after landing
        wait(Duration::from_millis(283)).await;
        assert!(!engine.view().await.show_suggested_answers);

        wait(Duration::from_millis(2)).await;
        let view = engine.view().await;
        assert!(view.show_suggested_answers);
        assert_eq!(view.visible_suggestions, vec!["X"]);
    }

    #[tokio::test(start_paused = true)]
    async fn suggestions_show_immediately_when_step_has_none() {
        let script = Script::new(vec![
            ScriptStep::new("a", "Hi"),
            ScriptStep::new("b", "What do I call you?"),
            ScriptStep::new("c", "Done").outcome(),
        ]);
        let (engine, _session) = engine_for(script).await;
        engine.start().await;
        engine.submit_free_text("x").await;

        wait(TYPING + Duration::from_millis(1)).await;
        let view = engine.view().await;
        assert!(view.show_suggested_answers);
        assert!(view.visible_suggestions.is_empty());
        assert!(engine.is_settled().await);
    }

    #[tokio::test(start_paused = true)]
    async fn answers_while_generating_are_ignored() {
        let (engine, _session) = engine_for(script()).await;
        engine.start().await;
        engine.select_suggested_answer("first").await;

        let before = engine.view().await;
        let outcome = engine.select_suggested_answer("second").await;
        assert_eq!(outcome, Advance::Ignored(IgnoreReason::Generating));
        assert_eq!(engine.view().await, before);

        wait(Duration::from_secs(5)).await;
        let view = engine.view().await;
        let guides = view.messages.iter().filter(|m| m.is_guide()).count();
        assert_eq!(guides, 2, "one advancement yields exactly one guide message");
        assert_eq!(view.current_step_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_free_text_is_ignored() {
        let (engine, _session) = engine_for(script()).await;
        engine.start().await;
        assert_eq!(
            engine.submit_free_text("   \n").await,
            Advance::Ignored(IgnoreReason::EmptyInput)
        );
        assert_eq!(engine.view().await.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn free_text_is_trimmed_and_clears_draft() {
        let (engine, _session) = engine_for(script()).await;
        engine.start().await;
        engine.set_draft("  Sam  ").await;
        assert_eq!(engine.view().await.draft, "  Sam  ");

        assert_eq!(engine.submit_draft().await, Advance::Advancing { next_index: 1 });
        let view = engine.view().await;
        assert_eq!(view.messages[1].text, "Sam");
        assert!(view.draft.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn new_advancement_supersedes_pending_reveal() {
        let script = Script::new(vec![
            ScriptStep::new("a", "Hi"),
            ScriptStep::new("b", "a long guide message with many words in it").with_answers(["X"]),
            ScriptStep::new("c", "Next").with_answers(["Z"]),
            ScriptStep::new("d", "Done").outcome(),
        ]);
        let (engine, _session) = engine_for(script).await;
        engine.start().await;
        engine.submit_free_text("one").await;
        wait(TYPING + Duration::from_millis(1)).await;
        assert!(!engine.is_settled().await, "reveal still pending");

        // Typing during the reveal window is allowed
        assert_eq!(
            engine.submit_free_text("two").await,
            Advance::Advancing { next_index: 2 }
        );
        wait(TYPING + Duration::from_millis(1)).await;
        let view = engine.view().await;
        assert!(!view.show_suggested_answers, "stale reveal must not fire");

        wait(Duration::from_millis(181)).await;
        let view = engine.view().await;
        assert!(view.show_suggested_answers);
        assert_eq!(view.visible_suggestions, vec!["Z"]);
    }

    #[tokio::test(start_paused = true)]
    async fn outcome_step_shows_continue() {
        let (engine, _session) = engine_for(script()).await;
        engine.start().await;
        engine.select_suggested_answer("ignored").await;
        wait(Duration::from_secs(2)).await;
        engine.select_suggested_answer("X").await;
        wait(Duration::from_secs(2)).await;

        let view = engine.view().await;
        assert!(view.show_continue);
        assert_eq!(view.messages.last().unwrap().text, "Done");
        assert!(view.visible_suggestions.is_empty());

        assert_eq!(
            engine.select_suggested_answer("more").await,
            Advance::Ignored(IgnoreReason::AlreadyFinished)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn script_without_outcome_finishes_at_last_step() {
        let script = Script::new(vec![ScriptStep::new("a", "Hi"), ScriptStep::new("b", "Bye")]);
        let (engine, _session) = engine_for(script).await;
        engine.start().await;
        engine.submit_free_text("hey").await;
        wait(Duration::from_secs(2)).await;
        assert!(!engine.view().await.show_continue);

        assert_eq!(engine.submit_free_text("ok").await, Advance::Finished);
        let view = engine.view().await;
        assert!(view.show_continue);
        assert_eq!(view.messages.last().unwrap().text, "ok");
        assert_eq!(view.messages.iter().filter(|m| m.is_guide()).count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn answering_outcome_step_from_checkpoint_finishes() {
        let session = SessionScope::new().open();
        let progress = OnboardingProgress {
            messages: vec![Message::guide("Done")],
            current_step_index: 2,
            show_continue: false,
            show_suggested_answers: true,
        };
        let engine =
            ConversationEngine::with_progress(script(), session.clone(), TimingConfig::default(), progress);
        assert_eq!(engine.submit_free_text("thanks").await, Advance::Finished);
        assert!(session.onboarding_progress().await.show_continue);
    }

    #[tokio::test(start_paused = true)]
    async fn checkpoints_skip_unsettled_states() {
        let (engine, session) = engine_for(script()).await;
        engine.start().await;
        let before = session.onboarding_progress().await;

        engine.select_suggested_answer("ignored").await;
        assert_eq!(session.onboarding_progress().await, before);

        // Guide message landed but chips are still revealing
        wait(TYPING + Duration::from_millis(1)).await;
        assert_eq!(session.onboarding_progress().await, before);

        wait(Duration::from_millis(200)).await;
        let saved = session.onboarding_progress().await;
        assert_eq!(saved, engine.progress().await);
        assert_eq!(saved.current_step_index, 1);
        assert!(saved.show_suggested_answers);
        assert_eq!(saved.messages.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn restores_from_session_checkpoint() {
        let (engine, session) = engine_for(script()).await;
        engine.start().await;
        engine.select_suggested_answer("ignored").await;
        wait(Duration::from_secs(2)).await;
        let progress = engine.progress().await;
        drop(engine);

        let resumed = ConversationEngine::new(script(), session.clone(), TimingConfig::default()).await;
        assert_eq!(resumed.progress().await, progress);
        assert!(!resumed.start().await, "start is a no-op after restore");
        assert_eq!(resumed.view().await.visible_suggestions, vec!["X", "Y"]);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_pending_tasks() {
        let (engine, session) = engine_for(script()).await;
        engine.start().await;
        engine.select_suggested_answer("ignored").await;
        engine.dispose().await;

        wait(Duration::from_secs(5)).await;
        let view = engine.view().await;
        assert_eq!(view.messages.len(), 2);
        assert_eq!(session.onboarding_progress().await.messages.len(), 1);
        assert_eq!(
            engine.submit_free_text("again").await,
            Advance::Ignored(IgnoreReason::Disposed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_tasks() {
        let (engine, session) = engine_for(script()).await;
        engine.start().await;
        engine.select_suggested_answer("ignored").await;
        drop(engine);

        wait(Duration::from_secs(5)).await;
        assert_eq!(session.onboarding_progress().await.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn continue_requires_outcome() {
        let (engine, session) = engine_for(script()).await;
        engine.start().await;
        assert!(matches!(
            engine.continue_onboarding().await,
            Err(ConversationError::ContinueUnavailable)
        ));
        assert_eq!(session.screen().await, Screen::Onboarding);
    }

    #[tokio::test(start_paused = true)]
    async fn continue_hands_over_to_sign_up() {
        let (engine, session) = engine_for(script()).await;
        engine.start().await;
        engine.submit_free_text("a").await;
        wait(Duration::from_secs(2)).await;
        engine.submit_free_text("b").await;
        wait(Duration::from_secs(2)).await;

        engine.continue_onboarding().await.unwrap();
        assert!(engine.is_completed().await);
        assert_eq!(session.screen().await, Screen::SignUp);
        assert_eq!(
            session.auth_return_path().await,
            Some(crate::session::AuthReturnPath::Onboarding)
        );
        // Transcript is kept as final
        assert!(session.onboarding_progress().await.show_continue);
    }

    #[tokio::test(start_paused = true)]
    async fn continue_only_hands_over_once() {
        let (engine, session) = engine_for(script()).await;
        engine.start().await;
        engine.submit_free_text("a").await;
        wait(Duration::from_secs(2)).await;
        engine.submit_free_text("b").await;
        wait(Duration::from_secs(2)).await;
        let mut rx = engine.subscribe();

        engine.continue_onboarding().await.unwrap();
        session.complete_sign_up().await;

        assert!(matches!(
            engine.continue_onboarding().await,
            Err(ConversationError::ContinueUnavailable)
        ));
        assert_eq!(session.screen().await, Screen::App);

        let mut completions = 0;
        while let Ok(event) = rx.try_recv() {
            if event == EngineEvent::Completed {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn finishing_during_reveal_voids_the_pending_reveal() {
        let script = Script::new(vec![
            ScriptStep::new("a", "Hi"),
            ScriptStep::new("b", "Pick one").with_answers(["X", "Y"]),
        ]);
        let (engine, session) = engine_for(script).await;
        let mut rx = engine.subscribe();
        engine.start().await;
        engine.submit_free_text("one").await;
        wait(TYPING + Duration::from_millis(1)).await;
        let reveal_epoch = engine.shared.state.lock().await.epoch;

        assert_eq!(engine.submit_free_text("two").await, Advance::Finished);

        // A reveal whose timer won the race against cancellation still lands
        on_reveal_elapsed(Arc::downgrade(&engine.shared), reveal_epoch).await;
        wait(Duration::from_secs(1)).await;

        let view = engine.view().await;
        assert!(view.show_continue);
        assert!(!view.show_suggested_answers);
        assert!(!session.onboarding_progress().await.show_suggested_answers);

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            assert!(
                !matches!(event, EngineEvent::SuggestionsRevealed { .. }),
                "chips revealed after the conversation finished"
            );
            last = Some(event);
        }
        assert_eq!(last, Some(EngineEvent::ContinueAvailable));
    }

    #[tokio::test(start_paused = true)]
    async fn collapse_resets_on_advance() {
        let (engine, _session) = engine_for(script()).await;
        engine.start().await;
        assert!(engine.toggle_suggestions_collapsed().await);
        engine.submit_free_text("x").await;
        assert!(!engine.view().await.suggestions_collapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn events_follow_the_transcript() {
        let (engine, _session) = engine_for(script()).await;
        let mut rx = engine.subscribe();
        engine.start().await;
        engine.select_suggested_answer("ignored").await;
        wait(Duration::from_secs(2)).await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                EngineEvent::MessageAppended(m) if m.is_guide() => "guide",
                EngineEvent::MessageAppended(_) => "user",
                EngineEvent::TypingStarted => "typing",
                EngineEvent::SuggestionsRevealed { .. } => "chips",
                EngineEvent::ContinueAvailable => "continue",
                EngineEvent::Completed => "completed",
            })
            .collect();
        assert_eq!(kinds, vec!["guide", "user", "typing", "guide", "chips"]);
    }
}
