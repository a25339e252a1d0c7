//! Session holder: the single owner of screen mode and onboarding checkpoint.
//!
//! A `SessionScope` is created once at startup and opens at most one session.
//! Views never reach the session through a global: they are handed a
//! `SessionHandle` obtained from the scope, and asking an empty scope for a
//! handle is an error.

use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tracing::{debug, info};

use crate::error::SessionError;
use crate::onboarding::model::OnboardingProgress;

use super::state::{AuthReturnPath, Screen, SessionState};

struct SessionInner {
    state: RwLock<SessionState>,
    screen_tx: watch::Sender<Screen>,
}

/// Shared handle to the live session. Cloning is cheap.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    fn new() -> Self {
        let state = SessionState::default();
        let (screen_tx, _rx) = watch::channel(state.screen);
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(state),
                screen_tx,
            }),
        }
    }

    /// Current top-level screen.
    pub async fn screen(&self) -> Screen {
        self.inner.state.read().await.screen
    }

    /// Where backing out of login/sign-up leads, if recorded.
    pub async fn auth_return_path(&self) -> Option<AuthReturnPath> {
        self.inner.state.read().await.auth_return_path
    }

    /// Copy of the onboarding checkpoint.
    pub async fn onboarding_progress(&self) -> OnboardingProgress {
        self.inner.state.read().await.onboarding_progress.clone()
    }

    /// Copy of the whole session state.
    pub async fn state(&self) -> SessionState {
        self.inner.state.read().await.clone()
    }

    /// Subscribe to screen changes. Routing glue watches this.
    pub fn watch_screen(&self) -> watch::Receiver<Screen> {
        self.inner.screen_tx.subscribe()
    }

    /// Unconditionally switch the top-level screen.
    pub async fn set_screen(&self, screen: Screen) {
        let mut state = self.inner.state.write().await;
        self.transition(&mut state, screen);
    }

    pub async fn set_auth_return_path(&self, path: Option<AuthReturnPath>) {
        self.inner.state.write().await.auth_return_path = path;
    }

    /// Go to login, remembering where the user came from (onboarding by default).
    pub async fn go_to_login(&self, from: Option<AuthReturnPath>) {
        let mut state = self.inner.state.write().await;
        state.auth_return_path = Some(from.unwrap_or(AuthReturnPath::Onboarding));
        self.transition(&mut state, Screen::Login);
    }

    /// Go to sign-up, remembering where the user came from (login by default).
    pub async fn go_to_sign_up(&self, from: Option<AuthReturnPath>) {
        let mut state = self.inner.state.write().await;
        state.auth_return_path = Some(from.unwrap_or(AuthReturnPath::Login));
        self.transition(&mut state, Screen::SignUp);
    }

    /// Onboarding always funnels into sign-up.
    pub async fn complete_onboarding(&self) {
        let mut state = self.inner.state.write().await;
        state.auth_return_path = Some(AuthReturnPath::Onboarding);
        self.transition(&mut state, Screen::SignUp);
    }

    pub async fn complete_sign_up(&self) {
        let mut state = self.inner.state.write().await;
        self.transition(&mut state, Screen::App);
    }

    /// Return to the screen recorded by the last auth navigation.
    pub async fn go_back(&self) -> Screen {
        let mut state = self.inner.state.write().await;
        let target = state
            .auth_return_path
            .map(|p| p.screen())
            .unwrap_or(Screen::Onboarding);
        self.transition(&mut state, target);
        target
    }

    /// Full session reset: drops onboarding progress and re-enters onboarding.
    pub async fn logout(&self) {
        let mut state = self.inner.state.write().await;
        state.onboarding_progress = OnboardingProgress::default();
        self.transition(&mut state, Screen::Onboarding);
        info!("Session logged out");
    }

    /// Replace the onboarding checkpoint wholesale.
    pub async fn replace_progress(&self, progress: OnboardingProgress) {
        let mut state = self.inner.state.write().await;
        debug!(
            messages = progress.messages.len(),
            step = progress.current_step_index,
            "Onboarding progress saved"
        );
        state.onboarding_progress = progress;
    }

    /// Derive the next checkpoint from the previous one under a single lock.
    pub async fn update_progress<F>(&self, f: F)
    where
        F: FnOnce(&OnboardingProgress) -> OnboardingProgress,
    {
        let mut state = self.inner.state.write().await;
        let next = f(&state.onboarding_progress);
        state.onboarding_progress = next;
    }

    /// Reset the onboarding checkpoint without touching the screen.
    pub async fn clear_onboarding_progress(&self) {
        self.inner.state.write().await.onboarding_progress = OnboardingProgress::default();
    }

    fn transition(&self, state: &mut SessionState, to: Screen) {
        let from = state.screen;
        state.screen = to;
        info!(%from, %to, "Screen transition");
        self.inner.screen_tx.send_replace(to);
    }
}

/// Owner of the application's session. Created once, at process start.
#[derive(Default)]
pub struct SessionScope {
    session: Option<SessionHandle>,
}

impl SessionScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the session, returning its handle. Reopening an open scope keeps
    /// the existing session.
    pub fn open(&mut self) -> SessionHandle {
        self.session.get_or_insert_with(SessionHandle::new).clone()
    }

    /// Tear the session down. Subsequent `handle()` calls fail.
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            info!("Session closed");
        }
    }

    /// Handle to the open session.
    pub fn handle(&self) -> Result<SessionHandle, SessionError> {
        self.session.clone().ok_or(SessionError::NotInitialized)
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }
}
