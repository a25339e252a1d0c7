//! Terminal front end: a stdin/stdout REPL standing in for the app's views.
//!
//! The session's screen decides which view handles a line. The onboarding
//! view mounts a `ConversationEngine` while it is on screen and disposes it on
//! the way out; its progress lives on in the session checkpoint.

use futures::{Stream, StreamExt, stream};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::config::TimingConfig;
use crate::onboarding::{Advance, ConversationEngine, EngineEvent, IgnoreReason, MessageKind, Script};
use crate::session::{AuthReturnPath, Route, Screen, SessionHandle};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    Login,
    SignUp,
    Back,
    /// Submit the login or sign-up form.
    Submit,
    Continue,
    Logout,
    ToggleSuggestions,
    /// Pick the n-th (1-based) suggested answer.
    Pick(usize),
    Text(String),
}

impl Command {
    /// Parse one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let command = match line {
            "/quit" | "/exit" => Self::Quit,
            "/login" => Self::Login,
            "/signup" => Self::SignUp,
            "/back" => Self::Back,
            "/submit" => Self::Submit,
            "/continue" => Self::Continue,
            "/logout" => Self::Logout,
            "/hide" | "/show" => Self::ToggleSuggestions,
            s if s.starts_with('/') => Self::Help,
            s => match s.parse::<usize>() {
                Ok(n) if n > 0 => Self::Pick(n),
                _ => Self::Text(s.to_string()),
            },
        };
        Some(command)
    }
}

fn help(screen: Screen) -> &'static str {
    match screen {
        Screen::Onboarding => {
            "Answer in your own words or type a suggestion's number. /hide toggles suggestions, \
             /login to log in, /quit to exit."
        }
        Screen::Login => "/submit to log in, /signup to create an account, /back to go back.",
        Screen::SignUp => "/submit to create your account, /login to log in, /back to go back.",
        Screen::App => "You're in! /logout to start over, /quit to exit.",
    }
}

/// Onboarding engine plus the task printing its events.
struct MountedOnboarding {
    engine: ConversationEngine,
    renderer: JoinHandle<()>,
}

impl MountedOnboarding {
    async fn mount(script: Script, session: SessionHandle, timing: TimingConfig) -> Self {
        let engine = ConversationEngine::new(script, session, timing).await;
        let mut events = engine.subscribe();

        // Replay what a restored transcript already holds
        let view = engine.view().await;
        for message in &view.messages {
            print_message(message.kind, &message.text);
        }
        if !view.visible_suggestions.is_empty() && !view.suggestions_collapsed {
            print_suggestions(&view.visible_suggestions);
        }
        if view.show_continue {
            print_continue();
        }

        let renderer = tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                render(event);
            }
        });
        engine.start().await;
        Self { engine, renderer }
    }

    async fn unmount(self) {
        self.engine.dispose().await;
        self.renderer.abort();
    }
}

fn render(event: EngineEvent) {
    match event {
        EngineEvent::MessageAppended(message) => {
            // The user's own lines are already on screen
            if message.kind == MessageKind::Guide {
                print_message(message.kind, &message.text);
            }
        }
        EngineEvent::TypingStarted => eprintln!("   Wave is typing..."),
        EngineEvent::SuggestionsRevealed { answers } => print_suggestions(&answers),
        EngineEvent::ContinueAvailable => print_continue(),
        EngineEvent::Completed => {}
    }
}

fn print_message(kind: MessageKind, text: &str) {
    match kind {
        MessageKind::Guide => println!("\nWave: {}\n", text),
        MessageKind::User => println!("You:  {}", text),
    }
}

fn print_suggestions(answers: &[String]) {
    for (i, answer) in answers.iter().enumerate() {
        eprintln!("   [{}] {}", i + 1, answer);
    }
}

fn print_continue() {
    eprintln!("   Type /continue to create your account.");
}

/// Stdin lines as a stream, read on a background task.
fn stdin_lines() -> impl Stream<Item = String> + Unpin {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });
    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|line| (line, rx))
    }))
}

enum Flow {
    Continue,
    Quit,
}

/// REPL driving the session through onboarding, auth and the app.
pub struct CliFrontend {
    session: SessionHandle,
    script: Script,
    timing: TimingConfig,
}

impl CliFrontend {
    pub fn new(session: SessionHandle, script: Script, timing: TimingConfig) -> Self {
        Self {
            session,
            script,
            timing,
        }
    }

    pub async fn run(self) {
        let mut lines = stdin_lines();
        let mut screens = self.session.watch_screen();
        let mut mounted: Option<MountedOnboarding> = None;

        let mut screen = *screens.borrow_and_update();
        self.navigate(screen, &mut mounted).await;

        loop {
            tokio::select! {
                biased;
                changed = screens.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = *screens.borrow_and_update();
                    if next != screen {
                        screen = next;
                        self.navigate(screen, &mut mounted).await;
                    }
                }
                line = lines.next() => {
                    let Some(line) = line else {
                        break;
                    };
                    let Some(command) = Command::parse(&line) else {
                        continue;
                    };
                    if let Flow::Quit = self.dispatch(screen, command, mounted.as_ref()).await {
                        break;
                    }
                }
            }
        }

        if let Some(onboarding) = mounted.take() {
            onboarding.unmount().await;
        }
    }

    /// Present the view for `screen`, mounting or unmounting onboarding.
    async fn navigate(&self, screen: Screen, mounted: &mut Option<MountedOnboarding>) {
        let route = Route::for_screen(screen);
        debug!(%route, "Navigating");
        if screen != Screen::Onboarding {
            if let Some(onboarding) = mounted.take() {
                onboarding.unmount().await;
            }
        }
        eprintln!("\n── {} ──", route);
        eprintln!("   {}", help(screen));
        if screen == Screen::Onboarding && mounted.is_none() {
            *mounted = Some(
                MountedOnboarding::mount(self.script.clone(), self.session.clone(), self.timing)
                    .await,
            );
        }
    }

    async fn dispatch(
        &self,
        screen: Screen,
        command: Command,
        onboarding: Option<&MountedOnboarding>,
    ) -> Flow {
        if command == Command::Quit {
            return Flow::Quit;
        }
        match screen {
            Screen::Onboarding => match onboarding {
                Some(mounted) => self.onboarding(&mounted.engine, command).await,
                None => eprintln!("   {}", help(screen)),
            },
            Screen::Login => match command {
                Command::Submit => self.session.set_screen(Screen::App).await,
                Command::SignUp => self.session.go_to_sign_up(Some(AuthReturnPath::Login)).await,
                Command::Back => {
                    self.session.go_back().await;
                }
                _ => eprintln!("   {}", help(screen)),
            },
            Screen::SignUp => match command {
                Command::Submit => self.session.complete_sign_up().await,
                Command::Login => self.session.go_to_login(Some(AuthReturnPath::SignUp)).await,
                Command::Back => {
                    self.session.go_back().await;
                }
                _ => eprintln!("   {}", help(screen)),
            },
            Screen::App => match command {
                Command::Logout => self.session.logout().await,
                _ => eprintln!("   {}", help(screen)),
            },
        }
        Flow::Continue
    }

    async fn onboarding(&self, engine: &ConversationEngine, command: Command) {
        let outcome = match command {
            Command::Login => {
                self.session.go_to_login(None).await;
                return;
            }
            Command::Continue => {
                if engine.continue_onboarding().await.is_err() {
                    eprintln!("   Almost there, answer a few more questions first.");
                }
                return;
            }
            Command::ToggleSuggestions => {
                let collapsed = engine.toggle_suggestions_collapsed().await;
                let view = engine.view().await;
                if !collapsed {
                    print_suggestions(&view.visible_suggestions);
                }
                return;
            }
            Command::Pick(n) => {
                let view = engine.view().await;
                match view.visible_suggestions.get(n - 1) {
                    Some(answer) => {
                        print_message(MessageKind::User, answer);
                        engine.select_suggested_answer(answer).await
                    }
                    None => engine.submit_free_text(&n.to_string()).await,
                }
            }
            Command::Text(text) => {
                engine.set_draft(text).await;
                engine.submit_draft().await
            }
            _ => {
                eprintln!("   {}", help(Screen::Onboarding));
                return;
            }
        };
        if let Advance::Ignored(IgnoreReason::Generating) = outcome {
            eprintln!("   One moment, Wave is still typing.");
        }
    }
}
