//! Error types for Wave.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session holder errors.
///
/// These are programming errors: a view asked for the session outside the
/// scope that owns it.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No session is open; a session handle must come from an open SessionScope")]
    NotInitialized,
}

/// Errors loading the onboarding script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Failed to read script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse script {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Script has no steps")]
    Empty,
}

/// Conversation engine errors.
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Continue is not available until the conversation reaches its outcome")]
    ContinueUnavailable,
}

/// Result type alias for Wave.
pub type Result<T> = std::result::Result<T, Error>;
