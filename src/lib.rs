//! Wave: onboarding conversation and session navigation core.

pub mod cli;
pub mod config;
pub mod error;
pub mod onboarding;
pub mod session;
