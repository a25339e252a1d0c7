//! Session state: top-level screen mode, auth return path, onboarding checkpoint.

use serde::{Deserialize, Serialize};

use crate::onboarding::model::OnboardingProgress;

/// Coarse top-level mode of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Onboarding,
    SignUp,
    Login,
    App,
}

impl Default for Screen {
    fn default() -> Self {
        Self::Onboarding
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Onboarding => "onboarding",
            Self::SignUp => "signup",
            Self::Login => "login",
            Self::App => "app",
        };
        write!(f, "{s}")
    }
}

/// Where to go when the user backs out of login or sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthReturnPath {
    #[serde(rename = "/onboarding")]
    Onboarding,
    #[serde(rename = "/login")]
    Login,
    #[serde(rename = "/signup")]
    SignUp,
    #[serde(rename = "/(tabs)")]
    Tabs,
}

impl AuthReturnPath {
    /// The screen this return path lands on.
    pub fn screen(&self) -> Screen {
        match self {
            Self::Onboarding => Screen::Onboarding,
            Self::Login => Screen::Login,
            Self::SignUp => Screen::SignUp,
            Self::Tabs => Screen::App,
        }
    }
}

/// Everything the session holder owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub screen: Screen,
    pub auth_return_path: Option<AuthReturnPath>,
    pub onboarding_progress: OnboardingProgress,
}
