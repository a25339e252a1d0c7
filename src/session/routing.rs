//! Routing glue: maps a screen mode to the view that presents it.

use super::state::Screen;

/// Top-level navigable route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Onboarding,
    Login,
    SignUp,
    Tabs,
}

impl Route {
    pub fn for_screen(screen: Screen) -> Self {
        match screen {
            Screen::Onboarding => Self::Onboarding,
            Screen::Login => Self::Login,
            Screen::SignUp => Self::SignUp,
            Screen::App => Self::Tabs,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Onboarding => "/onboarding",
            Self::Login => "/login",
            Self::SignUp => "/signup",
            Self::Tabs => "/(tabs)",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
