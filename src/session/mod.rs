//! Navigation/session state: which top-level screen the app shows and the
//! onboarding checkpoint that survives leaving the onboarding screen.

pub mod holder;
pub mod routing;
pub mod state;

pub use holder::{SessionHandle, SessionScope};
pub use routing::Route;
pub use state::{AuthReturnPath, Screen, SessionState};
