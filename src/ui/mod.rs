//! Terminal output helpers
//!
//! Styled step lines and progress indicators in an interactive terminal,
//! plain bracketed lines when output is piped or running under CI.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, step_info, step_ok_detail, step_warn, step_warn_hint};
pub use progress::{InstallProgress, TaskSpinner};
