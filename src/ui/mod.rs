//! Terminal output for the geocache CLI
//!
//! Uses `cliclack` for spinners and prompts in interactive terminals and
//! falls back to plain, line-oriented output when piped or running in CI.

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{intro, key_value, remark, step_info, step_ok, step_warn};
pub use progress::{BatchProgress, TaskSpinner};
pub use prompts::confirm;
