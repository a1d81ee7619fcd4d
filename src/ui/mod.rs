//! Terminal output for depvault commands
//!
//! Interactive terminals get `cliclack` styling and spinners; pipes and CI get
//! plain bracketed status lines that are easy to grep.

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{key_value, remark, section, step_info, step_ok, step_ok_detail, step_warn, step_warn_hint};
pub use progress::TaskSpinner;
pub use prompts::confirm;
