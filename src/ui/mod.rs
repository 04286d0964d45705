//! Console output for the shellcache CLI
//!
//! Uses `cliclack` for interactive terminals and falls back to plain
//! `[OK]` / `[WARN]` lines in CI or when output is piped.
//!
//! # Example
//!
//! ```rust,ignore
//! use shellcache::ui::{self, Mark, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "Install finance-tracker-v4");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Activating waiting worker...");
//! spinner.stop("finance-tracker-v4 is active");
//!
//! ui::emit_all(&ctx, &ui::activation_lines(&report));
//! ui::outro(&ctx, Mark::Ok, "Worker activated");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod report;

pub use context::UiContext;
pub use output::{emit, emit_all, intro, outro, remark, step, Line, Mark};
pub use progress::{PrecacheProgress, TaskSpinner};
pub use prompts::confirm;
pub use report::{
    activation_lines, activation_summary, fetch_status, install_lines, install_summary,
};
