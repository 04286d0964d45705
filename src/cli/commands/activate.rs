//! Activate command - promote the waiting worker

use super::Host;
use crate::config::Config;
use crate::error::ShellcacheResult;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the activate command
pub async fn execute(config: &Config, ephemeral: bool) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let mut host = Host::open(config, ephemeral).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Activating waiting worker...");
    let report = match host.registration.activate_waiting().await {
        Ok(report) if report.failed.is_empty() => {
            spinner.stop(&format!("{} is active", report.generation));
            report
        }
        Ok(report) => {
            spinner.stop_warn(&format!(
                "{} is active, old caches could not all be removed",
                report.generation
            ));
            report
        }
        Err(e) => {
            spinner.stop_error("Activation failed");
            return Err(e);
        }
    };

    ui::emit_all(&ctx, &ui::activation_lines(&report));
    host.close().await?;

    let (mark, message) = ui::activation_summary(&report);
    ui::outro(&ctx, mark, &message);
    Ok(())
}
