//! Confirmation prompt with non-interactive fallback

use super::context::UiContext;
use crate::error::{ShellcacheError, ShellcacheResult};

/// Ask a yes/no question.
///
/// Auto-yes answers true; a non-interactive context answers `default`.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> ShellcacheResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| ShellcacheError::Internal(format!("prompt task failed: {}", e)))?
    .map_err(|e| ShellcacheError::User(format!("Prompt cancelled: {}", e)))
}
