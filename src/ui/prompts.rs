//! Confirmation prompts with non-interactive fallback

use super::context::UiContext;
use crate::error::{GeocacheError, GeocacheResult};

/// Ask for confirmation; auto-yes approves and non-interactive returns `default`
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> GeocacheResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on stdin
    let message = message.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await
    .map_err(|e| GeocacheError::Internal(format!("prompt task failed: {}", e)))?;

    answer.map_err(|e| GeocacheError::User(format!("Prompt failed: {}", e)))
}
