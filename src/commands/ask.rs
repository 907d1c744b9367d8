use poise::CreateReply;
use tracing::{error, instrument, warn};

use crate::utils::{
    poise::{CommandResult, ContextExt},
    Context,
};

pub mod core;
use self::core::fit_message;

/// talk to pikabug
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL"
)]
pub async fn ask(ctx: Context<'_>, #[rest] prompt: String) -> CommandResult {
    ctx.log_command().await;

    let relay = ctx.data().relay();

    if !relay.is_configured() {
        ctx.reply_ephemeral("sorry, asking isn't set up right now!")
            .await?;
        return Ok(());
    }

    let thinking = ctx.reply("thinking...").await?;

    let content = match relay
        .ask((ctx.guild_id(), ctx.author().id), &prompt)
        .await
    {
        Ok(reply) => reply,
        Err(err) => {
            error!(%err, "chat relay failed");
            format!("⚠️ something went wrong: {err}")
        }
    };

    let fitted = fit_message(&content);
    if fitted != content {
        warn!(chars = content.chars().count(), "reply too long, cutting it short");
    }

    thinking
        .edit(ctx, CreateReply::default().content(fitted))
        .await?;

    Ok(())
}
