use tracing::{debug, info, instrument};

use super::round;
use crate::{
    games::{
        rounds::Round,
        unscramble::Unscramble,
        GameError, GameKind,
    },
    utils::{
        poise::{CommandResult, ContextExt},
        Context,
    },
};

/// unscramble a word, just for you
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    guild_only,
    discard_spare_arguments,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL"
)]
pub async fn unscramble(ctx: Context<'_>) -> CommandResult {
    ctx.log_command().await;

    let games = ctx.data().games();

    let game = {
        let mut rng = rand::thread_rng();
        games
            .corpus()
            .random_puzzle_word(&mut rng)
            .map(|word| Unscramble::new(word, &mut rng))
    };
    let Some(game) = game else {
        return Err(GameError::NoWords(GameKind::Unscramble).into());
    };

    let scrambled = game.scrambled().to_uppercase();
    let idle = ctx.data().config().games.unscramble_idle();

    let key = ctx.session_key(GameKind::Unscramble);
    games
        .rounds()
        .start(key, idle, |_| Round::Unscramble(game))
        .await?;

    info!(%scrambled, "unscramble started");

    let prefix = ctx.data().config().bot.prefix();
    ctx.reply(format!(
        "🔀 unscramble this: **{scrambled}**\n\
         answer with `{prefix}guess <word>`, or try `{prefix}hint` and `{prefix}reveal`"
    ))
    .await?;

    Ok(())
}

/// guess the word in your unscramble
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL"
)]
pub async fn guess(ctx: Context<'_>, word: String) -> CommandResult {
    ctx.log_command().await;

    let key = ctx.session_key(GameKind::Unscramble);

    match ctx.data().games().rounds().guess(key, &word).await? {
        Some(outcome) => round::settle(ctx, Some(outcome)).await,
        None => {
            debug!("wrong guess");
            ctx.reply("nope, not quite!").await?;
            Ok(())
        }
    }
}

/// uncover a letter of your unscramble
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    guild_only,
    discard_spare_arguments,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL"
)]
pub async fn hint(ctx: Context<'_>) -> CommandResult {
    ctx.log_command().await;

    let key = ctx.session_key(GameKind::Unscramble);
    let hint = ctx.data().games().rounds().hint(key).await?;

    ctx.reply(format!("hint #{}: `{}`", hint.number, hint.pattern))
        .await?;

    Ok(())
}

/// give up and see the word
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    guild_only,
    discard_spare_arguments,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL"
)]
pub async fn reveal(ctx: Context<'_>) -> CommandResult {
    ctx.log_command().await;

    let key = ctx.session_key(GameKind::Unscramble);
    let outcome = ctx.data().games().rounds().reveal(key).await?;

    round::settle(ctx, Some(outcome)).await
}
