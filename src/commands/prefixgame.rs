use tracing::{info, instrument};

use super::round;
use crate::{
    games::{
        collector::{Collector, PrefixJudge},
        rounds::Round,
        GameError, GameKind,
    },
    utils::{
        poise::{CommandResult, ContextExt},
        Context,
    },
};

/// race to send the longest word starting with a prefix
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    guild_only,
    discard_spare_arguments,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL | ADD_REACTIONS"
)]
pub async fn prefixgame(ctx: Context<'_>) -> CommandResult {
    ctx.log_command().await;

    let games = ctx.data().games();
    let key = ctx.session_key(GameKind::PrefixRace);
    let window = ctx.data().config().games.race_window();

    let prefix = {
        let mut rng = rand::thread_rng();
        games.corpus().random_prefix(&mut rng).map(str::to_owned)
    };
    let Some(prefix) = prefix else {
        return Err(GameError::NoWords(GameKind::PrefixRace).into());
    };

    let corpus = games.corpus().clone();
    let handle = games
        .rounds()
        .start(key, window, |deadline| {
            Round::PrefixRace(Collector::new(PrefixJudge::new(&prefix), corpus, deadline))
        })
        .await?;

    info!(
        %prefix,
        candidates = games.corpus().words_with_prefix(&prefix).len(),
        "prefix race started"
    );

    ctx.say(format!(
        "🏁 longest word starting with **{}** wins! you have {} seconds",
        prefix.to_uppercase(),
        window.as_secs()
    ))
    .await?;

    let outcome = round::listen(ctx, &handle).await?;
    round::settle(ctx, outcome).await
}
