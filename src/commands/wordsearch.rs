use tracing::{info, instrument};

use super::round;
use crate::{
    games::{
        grid::GridGenerator,
        rounds::Round,
        word_search::{self, WordSearch},
        GameError, GameKind,
    },
    utils::{
        poise::{CommandResult, ContextExt},
        Context,
    },
};

/// find the hidden words in a grid of letters
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    guild_only,
    discard_spare_arguments,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL | ADD_REACTIONS"
)]
pub async fn wordsearch(ctx: Context<'_>) -> CommandResult {
    ctx.log_command().await;

    let games = ctx.data().games();
    let config = &ctx.data().config().games;
    let key = ctx.session_key(GameKind::WordSearch);

    // no point building a grid nobody will see
    if games.rounds().is_active(key).await {
        return Err(GameError::AlreadyActive(GameKind::WordSearch).into());
    }

    let generator = GridGenerator::new(config.grid_size).rebuilds(config.grid_rebuilds);
    let search = {
        let mut rng = rand::thread_rng();
        WordSearch::generate(
            games.corpus(),
            &generator,
            &word_search::DEFAULT_CLASSES,
            &mut rng,
        )?
    };

    let board = search.render();
    let targets = search.targets().len();
    let window = config.word_search_window();

    let handle = games
        .rounds()
        .start(key, window, |_| Round::WordSearch(search))
        .await?;

    info!(targets, "word search started");

    ctx.say(format!(
        "🔎 word search! send the words as you find them ({} minutes)\n{board}",
        window.as_secs() / 60
    ))
    .await?;

    let outcome = round::listen(ctx, &handle).await?;
    round::settle(ctx, outcome).await
}

/// give up on the word search in this channel
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    guild_only,
    discard_spare_arguments,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL"
)]
pub async fn endwordsearch(ctx: Context<'_>) -> CommandResult {
    ctx.log_command().await;

    let key = ctx.session_key(GameKind::WordSearch);
    let outcome = ctx.data().games().rounds().end(key).await?;

    round::settle(ctx, Some(outcome)).await
}
