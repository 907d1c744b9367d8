use tracing::{info, instrument};

use super::round;
use crate::{
    games::{
        collector::{Collector, RhymeJudge},
        rounds::Round,
        GameError, GameKind,
    },
    utils::{
        poise::{CommandResult, ContextExt},
        Context,
    },
};

/// race to send the most words that rhyme with a target
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    guild_only,
    discard_spare_arguments,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL | ADD_REACTIONS"
)]
pub async fn rhyme(ctx: Context<'_>) -> CommandResult {
    ctx.log_command().await;

    let games = ctx.data().games();
    let config = &ctx.data().config().games;
    let key = ctx.session_key(GameKind::RhymeRace);
    let window = config.race_window();

    let target = {
        let mut rng = rand::thread_rng();
        games
            .corpus()
            .random_rhyme_target(config.min_rhymes, &mut rng)
            .map(str::to_owned)
    };
    let Some(target) = target else {
        return Err(GameError::NoWords(GameKind::RhymeRace).into());
    };

    let corpus = games.corpus().clone();
    let handle = games
        .rounds()
        .start(key, window, |deadline| {
            Round::RhymeRace(Collector::new(RhymeJudge::new(&target), corpus, deadline))
        })
        .await?;

    info!(
        %target,
        rhymes = games.corpus().rhymes_of(&target).len(),
        "rhyme race started"
    );

    ctx.say(format!(
        "🎤 send words that rhyme with **{}**! most rhymes in {} seconds wins",
        target.to_uppercase(),
        window.as_secs()
    ))
    .await?;

    let outcome = round::listen(ctx, &handle).await?;
    round::settle(ctx, outcome).await
}
