use std::fmt::Write;

use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::instrument;

use crate::{
    games::{GameKind, PointRecord},
    utils::{
        poise::{CommandResult, ContextExt},
        Context,
    },
};

const LEADERBOARD_SIZE: usize = 10;

const KINDS: [GameKind; 4] = [
    GameKind::PrefixRace,
    GameKind::RhymeRace,
    GameKind::WordSearch,
    GameKind::Unscramble,
];

/// see how many points you (or someone else) have
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL"
)]
pub async fn points(ctx: Context<'_>, user: Option<serenity::User>) -> CommandResult {
    ctx.log_command().await;

    let Some(guild) = ctx.guild_id() else {
        return Ok(());
    };
    let user = user.as_ref().unwrap_or_else(|| ctx.author());

    let record = ctx.data().games().ledger().get(guild, user.id).await?;

    let text = match record {
        Some(record) => summary(&record),
        None => format!("{} hasn't scored any points yet", user.id.mention()),
    };

    ctx.say(text).await?;

    Ok(())
}

/// the top scorers in this server
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    guild_only,
    discard_spare_arguments,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL"
)]
pub async fn leaderboard(ctx: Context<'_>) -> CommandResult {
    ctx.log_command().await;

    let Some(guild) = ctx.guild_id() else {
        return Ok(());
    };

    let records = ctx
        .data()
        .games()
        .ledger()
        .leaderboard(guild, LEADERBOARD_SIZE)
        .await?;

    ctx.say(board(&records)).await?;

    Ok(())
}

fn summary(record: &PointRecord) -> String {
    let mut out = format!(
        "{} has **{}** points",
        record.user.mention(),
        record.points
    );

    for kind in KINDS {
        let wins = record.activity(kind.activity());
        if wins > 0 {
            let _ = write!(out, "\n{kind}: {wins}");
        }
    }

    out
}

fn board(records: &[PointRecord]) -> String {
    if records.is_empty() {
        return "nobody has any points yet!".to_owned();
    }

    let mut out = "🏆 **leaderboard**".to_owned();
    for (place, record) in records.iter().enumerate() {
        let _ = write!(
            out,
            "\n{}. {} - {}",
            place + 1,
            record.user.mention(),
            record.points
        );
    }

    out
}
