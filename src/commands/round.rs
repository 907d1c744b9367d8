//! The listener loop shared by rounds that take answers from the whole
//! channel, and how finished rounds are reported.

use std::fmt::Write;

use poise::serenity_prelude::{futures::StreamExt, Mentionable, Message, ReactionType};
use tokio::time::Instant;
use tracing::{debug, instrument, trace, warn};

use crate::{
    errors::UNSAVED_POINTS,
    games::{
        rounds::{RoundEffect, SessionHandle, Submission},
        GameError, Outcome, Settlement,
    },
    utils::{poise::CommandResult, Context},
};

const ACCEPTED: &str = "✅";
const REJECTED: &str = "❓";

/// Feeds every message in the round's channel to the round until its window
/// closes or it's ended from elsewhere.
///
/// Returns the outcome if this listener closed the round; `None` means
/// someone else already did and reported it.
#[instrument(skip_all, fields(kind = %handle.key().kind()))]
pub async fn listen(ctx: Context<'_>, handle: &SessionHandle) -> Result<Option<Outcome>, GameError> {
    let rounds = ctx.data().games().rounds();
    let prefix = ctx.data().config().bot.prefix();

    let remaining = handle.deadline().saturating_duration_since(Instant::now());
    let mut messages = handle
        .key()
        .channel()
        .await_replies(ctx)
        .timeout(remaining)
        .stream();

    let ended = handle.ended();
    tokio::pin!(ended);

    loop {
        let message = tokio::select! {
            () = &mut ended => {
                debug!("round ended elsewhere");
                break;
            }
            message = messages.next() => match message {
                Some(message) => message,
                None => break,
            },
        };

        if message.author.bot || message.content.starts_with(prefix) {
            continue;
        }

        let submission = Submission {
            author: message.author.id,
            text: &message.content,
            at: Instant::now(),
        };

        match rounds.dispatch(handle.key(), submission).await {
            Ok(RoundEffect::None) => {}
            Ok(RoundEffect::Rejected(reason)) => {
                trace!(%reason, "rejected submission");
                react(ctx, &message, REJECTED).await;
            }
            Ok(RoundEffect::Accepted { improved }) => {
                trace!(improved, "accepted submission");
                react(ctx, &message, ACCEPTED).await;
            }
            Ok(RoundEffect::Found { word, remaining }) => {
                react(ctx, &message, ACCEPTED).await;
                message
                    .reply(ctx, format!("found **{word}**! {remaining} to go"))
                    .await
                    .map_err(|err| warn!(%err, "couldn't post progress"))
                    .ok();
            }
            Ok(RoundEffect::Completed(outcome)) => {
                react(ctx, &message, ACCEPTED).await;
                return Ok(Some(outcome));
            }
            // window closed between messages
            Err(GameError::NoActiveSession(_)) => break,
            Err(err) => return Err(err),
        }
    }

    Ok(rounds.finish(handle).await)
}

async fn react(ctx: Context<'_>, message: &Message, emoji: &str) {
    if let Err(err) = message
        .react(ctx, ReactionType::Unicode(emoji.to_owned()))
        .await
    {
        warn!(%err, "couldn't react to submission");
    }
}

/// Pays out a finished round and posts the results.
pub async fn settle(ctx: Context<'_>, outcome: Option<Outcome>) -> CommandResult {
    let Some(outcome) = outcome else {
        return Ok(());
    };

    let settlement = match ctx.guild_id() {
        Some(guild) => ctx.data().games().settle(guild, &outcome).await,
        None => Settlement::default(),
    };

    ctx.say(describe(&outcome, &settlement)).await?;
    Ok(())
}

/// The results message for a finished round.
pub fn describe(outcome: &Outcome, settlement: &Settlement) -> String {
    let mut out = String::new();

    match outcome {
        Outcome::Race {
            prompt, standings, ..
        } => {
            let _ = write!(out, "⏰ time's up for **{}**! ", prompt.to_uppercase());

            match standings.first() {
                None => out.push_str("no entries this time."),
                Some(winner) => {
                    let _ = write!(
                        out,
                        "🏆 {} wins with {}",
                        winner.participant.mention(),
                        bold_list(&winner.words)
                    );

                    for (place, standing) in standings.iter().enumerate().skip(1).take(2) {
                        let _ = write!(
                            out,
                            "\n{}. {} with {}",
                            place + 1,
                            standing.participant.mention(),
                            bold_list(&standing.words)
                        );
                    }
                }
            }
        }
        Outcome::WordSearch {
            targets,
            finders,
            complete,
        } => {
            if *complete {
                out.push_str("🎉 every word found!");
            } else {
                let words: Vec<String> = targets.iter().map(|t| t.word.clone()).collect();
                let _ = write!(out, "🔎 word search over! the words were {}", bold_list(&words));
            }

            for (user, found) in finders {
                let _ = write!(out, "\n{} found {found}", user.mention());
            }
        }
        Outcome::Unscramble {
            player,
            word,
            solved,
            hints,
        } => match (solved, player) {
            (true, Some(player)) => {
                let _ = write!(
                    out,
                    "🎉 {} got it: **{word}**! ({hints} hints)",
                    player.mention()
                );
            }
            _ => {
                let _ = write!(out, "the word was **{word}**");
            }
        },
    }

    for record in &settlement.records {
        let _ = write!(
            out,
            "\n{} now has **{}** points",
            record.user.mention(),
            record.points
        );
    }

    if settlement.unsaved {
        let _ = write!(out, "\n{UNSAVED_POINTS}");
    }

    out
}

fn bold_list(words: &[String]) -> String {
    words
        .iter()
        .map(|w| format!("**{w}**"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use poise::serenity_prelude::{GuildId, UserId};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::games::{collector::Standing, GameKind, PointRecord};

    #[test]
    fn empty_race_says_so() {
        let outcome = Outcome::Race {
            kind: GameKind::PrefixRace,
            prompt: "pre".to_owned(),
            standings: Vec::new(),
        };

        assert_eq!(
            describe(&outcome, &Settlement::default()),
            "⏰ time's up for **PRE**! no entries this time."
        );
    }

    #[test]
    fn race_winner_and_points() {
        let outcome = Outcome::Race {
            kind: GameKind::RhymeRace,
            prompt: "cat".to_owned(),
            standings: vec![
                Standing {
                    participant: UserId::new(2),
                    score: 2,
                    words: vec!["hat".to_owned(), "mat".to_owned()],
                },
                Standing {
                    participant: UserId::new(3),
                    score: 1,
                    words: vec!["flat".to_owned()],
                },
            ],
        };
        let record = PointRecord {
            guild: GuildId::new(1),
            user: UserId::new(2),
            points: 10,
            activities: BTreeMap::from([("rhyme_race".to_owned(), 1)]),
            updated: Utc::now(),
        };

        assert_eq!(
            describe(
                &outcome,
                &Settlement {
                    records: vec![record],
                    unsaved: false,
                }
            ),
            "⏰ time's up for **CAT**! 🏆 <@2> wins with **hat**, **mat**\n\
             2. <@3> with **flat**\n\
             <@2> now has **10** points"
        );
    }

    #[test]
    fn revealed_word_is_shown() {
        let outcome = Outcome::Unscramble {
            player: Some(UserId::new(2)),
            word: "planet".to_owned(),
            solved: false,
            hints: 2,
        };

        assert_eq!(
            describe(&outcome, &Settlement::default()),
            "the word was **planet**"
        );
    }

    #[test]
    fn unsaved_points_are_mentioned() {
        let outcome = Outcome::Unscramble {
            player: Some(UserId::new(2)),
            word: "planet".to_owned(),
            solved: true,
            hints: 0,
        };
        let settlement = Settlement {
            records: vec![PointRecord {
                guild: GuildId::new(1),
                user: UserId::new(2),
                points: 10,
                activities: BTreeMap::from([("unscramble".to_owned(), 1)]),
                updated: Utc::now(),
            }],
            unsaved: true,
        };

        assert_eq!(
            describe(&outcome, &settlement),
            format!(
                "🎉 <@2> got it: **planet**! (0 hints)\n\
                 <@2> now has **10** points\n\
                 {UNSAVED_POINTS}"
            )
        );
    }
}
