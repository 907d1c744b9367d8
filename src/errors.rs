use poise::{serenity_prelude as serenity, BoxFuture, FrameworkError};

use thiserror::Error as ThisError;
use tracing::{error, error_span, warn, Instrument};
use tracing_unwrap::ResultExt;

use crate::{
    commands::ask::core::AiError,
    games::{GameError, LedgerError},
    utils::Context,
    Data,
};

pub fn handle_framework_error(err: FrameworkError<'_, Data, CommandError>) -> BoxFuture<'_, ()> {
    Box::pin(async {
        match err {
            FrameworkError::Command { error, ctx, .. } => {
                let command = ctx.invoked_command_name();
                let span = error_span!("", command);

                handle_error(error, ctx).instrument(span).await;
            }
            FrameworkError::MissingBotPermissions {
                missing_permissions,
                ctx,
                ..
            } => {
                let command = ctx.invoked_command_name();
                let span = error_span!("", command);
                let _enter = span.enter();

                error!(%missing_permissions, "bot is missing permissions");
            }
            _ => {
                poise::builtins::on_error(err)
                    .await
                    .expect_or_log("failed to handle framework error");
            }
        };
    })
}

async fn handle_error(err: CommandError, ctx: Context<'_>) {
    err.trace();

    if let Err(send) = ctx.reply(err.user_message()).await {
        error!(%send, "couldn't report error to user");
    }
}

/// Shown whenever points were awarded but couldn't be written yet.
pub const UNSAVED_POINTS: &str = "⚠️ couldn't save points right now, they'll be saved soon";

#[derive(Debug, ThisError)]
pub enum CommandError {
    #[error("other serenity error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("error from point ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("error from chat relay: {0}")]
    Ai(#[from] AiError),
}

impl CommandError {
    /// Logs at a level matching how surprising the error is.
    pub fn trace(&self) {
        match self {
            Self::Game(GameError::AlreadyActive(_) | GameError::NoActiveSession(_)) => {
                warn!("{self}");
            }
            Self::Ai(AiError::NotConfigured) => warn!("{self}"),
            _ => error!("{self}"),
        }
    }

    /// What the person who ran the command gets to see.
    pub fn user_message(&self) -> String {
        match self {
            Self::Game(GameError::Placement(_)) => {
                "couldn't build a puzzle this time, try again!".to_owned()
            }
            Self::Game(err) => err.to_string(),
            Self::Ledger(LedgerError::Persist { .. }) => UNSAVED_POINTS.to_owned(),
            Self::Ledger(_) | Self::Serenity(_) => "something went wrong, sorry!".to_owned(),
            Self::Ai(err) => format!("⚠️ {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::games::{grid::PlacementFailure, GameKind};

    #[test]
    fn players_see_game_errors_verbatim() {
        let err = CommandError::from(GameError::AlreadyActive(GameKind::WordSearch));

        assert_eq!(
            err.user_message(),
            "there's already a word search running here!"
        );
    }

    #[test]
    fn placement_failures_are_not_shown_raw() {
        let err = CommandError::from(GameError::from(PlacementFailure {
            word: "kitchen".to_owned(),
            size: 3,
            rebuilds: 5,
        }));

        assert!(!err.user_message().contains("kitchen"));
    }
}
