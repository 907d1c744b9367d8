use crate::{
    games::{rounds::SessionKey, GameKind},
    Data,
};

use poise::{serenity_prelude as serenity, CreateReply};
use tracing::info;

pub type Context<'a> = poise::Context<'a, Data, crate::errors::CommandError>;

pub type Error = crate::errors::CommandError;
pub type Command = poise::Command<Data, Error>;
pub type CommandResult = Result<(), Error>;

pub trait ContextExt {
    async fn reply_ephemeral(
        &self,
        text: impl Into<String>,
    ) -> Result<poise::ReplyHandle<'_>, serenity::Error>;

    /// The round of `kind` this invocation belongs to.
    fn session_key(&self, kind: GameKind) -> SessionKey;

    async fn log_command(&self);
}

impl ContextExt for Context<'_> {
    async fn reply_ephemeral(
        &self,
        text: impl Into<String>,
    ) -> Result<poise::ReplyHandle<'_>, serenity::Error> {
        self.send(
            CreateReply::default()
                .reply(true)
                .ephemeral(true)
                .content(text),
        )
        .await
    }

    fn session_key(&self, kind: GameKind) -> SessionKey {
        SessionKey::new(kind, self.channel_id(), self.author().id)
    }

    async fn log_command(&self) {
        let channel = match self.channel_id().name(self.http()).await {
            Ok(name) => format!("#{name}"),
            Err(_) if self.guild_id().is_none() => "dms".to_owned(),
            Err(_) => self.channel_id().to_string(),
        };

        info!(
            user = %self.author().name,
            %channel,
            "{}",
            self.invocation_string()
        );
    }
}
