use poise::{serenity_prelude::ChannelId, PrefixFrameworkOptions};
use tracing::{info, trace, warn};

use crate::{
    commands,
    errors::{self, CommandError},
    Data,
};

pub fn build(data: Data) -> poise::Framework<Data, CommandError> {
    let prefix = data.config().bot.prefix().to_owned();

    poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::list(),
            prefix_options: PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            on_error: errors::handle_framework_error,
            ..Default::default()
        })
        .setup(|ctx, ready, _framework| {
            Box::pin(async move {
                info!(user = %ready.user.name, "connected to discord");

                let activity = data.config().bot.activity();
                ctx.set_activity(activity);

                trace!("finished setup, accepting commands");

                if let Some(status_channel) = data.config().bot.status_channel() {
                    announce(ctx, status_channel).await;
                }

                Ok(data)
            })
        })
        .build()
}

async fn announce(ctx: &poise::serenity_prelude::Context, channel: ChannelId) {
    if let Err(err) = channel.say(ctx, "ready!").await {
        warn!(%err, %channel, "couldn't post to status channel");
    }
}
