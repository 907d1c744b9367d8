use tracing::{info, instrument};

use crate::utils::{
    poise::{CommandResult, ContextExt},
    Context,
};

pub mod core;
use self::core::Category;

async fn respond(ctx: Context<'_>, category: Category) -> CommandResult {
    let response = ctx.data().comfort().pick(category).await;
    ctx.say(response).await?;

    Ok(())
}

macro_rules! comfort_commands {
    ($($name:ident => $category:ident: $help:literal),+ $(,)?) => {
        $(
            #[doc = $help]
            #[instrument(skip_all)]
            #[poise::command(
                prefix_command,
                discard_spare_arguments,
                required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL"
            )]
            pub async fn $name(ctx: Context<'_>) -> CommandResult {
                ctx.log_command().await;
                respond(ctx, Category::$category).await
            }
        )+
    };
}

comfort_commands! {
    lonely => Lonely: "for when you're feeling lonely",
    dysmorphia => Dysmorphia: "for when you don't like what you see in the mirror",
    comfort => Comfort: "for when everything's a bit much",
    suicidal => Suicidal: "for the really dark moments",
    anxious => Anxious: "for when your thoughts won't slow down",
    addiction => Addiction: "for when you're fighting an addiction",
    attention => Attention: "for when you need someone to notice you",
}

/// a kind word about a topic, e.g. `!sad lonely`
#[instrument(skip_all)]
#[poise::command(
    prefix_command,
    discard_spare_arguments,
    required_bot_permissions = "SEND_MESSAGES | VIEW_CHANNEL"
)]
pub async fn sad(ctx: Context<'_>, topic: Option<String>) -> CommandResult {
    ctx.log_command().await;

    match topic.as_deref().map(str::parse::<Category>) {
        Some(Ok(category)) => respond(ctx, category).await,
        Some(Err(unknown)) => {
            info!(%unknown, "unknown sad topic");
            ctx.say("Sorry, I don't have sad messages for that topic yet.")
                .await?;
            Ok(())
        }
        None => {
            let topics = Category::ALL.map(Category::name).join(", ");
            ctx.say(format!("what's wrong? try one of: {topics}")).await?;
            Ok(())
        }
    }
}
