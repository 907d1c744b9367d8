#![warn(clippy::perf)]
#![warn(clippy::unwrap_used)]

mod cli;
mod commands;
mod errors;
mod framework;
mod games;
mod utils;

use anyhow::Context as _;
use clap::Parser;
use poise::serenity_prelude::{self as serenity, GatewayIntents};
use tracing::info;
use tracing_unwrap::ResultExt;

use framework::{data::Data, secrets::Secrets, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    framework::logging::init_tracing();

    let cli = cli::Cli::parse();

    let path = Config::path(cli.config);
    let config = Config::load(&path).expect_or_log("config file could not be loaded");

    if cli.command.unwrap_or_default() == cli::Command::Config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("pikabug {}", env!("CARGO_PKG_VERSION"));

    if let Some(flavor_text) = config.logs.flavor_text() {
        info!("{flavor_text}");
    }

    let secrets = Secrets::from_env()?;

    let data = Data::new(config, &secrets)
        .await
        .context("couldn't load bot data")?;

    let framework = framework::poise::build(data);

    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::Client::builder(secrets.discord_token(), intents)
        .framework(framework)
        .await
        .context("client should be valid")?;

    client.start().await.context("client returned an error")?;

    Ok(())
}
