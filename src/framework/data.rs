use tracing::info;

use crate::{
    commands::{
        ask::core::ChatRelay,
        comfort::core::{ComfortData, Responses},
    },
    games::GamesData,
};

use super::{config::Config, secrets::Secrets};

pub mod error;
pub use error::Error as DataError;

pub type Result<T, E = DataError> = std::result::Result<T, E>;

#[derive(Debug, Clone)]
pub struct Data {
    pub(crate) config: Config,

    games: GamesData,
    comfort: ComfortData,
    relay: ChatRelay,
}

impl Data {
    pub(crate) async fn new(config: Config, secrets: &Secrets) -> Result<Self> {
        let games = GamesData::load(&config).await?;
        let comfort = ComfortData::new(Responses::embedded()?);
        let relay = ChatRelay::new(
            config.ai.clone(),
            secrets.openai_key().map(str::to_owned),
        );

        info!("data ready");

        Ok(Self {
            config,
            games,
            comfort,
            relay,
        })
    }

    pub(crate) const fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) const fn games(&self) -> &GamesData {
        &self.games
    }

    pub(crate) const fn comfort(&self) -> &ComfortData {
        &self.comfort
    }

    pub(crate) const fn relay(&self) -> &ChatRelay {
        &self.relay
    }
}
