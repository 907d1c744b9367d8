//! The word games: indices over the dictionary, the rounds built on them,
//! and the point ledger every round pays into.

pub mod collector;
pub mod corpus;
pub mod error;
pub mod grid;
pub mod ledger;
pub mod rounds;
pub mod unscramble;
pub mod word_search;

use std::sync::Arc;

use poise::serenity_prelude::GuildId;
use tracing::{error, info, instrument};

pub use corpus::WordCorpus;
pub use error::GameError;
pub use ledger::{LedgerError, PointLedger, PointRecord};
pub use rounds::{GameKind, Outcome, RoundManager};

use crate::framework::config::{Config, PointsConfig};

#[derive(Debug, Clone)]
pub struct GamesData {
    corpus: Arc<WordCorpus>,
    rounds: RoundManager,
    ledger: PointLedger,
    points: PointsConfig,
}

impl GamesData {
    /// Loads the word lists and opens the ledger. Either failing is fatal.
    #[instrument(skip_all)]
    pub async fn load(config: &Config) -> Result<Self, crate::framework::DataError> {
        let corpus = WordCorpus::load(&config.words)?;
        let ledger = PointLedger::open(&config.ledger.path, config.ledger.retry()).await?;

        Ok(Self::new(corpus, ledger, config.points.clone()))
    }

    pub fn new(corpus: WordCorpus, ledger: PointLedger, points: PointsConfig) -> Self {
        Self {
            corpus: Arc::new(corpus),
            rounds: RoundManager::new(),
            ledger,
            points,
        }
    }

    pub fn corpus(&self) -> &Arc<WordCorpus> {
        &self.corpus
    }

    pub fn rounds(&self) -> &RoundManager {
        &self.rounds
    }

    pub fn ledger(&self) -> &PointLedger {
        &self.ledger
    }

    /// Pays out a finished round.
    ///
    /// A write failure doesn't lose the award: it's logged, the record still
    /// comes back, and the settlement is marked unsaved.
    #[instrument(skip_all, fields(kind = %outcome.kind()))]
    pub async fn settle(&self, guild: GuildId, outcome: &Outcome) -> Settlement {
        let mut settlement = Settlement::default();

        for award in outcome.awards(&self.points) {
            match self
                .ledger
                .award(guild, award.user, award.kind.activity(), award.amount)
                .await
            {
                Ok(record) => settlement.records.push(record),
                Err(LedgerError::Persist { record, source }) => {
                    error!(%source, user = %award.user, "award kept in memory, not saved yet");
                    settlement.records.push(*record);
                    settlement.unsaved = true;
                }
                Err(err) => {
                    error!(%err, user = %award.user, "couldn't award points");
                    settlement.unsaved = true;
                }
            }
        }

        if !settlement.records.is_empty() {
            info!(awarded = settlement.records.len(), "settled round");
        }

        settlement
    }
}

/// What paying out a round did to the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    /// Updated records of everyone who got points.
    pub records: Vec<PointRecord>,
    /// Some award didn't make it to disk.
    pub unsaved: bool,
}
