use crate::{
    commands::comfort::core::ResponsesError,
    games::{corpus::CorpusError, LedgerError},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("error loading word lists: {0}")]
    Corpus(#[from] CorpusError),

    #[error("error opening point ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("error loading comfort responses: {0}")]
    Responses(#[from] ResponsesError),
}
