use super::{grid::PlacementFailure, GameKind};

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("there's already a {0} running here!")]
    AlreadyActive(GameKind),

    #[error("there's no active {0} round here")]
    NoActiveSession(GameKind),

    #[error(transparent)]
    Placement(#[from] PlacementFailure),

    #[error("couldn't find any words for a {0}")]
    NoWords(GameKind),
}
