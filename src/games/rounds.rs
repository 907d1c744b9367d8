use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use poise::serenity_prelude::{ChannelId, UserId};
use tokio::{
    sync::{Notify, RwLock},
    time::Instant,
};
use tracing::{debug, info, instrument};

use super::{
    collector::{
        is_word_shaped, Collector, Offer, PrefixJudge, RhymeJudge, Standing, ValidationError,
    },
    error::GameError,
    unscramble::{Guess, Hint, HintState, Unscramble},
    word_search::{Search, Target, WordSearch},
};
use crate::framework::config::PointsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameKind {
    PrefixRace,
    Unscramble,
    WordSearch,
    RhymeRace,
}

impl GameKind {
    /// Name of the ledger counter this game bumps.
    pub const fn activity(self) -> &'static str {
        match self {
            Self::PrefixRace => "prefix_race",
            Self::Unscramble => "unscramble",
            Self::WordSearch => "word_search",
            Self::RhymeRace => "rhyme_race",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PrefixRace => "prefix game",
            Self::Unscramble => "unscramble",
            Self::WordSearch => "word search",
            Self::RhymeRace => "rhyme game",
        };

        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Channel(ChannelId),
    Member(ChannelId, UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    scope: Scope,
    kind: GameKind,
}

impl SessionKey {
    /// Unscramble rounds belong to one player; everything else is shared by
    /// the whole channel.
    pub fn new(kind: GameKind, channel: ChannelId, user: UserId) -> Self {
        let scope = match kind {
            GameKind::Unscramble => Scope::Member(channel, user),
            _ => Scope::Channel(channel),
        };

        Self { scope, kind }
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn channel(&self) -> ChannelId {
        match self.scope {
            Scope::Channel(channel) | Scope::Member(channel, _) => channel,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Round {
    PrefixRace(Collector<PrefixJudge>),
    RhymeRace(Collector<RhymeJudge>),
    WordSearch(WordSearch),
    Unscramble(Unscramble),
}

impl Round {
    pub fn kind(&self) -> GameKind {
        match self {
            Self::PrefixRace(_) => GameKind::PrefixRace,
            Self::RhymeRace(_) => GameKind::RhymeRace,
            Self::WordSearch(_) => GameKind::WordSearch,
            Self::Unscramble(_) => GameKind::Unscramble,
        }
    }

    fn into_outcome(self, key: SessionKey) -> Outcome {
        match self {
            Self::PrefixRace(collector) => Outcome::Race {
                kind: GameKind::PrefixRace,
                prompt: collector.prompt().to_owned(),
                standings: collector.standings(),
            },
            Self::RhymeRace(collector) => Outcome::Race {
                kind: GameKind::RhymeRace,
                prompt: collector.prompt().to_owned(),
                standings: collector.standings(),
            },
            Self::WordSearch(search) => Outcome::WordSearch {
                finders: search.finders(),
                complete: search.is_complete(),
                targets: search.targets().to_vec(),
            },
            Self::Unscramble(game) => Outcome::Unscramble {
                player: match key.scope {
                    Scope::Member(_, user) => Some(user),
                    Scope::Channel(_) => None,
                },
                solved: game.state() == HintState::Solved,
                hints: game.hints(),
                word: game.word().to_owned(),
            },
        }
    }
}

/// One inbound message, as seen by a round.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub author: UserId,
    pub text: &'a str,
    pub at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEffect {
    /// Chatter, or a message this round doesn't care about.
    None,
    Rejected(ValidationError),
    Accepted { improved: bool },
    Found { word: String, remaining: usize },
    Completed(Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Race {
        kind: GameKind,
        prompt: String,
        standings: Vec<Standing>,
    },
    WordSearch {
        targets: Vec<Target>,
        finders: Vec<(UserId, usize)>,
        complete: bool,
    },
    Unscramble {
        player: Option<UserId>,
        word: String,
        solved: bool,
        hints: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    pub user: UserId,
    pub kind: GameKind,
    pub amount: u64,
}

impl Outcome {
    pub fn kind(&self) -> GameKind {
        match self {
            Self::Race { kind, .. } => *kind,
            Self::WordSearch { .. } => GameKind::WordSearch,
            Self::Unscramble { .. } => GameKind::Unscramble,
        }
    }

    pub fn winner(&self) -> Option<&Standing> {
        match self {
            Self::Race { standings, .. } => standings.first(),
            _ => None,
        }
    }

    /// Points owed for this round. Empty when nobody earned anything.
    pub fn awards(&self, points: &PointsConfig) -> Vec<Award> {
        let kind = self.kind();

        match self {
            Self::Race { .. } => self
                .winner()
                .map(|winner| Award {
                    user: winner.participant,
                    kind,
                    amount: points.for_win(kind),
                })
                .into_iter()
                .collect(),
            Self::WordSearch { finders, .. } => finders
                .iter()
                .map(|(user, found)| Award {
                    user: *user,
                    kind,
                    amount: points.word_search * *found as u64,
                })
                .collect(),
            Self::Unscramble {
                player: Some(user),
                solved: true,
                ..
            } => vec![Award {
                user: *user,
                kind,
                amount: points.unscramble,
            }],
            Self::Unscramble { .. } => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Session {
    id: u64,
    round: Round,
    started: Instant,
    window: Duration,
    deadline: Instant,
    ended: Arc<Notify>,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        now < self.deadline
    }

    /// Pushes the deadline back a full window, so only idle rounds expire.
    fn touch(&mut self) {
        self.deadline = Instant::now() + self.window;
    }
}

/// What the caller that started a round holds on to.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    key: SessionKey,
    id: u64,
    deadline: Instant,
    ended: Arc<Notify>,
}

impl SessionHandle {
    pub fn key(&self) -> SessionKey {
        self.key
    }

    /// When the round stops taking submissions, unless it's ended sooner.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Resolves once the round has been ended from elsewhere.
    pub async fn ended(&self) {
        self.ended.notified().await;
    }
}

/// Every running round, at most one live per [`SessionKey`].
#[derive(Debug, Clone, Default)]
pub struct RoundManager {
    sessions: Arc<RwLock<HashMap<SessionKey, Session>>>,
    next_id: Arc<AtomicU64>,
}

impl RoundManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a round on `key` that stays live for `window`.
    ///
    /// A live round already on the key is left untouched. `round` is only
    /// built once the key is known to be free, and gets the deadline.
    #[instrument(skip(self, round), fields(kind = %key.kind()))]
    pub async fn start(
        &self,
        key: SessionKey,
        window: Duration,
        round: impl FnOnce(Instant) -> Round,
    ) -> Result<SessionHandle, GameError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        sweep_idle(&mut sessions, now);

        if let Some(existing) = sessions.get(&key) {
            if existing.is_live(now) {
                return Err(GameError::AlreadyActive(key.kind));
            }

            debug!(id = existing.id, "replacing expired session");
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let deadline = now + window;
        let ended = Arc::new(Notify::new());

        sessions.insert(
            key,
            Session {
                id,
                round: round(deadline),
                started: now,
                window,
                deadline,
                ended: ended.clone(),
            },
        );

        info!(id, "started round");

        Ok(SessionHandle {
            key,
            id,
            deadline,
            ended,
        })
    }

    pub async fn is_active(&self, key: SessionKey) -> bool {
        self.sessions
            .read()
            .await
            .get(&key)
            .is_some_and(|session| session.is_live(Instant::now()))
    }

    /// Feeds one message to the live round on `key`.
    pub async fn dispatch(
        &self,
        key: SessionKey,
        submission: Submission<'_>,
    ) -> Result<RoundEffect, GameError> {
        let mut sessions = self.sessions.write().await;

        let session = sessions
            .get_mut(&key)
            .filter(|session| session.is_live(submission.at))
            .ok_or(GameError::NoActiveSession(key.kind))?;

        let offer = match &mut session.round {
            Round::PrefixRace(collector) => {
                collector.offer(submission.author, submission.text, submission.at)
            }
            Round::RhymeRace(collector) => {
                collector.offer(submission.author, submission.text, submission.at)
            }
            Round::WordSearch(search) => {
                if !is_word_shaped(submission.text) {
                    return Ok(RoundEffect::None);
                }

                return match search.submit(submission.author, submission.text) {
                    Search::Miss => Ok(RoundEffect::Rejected(ValidationError::NotHidden(
                        submission.text.trim().to_ascii_lowercase(),
                    ))),
                    Search::AlreadyFound(word) => {
                        Ok(RoundEffect::Rejected(ValidationError::AlreadyClaimed(word)))
                    }
                    Search::Found { remaining: 0, .. } => {
                        let outcome = close(&mut sessions, key);
                        Ok(outcome.map_or(RoundEffect::None, RoundEffect::Completed))
                    }
                    Search::Found { word, remaining } => Ok(RoundEffect::Found { word, remaining }),
                };
            }
            // unscramble only listens to its own commands
            Round::Unscramble(_) => return Ok(RoundEffect::None),
        };

        Ok(match offer {
            Ok(Offer::Ignored) => RoundEffect::None,
            Ok(Offer::Accepted { improved }) => RoundEffect::Accepted { improved },
            Err(rejection) => RoundEffect::Rejected(rejection),
        })
    }

    /// Tears down whatever round is on `key`, waking its listener.
    pub async fn end(&self, key: SessionKey) -> Result<Outcome, GameError> {
        let mut sessions = self.sessions.write().await;

        close(&mut sessions, key).ok_or(GameError::NoActiveSession(key.kind))
    }

    /// Called by a round's own listener when its window closes. Does nothing
    /// if the round was already ended or replaced.
    pub async fn finish(&self, handle: &SessionHandle) -> Option<Outcome> {
        let mut sessions = self.sessions.write().await;

        if sessions.get(&handle.key)?.id != handle.id {
            return None;
        }

        close(&mut sessions, handle.key)
    }

    pub async fn guess(&self, key: SessionKey, text: &str) -> Result<Option<Outcome>, GameError> {
        let mut sessions = self.sessions.write().await;
        let session = live_unscramble(&mut sessions, key)?;

        let Round::Unscramble(game) = &mut session.round else {
            return Err(GameError::NoActiveSession(key.kind));
        };

        match game.guess(text) {
            Guess::Correct => Ok(close(&mut sessions, key)),
            Guess::Incorrect => {
                session.touch();
                Ok(None)
            }
        }
    }

    pub async fn hint(&self, key: SessionKey) -> Result<Hint, GameError> {
        let mut sessions = self.sessions.write().await;
        let session = live_unscramble(&mut sessions, key)?;

        let Round::Unscramble(game) = &mut session.round else {
            return Err(GameError::NoActiveSession(key.kind));
        };

        let hint = game.hint(&mut rand::thread_rng());
        session.touch();

        Ok(hint)
    }

    pub async fn reveal(&self, key: SessionKey) -> Result<Outcome, GameError> {
        let mut sessions = self.sessions.write().await;
        let session = live_unscramble(&mut sessions, key)?;

        if let Round::Unscramble(game) = &mut session.round {
            game.reveal();
        }

        close(&mut sessions, key).ok_or(GameError::NoActiveSession(key.kind))
    }
}

fn close(sessions: &mut HashMap<SessionKey, Session>, key: SessionKey) -> Option<Outcome> {
    let session = sessions.remove(&key)?;
    session.ended.notify_one();

    debug!(
        id = session.id,
        elapsed = ?session.started.elapsed(),
        "closed round"
    );

    Some(session.round.into_outcome(key))
}

fn live_unscramble(
    sessions: &mut HashMap<SessionKey, Session>,
    key: SessionKey,
) -> Result<&mut Session, GameError> {
    sweep_idle(sessions, Instant::now());

    sessions
        .get_mut(&key)
        .filter(|session| session.round.kind() == GameKind::Unscramble)
        .ok_or(GameError::NoActiveSession(key.kind))
}

/// Drops unscramble rounds past their idle limit. They have no listener to
/// close them, unlike races and searches.
fn sweep_idle(sessions: &mut HashMap<SessionKey, Session>, now: Instant) {
    let before = sessions.len();
    sessions.retain(|key, session| key.kind != GameKind::Unscramble || session.is_live(now));

    let dropped = before - sessions.len();
    if dropped > 0 {
        debug!(dropped, "dropped idle unscramble rounds");
    }
}
