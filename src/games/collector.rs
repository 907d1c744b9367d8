use std::{collections::HashSet, fmt, sync::Arc, sync::OnceLock};

use poise::serenity_prelude::UserId;
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::corpus::{self, WordCorpus};

/// Only single words of plain letters count as submissions; anything else is
/// chatter and is ignored without comment.
fn word_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(r"^[A-Za-z]{2,30}$").expect("hard-coded regex should be valid"))
}

pub fn is_word_shaped(text: &str) -> bool {
    word_shape().is_match(text.trim())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("`{0}` isn't in my dictionary")]
    NotInCorpus(String),

    #[error("`{word}` doesn't start with `{prefix}`")]
    MissingPrefix { word: String, prefix: String },

    #[error("`{word}` has to be longer than `{prefix}`")]
    TooShort { word: String, prefix: String },

    #[error("`{word}` doesn't rhyme with `{target}`")]
    NoRhyme { word: String, target: String },

    #[error("`{0}` was already claimed")]
    AlreadyClaimed(String),

    #[error("`{0}` isn't hidden in this puzzle")]
    NotHidden(String),
}

/// Decides which words count in a race and how a participant's best entry
/// improves.
pub trait Judge: fmt::Debug + Send + Sync {
    type Best: Clone + fmt::Debug + Send + Sync;

    /// What the round is about, e.g. the prefix.
    fn prompt(&self) -> &str;

    fn check(&self, corpus: &WordCorpus, word: &str) -> Result<(), ValidationError>;

    /// Folds an accepted word into a participant's best. Returns whether the
    /// best strictly improved.
    fn improve(&mut self, best: &mut Option<Self::Best>, word: String)
        -> Result<bool, ValidationError>;

    fn score(best: &Self::Best) -> usize;

    fn words(best: &Self::Best) -> Vec<String>;
}

/// Longest word starting with the prefix wins.
#[derive(Debug, Clone)]
pub struct PrefixJudge {
    prefix: String,
}

impl PrefixJudge {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Judge for PrefixJudge {
    type Best = String;

    fn prompt(&self) -> &str {
        &self.prefix
    }

    fn check(&self, corpus: &WordCorpus, word: &str) -> Result<(), ValidationError> {
        if !word.starts_with(&self.prefix) {
            return Err(ValidationError::MissingPrefix {
                word: word.to_owned(),
                prefix: self.prefix.clone(),
            });
        }

        if word.len() <= self.prefix.len() {
            return Err(ValidationError::TooShort {
                word: word.to_owned(),
                prefix: self.prefix.clone(),
            });
        }

        if !corpus.contains(word) {
            return Err(ValidationError::NotInCorpus(word.to_owned()));
        }

        Ok(())
    }

    fn improve(
        &mut self,
        best: &mut Option<String>,
        word: String,
    ) -> Result<bool, ValidationError> {
        if best.as_ref().is_some_and(|best| best.len() >= word.len()) {
            return Ok(false);
        }

        *best = Some(word);
        Ok(true)
    }

    fn score(best: &String) -> usize {
        best.len()
    }

    fn words(best: &String) -> Vec<String> {
        vec![best.clone()]
    }
}

/// Most distinct rhymes wins. Each rhyme can only be claimed once per round.
#[derive(Debug, Clone)]
pub struct RhymeJudge {
    target: String,
    claimed: HashSet<String>,
}

impl RhymeJudge {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            claimed: HashSet::new(),
        }
    }
}

impl Judge for RhymeJudge {
    type Best = Vec<String>;

    fn prompt(&self) -> &str {
        &self.target
    }

    fn check(&self, corpus: &WordCorpus, word: &str) -> Result<(), ValidationError> {
        if !corpus::rhymes(&self.target, word) {
            return Err(ValidationError::NoRhyme {
                word: word.to_owned(),
                target: self.target.clone(),
            });
        }

        if !corpus.contains(word) {
            return Err(ValidationError::NotInCorpus(word.to_owned()));
        }

        Ok(())
    }

    fn improve(
        &mut self,
        best: &mut Option<Vec<String>>,
        word: String,
    ) -> Result<bool, ValidationError> {
        if !self.claimed.insert(word.clone()) {
            return Err(ValidationError::AlreadyClaimed(word));
        }

        best.get_or_insert_with(Vec::new).push(word);
        Ok(true)
    }

    fn score(best: &Vec<String>) -> usize {
        best.len()
    }

    fn words(best: &Vec<String>) -> Vec<String> {
        best.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Not a submission: chatter, or it arrived after the deadline.
    Ignored,
    Accepted { improved: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub participant: UserId,
    pub score: usize,
    pub words: Vec<String>,
}

#[derive(Debug, Clone)]
struct Entry<B> {
    participant: UserId,
    best: Option<B>,
    /// Arrival number of the submission that produced `best`.
    reached: u64,
}

/// Time-boxed collection of submissions from everyone in a channel.
#[derive(Debug, Clone)]
pub struct Collector<J: Judge> {
    judge: J,
    corpus: Arc<WordCorpus>,
    deadline: Instant,
    entries: Vec<Entry<J::Best>>,
    arrivals: u64,
}

impl<J: Judge> Collector<J> {
    pub fn new(judge: J, corpus: Arc<WordCorpus>, deadline: Instant) -> Self {
        Self {
            judge,
            corpus,
            deadline,
            entries: Vec::new(),
            arrivals: 0,
        }
    }

    pub fn prompt(&self) -> &str {
        self.judge.prompt()
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Evaluates one message. Must be fed in delivery order.
    pub fn offer(
        &mut self,
        participant: UserId,
        text: &str,
        at: Instant,
    ) -> Result<Offer, ValidationError> {
        if at > self.deadline {
            trace!(%participant, "late submission");
            return Ok(Offer::Ignored);
        }

        if !is_word_shaped(text) {
            return Ok(Offer::Ignored);
        }

        let word = text.trim().to_ascii_lowercase();
        self.judge.check(&self.corpus, &word)?;

        self.arrivals += 1;
        let arrival = self.arrivals;

        let index = match self
            .entries
            .iter()
            .position(|entry| entry.participant == participant)
        {
            Some(index) => index,
            None => {
                self.entries.push(Entry {
                    participant,
                    best: None,
                    reached: arrival,
                });
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[index];
        let improved = self.judge.improve(&mut entry.best, word)?;

        if improved {
            entry.reached = arrival;
            debug!(%participant, best = ?entry.best, "new best");
        }

        Ok(Offer::Accepted { improved })
    }

    /// Everyone with a valid entry, best first.
    pub fn standings(&self) -> Vec<Standing> {
        let mut ranked: Vec<(&Entry<J::Best>, usize)> = self
            .entries
            .iter()
            .filter_map(|entry| entry.best.as_ref().map(|best| (entry, J::score(best))))
            .collect();

        ranked.sort_by(|(a, a_score), (b, b_score)| {
            b_score.cmp(a_score).then(a.reached.cmp(&b.reached))
        });

        ranked
            .into_iter()
            .filter_map(|(entry, score)| {
                entry.best.as_ref().map(|best| Standing {
                    participant: entry.participant,
                    score,
                    words: J::words(best),
                })
            })
            .collect()
    }

    /// Highest score; ties go to whoever got there first.
    pub fn winner(&self) -> Option<Standing> {
        self.standings().into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn corpus() -> Arc<WordCorpus> {
        Arc::new(WordCorpus::from_words([
            "press", "pretend", "prefix", "prepare", "present", "pre", "cat", "hat", "chat",
            "that", "flat", "mat",
        ]))
    }

    fn user(id: u64) -> UserId {
        UserId::new(id)
    }

    fn prefix_round() -> Collector<PrefixJudge> {
        let deadline = Instant::now() + Duration::from_secs(12);
        Collector::new(PrefixJudge::new("pre"), corpus(), deadline)
    }

    #[test]
    fn keeps_the_longer_word() {
        let mut round = prefix_round();
        let now = Instant::now();

        assert_eq!(
            round.offer(user(1), "press", now),
            Ok(Offer::Accepted { improved: true })
        );
        assert_eq!(
            round.offer(user(1), "pretend", now),
            Ok(Offer::Accepted { improved: true })
        );
        assert_eq!(
            round.offer(user(1), "prefix", now),
            Ok(Offer::Accepted { improved: false })
        );

        let winner = round.winner().expect("one entry");
        assert_eq!(winner.participant, user(1));
        assert_eq!(winner.words, ["pretend"]);
        assert_eq!(winner.score, 7);
    }

    #[test]
    fn rejects_bad_words_and_ignores_chatter() {
        let mut round = prefix_round();
        let now = Instant::now();

        assert_eq!(
            round.offer(user(1), "cat", now),
            Err(ValidationError::MissingPrefix {
                word: "cat".to_owned(),
                prefix: "pre".to_owned()
            })
        );
        assert_eq!(
            round.offer(user(1), "pre", now),
            Err(ValidationError::TooShort {
                word: "pre".to_owned(),
                prefix: "pre".to_owned()
            })
        );
        assert_eq!(
            round.offer(user(1), "prezzz", now),
            Err(ValidationError::NotInCorpus("prezzz".to_owned()))
        );
        assert_eq!(round.offer(user(1), "lol this is fun", now), Ok(Offer::Ignored));
        assert_eq!(round.offer(user(1), "!hint", now), Ok(Offer::Ignored));

        assert!(round.winner().is_none());
    }

    #[test]
    fn submissions_are_case_insensitive() {
        let mut round = prefix_round();

        assert_eq!(
            round.offer(user(1), "  PRESENT ", Instant::now()),
            Ok(Offer::Accepted { improved: true })
        );
        assert_eq!(round.winner().expect("entry").words, ["present"]);
    }

    #[test]
    fn late_submissions_are_ignored() {
        let mut round = prefix_round();
        let late = round.deadline() + Duration::from_millis(1);

        assert_eq!(round.offer(user(1), "pretend", late), Ok(Offer::Ignored));
        assert!(round.standings().is_empty());
    }

    #[test]
    fn ties_go_to_whoever_got_there_first() {
        let mut round = prefix_round();
        let now = Instant::now();

        round.offer(user(1), "press", now).expect("valid");
        round.offer(user(2), "prepare", now).expect("valid");
        round.offer(user(1), "pretend", now).expect("valid");
        round.offer(user(3), "present", now).expect("valid");

        let standings = round.standings();
        let order: Vec<UserId> = standings.iter().map(|s| s.participant).collect();

        assert_eq!(order, [user(2), user(1), user(3)]);
        assert_eq!(round.winner().map(|w| w.participant), Some(user(2)));
    }

    #[test]
    fn rhymes_accumulate_and_are_claimed_once() {
        let deadline = Instant::now() + Duration::from_secs(12);
        let mut round = Collector::new(RhymeJudge::new("cat"), corpus(), deadline);
        let now = Instant::now();

        assert_eq!(
            round.offer(user(1), "hat", now),
            Ok(Offer::Accepted { improved: true })
        );
        assert_eq!(
            round.offer(user(2), "hat", now),
            Err(ValidationError::AlreadyClaimed("hat".to_owned()))
        );
        assert_eq!(
            round.offer(user(2), "cat", now),
            Err(ValidationError::NoRhyme {
                word: "cat".to_owned(),
                target: "cat".to_owned()
            })
        );
        round.offer(user(2), "mat", now).expect("valid");
        round.offer(user(2), "flat", now).expect("valid");
        round.offer(user(1), "chat", now).expect("valid");

        let standings = round.standings();
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].participant, user(2));
        assert_eq!(standings[0].words, ["mat", "flat"]);
        assert_eq!(standings[1].words, ["hat", "chat"]);
    }
}
