use std::{fmt::Write, ops::RangeInclusive};

use poise::serenity_prelude::UserId;
use rand::Rng;
use tracing::{debug, instrument};

use super::{
    corpus::WordCorpus,
    error::GameError,
    grid::{Grid, GridGenerator},
    GameKind,
};

/// Length classes targets are drawn from, one word each.
pub const DEFAULT_CLASSES: [RangeInclusive<usize>; 3] = [3..=4, 5..=6, 7..=8];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub word: String,
    pub found_by: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Search {
    Found { word: String, remaining: usize },
    AlreadyFound(String),
    Miss,
}

#[derive(Debug, Clone)]
pub struct WordSearch {
    grid: Grid,
    targets: Vec<Target>,
}

impl WordSearch {
    /// Picks one puzzle word per length class and lays them out on a fresh
    /// grid.
    #[instrument(skip_all, fields(size = generator.size()))]
    pub fn generate(
        corpus: &WordCorpus,
        generator: &GridGenerator,
        classes: &[RangeInclusive<usize>],
        rng: &mut impl Rng,
    ) -> Result<Self, GameError> {
        let size = generator.size();
        let mut words: Vec<String> = Vec::with_capacity(classes.len());

        for class in classes {
            let class = *class.start()..=(*class.end()).min(size);
            if class.is_empty() {
                continue;
            }

            // a few tries to avoid picking the same word twice
            let word = (0..8)
                .filter_map(|_| corpus.random_puzzle_word_in(class.clone(), rng))
                .find(|word| !words.iter().any(|w| w == word));

            if let Some(word) = word {
                words.push(word.to_owned());
            }
        }

        if words.is_empty() {
            return Err(GameError::NoWords(GameKind::WordSearch));
        }

        debug!(?words, "picked targets");

        let grid = generator.generate(&words, rng)?;

        Ok(Self::from_grid(grid))
    }

    pub fn from_grid(grid: Grid) -> Self {
        let targets = grid
            .placed()
            .iter()
            .map(|placed| Target {
                word: placed.word.clone(),
                found_by: None,
            })
            .collect();

        Self { grid, targets }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn remaining(&self) -> usize {
        self.targets.iter().filter(|t| t.found_by.is_none()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    pub fn submit(&mut self, participant: UserId, text: &str) -> Search {
        let word = text.trim().to_ascii_lowercase();

        let Some(target) = self.targets.iter_mut().find(|t| t.word == word) else {
            return Search::Miss;
        };

        if target.found_by.is_some() {
            return Search::AlreadyFound(word);
        }

        target.found_by = Some(participant);
        debug!(%participant, %word, "found target");

        Search::Found {
            word,
            remaining: self.remaining(),
        }
    }

    /// Who found how many targets, most first.
    pub fn finders(&self) -> Vec<(UserId, usize)> {
        let mut finders: Vec<(UserId, usize)> = Vec::new();

        for user in self.targets.iter().filter_map(|t| t.found_by) {
            match finders.iter_mut().find(|(u, _)| *u == user) {
                Some((_, count)) => *count += 1,
                None => finders.push((user, 1)),
            }
        }

        finders.sort_by(|(_, a), (_, b)| b.cmp(a));
        finders
    }

    /// The grid as a code block, followed by the targets with found ones
    /// struck through.
    pub fn render(&self) -> String {
        let mut out = format!("```\n{}```\n", self.grid);

        let list = self
            .targets
            .iter()
            .map(|t| match t.found_by {
                Some(_) => format!("~~{}~~", t.word),
                None => format!("`{}`", t.word),
            })
            .collect::<Vec<_>>()
            .join(" ");

        let _ = write!(out, "find: {list}");
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn corpus() -> WordCorpus {
        WordCorpus::from_words(["cat", "house", "kitchen", "dog", "planet", "tree"])
            .with_puzzle_words(["cat", "house", "kitchen"])
    }

    fn search() -> WordSearch {
        let mut rng = StdRng::seed_from_u64(7);
        WordSearch::generate(&corpus(), &GridGenerator::new(8), &DEFAULT_CLASSES, &mut rng)
            .expect("three short words fit in 8x8")
    }

    #[test]
    fn one_target_per_length_class() {
        let search = search();

        let mut words: Vec<&str> = search.targets().iter().map(|t| t.word.as_str()).collect();
        words.sort_unstable();

        assert_eq!(words, ["cat", "house", "kitchen"]);

        for word in words {
            assert!(search.grid().find(word).is_some(), "{word} is hidden");
        }
    }

    #[test]
    fn finds_are_credited_once() {
        let mut search = search();
        let (alice, bob) = (UserId::new(1), UserId::new(2));

        assert_eq!(
            search.submit(alice, "House"),
            Search::Found {
                word: "house".to_owned(),
                remaining: 2
            }
        );
        assert_eq!(
            search.submit(bob, "house"),
            Search::AlreadyFound("house".to_owned())
        );
        assert_eq!(search.submit(bob, "tree"), Search::Miss);

        search.submit(bob, "cat");
        search.submit(alice, "kitchen");

        assert!(search.is_complete());
        assert_eq!(search.finders(), [(alice, 2), (bob, 1)]);
    }

    #[test]
    fn found_targets_are_struck_through() {
        let mut search = search();
        search.submit(UserId::new(1), "cat");

        let rendered = search.render();

        assert!(rendered.starts_with("```\n"));
        assert!(rendered.contains("~~cat~~"));
        assert!(rendered.contains("`house`"));
    }

    #[test]
    fn no_puzzle_words_is_an_error() {
        let corpus = WordCorpus::from_words(["ab"]).with_puzzle_words(["ab"]);
        let mut rng = StdRng::seed_from_u64(0);

        let result =
            WordSearch::generate(&corpus, &GridGenerator::new(8), &DEFAULT_CLASSES, &mut rng);

        assert!(matches!(
            result,
            Err(GameError::NoWords(GameKind::WordSearch))
        ));
    }
}
