use std::collections::BTreeSet;

use rand::{seq::IteratorRandom, seq::SliceRandom, Rng};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintState {
    Active,
    Solved,
    Revealed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    /// How many hints have been asked for, this one included.
    pub number: usize,
    pub pattern: String,
    /// Position uncovered by this hint, if any.
    pub uncovered: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guess {
    Correct,
    Incorrect,
}

/// One word, shown scrambled, uncovered letter by letter on request.
#[derive(Debug, Clone)]
pub struct Unscramble {
    word: String,
    scrambled: String,
    revealed: BTreeSet<usize>,
    hints: usize,
    state: HintState,
}

impl Unscramble {
    pub fn new(word: impl Into<String>, rng: &mut impl Rng) -> Self {
        let word: String = word.into();
        let scrambled = scramble(&word, rng);

        let revealed = match word.len() {
            0 => BTreeSet::new(),
            len => BTreeSet::from([0, len - 1]),
        };

        Self {
            word,
            scrambled,
            revealed,
            hints: 0,
            state: HintState::Active,
        }
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn scrambled(&self) -> &str {
        &self.scrambled
    }

    pub fn state(&self) -> HintState {
        self.state
    }

    pub fn hints(&self) -> usize {
        self.hints
    }

    pub fn revealed(&self) -> &BTreeSet<usize> {
        &self.revealed
    }

    /// The word with unrevealed letters blanked out, e.g. `p _ _ _ _ t`.
    pub fn pattern(&self) -> String {
        self.word
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if self.revealed.contains(&i) {
                    c.to_string()
                } else {
                    "_".to_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The first hint shows the first and last letters; every hint after
    /// that uncovers one more hidden letter in between.
    pub fn hint(&mut self, rng: &mut impl Rng) -> Hint {
        self.hints += 1;

        let uncovered = if self.hints >= 2 {
            let hidden = (1..self.word.len().saturating_sub(1))
                .filter(|i| !self.revealed.contains(i))
                .choose(rng);

            if let Some(index) = hidden {
                self.revealed.insert(index);
            }

            hidden
        } else {
            None
        };

        debug!(hints = self.hints, ?uncovered, "hint");

        Hint {
            number: self.hints,
            pattern: self.pattern(),
            uncovered,
        }
    }

    pub fn guess(&mut self, text: &str) -> Guess {
        if self.state == HintState::Active && text.trim().eq_ignore_ascii_case(&self.word) {
            self.state = HintState::Solved;
            Guess::Correct
        } else {
            Guess::Incorrect
        }
    }

    pub fn reveal(&mut self) -> &str {
        if self.state == HintState::Active {
            self.state = HintState::Revealed;
        }

        &self.word
    }
}

/// Shuffles until the result differs from the word, as long as it has two
/// distinct letters to swap.
fn scramble(word: &str, rng: &mut impl Rng) -> String {
    let mut letters: Vec<char> = word.chars().collect();

    let distinct = letters.iter().collect::<BTreeSet<_>>().len();
    if distinct < 2 {
        return word.to_owned();
    }

    for _ in 0..16 {
        letters.shuffle(rng);
        let scrambled: String = letters.iter().collect();

        if scrambled != word {
            return scrambled;
        }
    }

    letters.rotate_left(1);
    letters.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn first_hint_shows_the_ends() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut round = Unscramble::new("planet", &mut rng);

        let hint = round.hint(&mut rng);

        assert_eq!(hint.number, 1);
        assert_eq!(hint.uncovered, None);
        assert_eq!(hint.pattern, "p _ _ _ _ t");
        assert_eq!(round.revealed(), &BTreeSet::from([0, 5]));
    }

    #[test]
    fn later_hints_uncover_one_new_interior_letter() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut round = Unscramble::new("planet", &mut rng);

            round.hint(&mut rng);

            let mut seen = BTreeSet::from([0, 5]);
            for expected in 3..=6 {
                let hint = round.hint(&mut rng);
                let index = hint.uncovered.expect("hidden letters remain");

                assert!((1..5).contains(&index));
                assert!(seen.insert(index), "repeated position {index}");
                assert_eq!(round.revealed().len(), expected);
            }

            // everything is showing now
            let hint = round.hint(&mut rng);
            assert_eq!(hint.uncovered, None);
            assert_eq!(hint.pattern, "p l a n e t");
            assert_eq!(round.revealed().len(), 6);
        }
    }

    #[test]
    fn guesses_ignore_case() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut round = Unscramble::new("planet", &mut rng);

        assert_eq!(round.guess("plant"), Guess::Incorrect);
        assert_eq!(round.state(), HintState::Active);
        assert_eq!(round.guess(" PLANET "), Guess::Correct);
        assert_eq!(round.state(), HintState::Solved);
    }

    #[test]
    fn reveal_is_terminal() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut round = Unscramble::new("planet", &mut rng);

        assert_eq!(round.reveal(), "planet");
        assert_eq!(round.state(), HintState::Revealed);
        assert_eq!(round.guess("planet"), Guess::Incorrect);
    }

    #[test]
    fn scrambles_differ_from_the_word() {
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);

            let round = Unscramble::new("planet", &mut rng);
            assert_ne!(round.scrambled(), "planet");

            let mut sorted: Vec<char> = round.scrambled().chars().collect();
            sorted.sort_unstable();
            assert_eq!(sorted, ['a', 'e', 'l', 'n', 'p', 't']);

            let round = Unscramble::new("ab", &mut rng);
            assert_eq!(round.scrambled(), "ba");
        }

        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(Unscramble::new("aaa", &mut rng).scrambled(), "aaa");
    }
}
