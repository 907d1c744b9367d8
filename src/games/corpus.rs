use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use rand::{seq::IteratorRandom, seq::SliceRandom, Rng};
use tracing::{debug, info, instrument, warn};

use crate::framework::config::WordsConfig;

/// Length of the prefixes used by prefix races.
pub const PREFIX_LEN: usize = 3;

/// A prefix needs at least this many words to be offered in a round.
pub const MIN_PREFIX_WORDS: usize = 5;

const SUFFIX_LEN: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("couldn't read word list at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("word list at {} has no usable words", .0.display())]
    Empty(PathBuf),

    #[error("no dictionary words between {} and {} letters", .0.start(), .0.end())]
    NoPuzzleWords(RangeInclusive<usize>),
}

/// The dictionary every submission is checked against, plus the smaller list
/// that puzzles are drawn from.
#[derive(Debug, Clone, Default)]
pub struct WordCorpus {
    words: HashSet<String>,
    by_length: BTreeMap<usize, Vec<String>>,
    prefixes: HashMap<String, Vec<String>>,
    suffixes: HashMap<String, Vec<String>>,
    puzzle: Vec<String>,
    puzzle_by_length: BTreeMap<usize, Vec<String>>,
}

impl WordCorpus {
    pub const DEFAULT_PUZZLE_LENGTHS: RangeInclusive<usize> = 4..=8;

    /// Builds the indices from a dictionary. Puzzle words default to every
    /// dictionary word within [`Self::DEFAULT_PUZZLE_LENGTHS`].
    pub fn from_words<S: AsRef<str>>(words: impl IntoIterator<Item = S>) -> Self {
        let words: HashSet<String> = words
            .into_iter()
            .filter_map(|w| normalize(w.as_ref()))
            .collect();

        let mut sorted: Vec<&String> = words.iter().collect();
        sorted.sort_unstable();

        let mut by_length: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        let mut prefixes: HashMap<String, Vec<String>> = HashMap::new();
        let mut suffixes: HashMap<String, Vec<String>> = HashMap::new();

        for word in sorted {
            by_length.entry(word.len()).or_default().push(word.clone());

            if word.len() >= PREFIX_LEN {
                prefixes
                    .entry(word[..PREFIX_LEN].to_owned())
                    .or_default()
                    .push(word.clone());
            }

            if word.len() >= SUFFIX_LEN {
                suffixes
                    .entry(word[word.len() - SUFFIX_LEN..].to_owned())
                    .or_default()
                    .push(word.clone());
            }
        }

        prefixes.retain(|_, members| members.len() >= MIN_PREFIX_WORDS);

        let mut corpus = Self {
            words,
            by_length,
            prefixes,
            suffixes,
            ..Self::default()
        };

        let defaults: Vec<String> = corpus
            .by_length
            .range(Self::DEFAULT_PUZZLE_LENGTHS)
            .flat_map(|(_, words)| words.iter().cloned())
            .collect();
        corpus.set_puzzle_words(defaults);

        corpus
    }

    /// Replaces the puzzle list. Words missing from the dictionary are dropped.
    pub fn with_puzzle_words<S: AsRef<str>>(mut self, words: impl IntoIterator<Item = S>) -> Self {
        let words = words
            .into_iter()
            .filter_map(|w| normalize(w.as_ref()))
            .filter(|w| self.contains(w))
            .collect();

        self.set_puzzle_words(words);
        self
    }

    fn set_puzzle_words(&mut self, mut words: Vec<String>) {
        words.sort_unstable();
        words.dedup();

        let mut by_length: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for word in &words {
            by_length.entry(word.len()).or_default().push(word.clone());
        }

        self.puzzle = words;
        self.puzzle_by_length = by_length;
    }

    /// Loads the dictionary and puzzle list named in the config.
    ///
    /// Fails on a missing or empty file. Without a dedicated puzzle file, the
    /// puzzle list is every dictionary word within the configured bounds.
    #[instrument(skip_all)]
    pub fn load(config: &WordsConfig) -> Result<Self, CorpusError> {
        let dictionary = read_list(&config.dictionary)?;
        let corpus = Self::from_words(dictionary);

        info!(words = corpus.len(), "loaded dictionary");

        let lengths = config.puzzle_lengths();

        let corpus = match &config.puzzle {
            Some(path) => {
                let list = read_list(path)?;
                let listed = list.len();
                let corpus = corpus.with_puzzle_words(
                    list.into_iter()
                        .filter(|w| lengths.contains(&w.len())),
                );

                if corpus.puzzle.len() < listed {
                    warn!(
                        dropped = listed - corpus.puzzle.len(),
                        "some puzzle words were out of bounds or not in the dictionary"
                    );
                }

                corpus
            }
            None => {
                let derived: Vec<String> = corpus
                    .by_length
                    .range(lengths.clone())
                    .flat_map(|(_, words)| words.iter().cloned())
                    .collect();

                corpus.with_puzzle_words(derived)
            }
        };

        if corpus.puzzle.is_empty() {
            return Err(CorpusError::NoPuzzleWords(lengths));
        }

        info!(
            puzzle_words = corpus.puzzle.len(),
            common_prefixes = corpus.prefixes.len(),
            "built word indices"
        );

        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn words_of_length(&self, len: usize) -> &[String] {
        self.by_length.get(&len).map_or(&[], Vec::as_slice)
    }

    pub fn common_prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes.keys().map(String::as_str)
    }

    /// Members of a common prefix. Empty for prefixes that didn't make the cut.
    pub fn words_with_prefix(&self, prefix: &str) -> &[String] {
        self.prefixes.get(prefix).map_or(&[], Vec::as_slice)
    }

    pub fn random_prefix(&self, rng: &mut impl Rng) -> Option<&str> {
        self.common_prefixes().choose(rng)
    }

    pub fn puzzle_words(&self) -> &[String] {
        &self.puzzle
    }

    pub fn random_puzzle_word(&self, rng: &mut impl Rng) -> Option<&str> {
        self.puzzle.choose(rng).map(String::as_str)
    }

    pub fn random_puzzle_word_in(
        &self,
        lengths: RangeInclusive<usize>,
        rng: &mut impl Rng,
    ) -> Option<&str> {
        self.puzzle_by_length
            .range(lengths)
            .flat_map(|(_, words)| words.iter())
            .choose(rng)
            .map(String::as_str)
    }

    /// Every dictionary word that rhymes with `target`.
    pub fn rhymes_of(&self, target: &str) -> Vec<&str> {
        let Some(suffix) = rhyme_suffix(target) else {
            return Vec::new();
        };

        self.suffixes
            .iter()
            .filter(|(key, _)| key.ends_with(suffix))
            .flat_map(|(_, words)| words.iter())
            .map(String::as_str)
            .filter(|word| rhymes(target, word))
            .collect()
    }

    /// Picks a target with at least `min_rhymes` rhymes in the dictionary.
    pub fn random_rhyme_target(&self, min_rhymes: usize, rng: &mut impl Rng) -> Option<&str> {
        let buckets: Vec<&Vec<String>> = self
            .suffixes
            .values()
            .filter(|words| words.len() > min_rhymes)
            .collect();

        let bucket = buckets.choose(rng)?;
        let target = bucket
            .iter()
            .filter(|word| word.len() > SUFFIX_LEN)
            .choose(rng)
            .or_else(|| bucket.choose(rng))?;

        debug!(%target, rhymes = bucket.len() - 1, "picked rhyme target");

        Some(target.as_str())
    }
}

/// Letters a word has to end with to rhyme with `target`.
fn rhyme_suffix(target: &str) -> Option<&str> {
    match target.len() {
        0..=2 => None,
        3 => Some(&target[1..]),
        len => Some(&target[len - SUFFIX_LEN..]),
    }
}

/// Two different words rhyme when they share their last three letters, or
/// the last two if the target only has three.
pub fn rhymes(target: &str, candidate: &str) -> bool {
    candidate.len() >= 3
        && candidate != target
        && rhyme_suffix(target).is_some_and(|suffix| candidate.ends_with(suffix))
}

fn normalize(line: &str) -> Option<String> {
    let word = line.trim();

    (!word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| word.to_ascii_lowercase())
}

fn read_list(path: &Path) -> Result<Vec<String>, CorpusError> {
    let text = fs::read_to_string(path).map_err(|source| CorpusError::Read {
        path: path.to_owned(),
        source,
    })?;

    let words: Vec<String> = text.lines().filter_map(normalize).collect();

    if words.is_empty() {
        return Err(CorpusError::Empty(path.to_owned()));
    }

    debug!(path = %path.display(), count = words.len(), "read word list");

    Ok(words)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    const WORDS: &[&str] = &[
        "press", "pretend", "prefix", "prepare", "present", "pre", "prey", "cat", "hat",
        "chat", "that", "flat", "house", "mouse", "garden", "Apple", "  pear  ", "it's",
    ];

    fn corpus() -> WordCorpus {
        WordCorpus::from_words(WORDS)
    }

    #[test]
    fn normalizes_lines() {
        let corpus = corpus();

        assert!(corpus.contains("apple"));
        assert!(corpus.contains("pear"));
        assert!(!corpus.contains("it's"));
        assert!(!corpus.contains("Apple"));
    }

    #[test]
    fn length_buckets() {
        let corpus = corpus();

        assert_eq!(corpus.words_of_length(3), ["cat", "hat", "pre"]);
        assert!(corpus.words_of_length(20).is_empty());
    }

    #[test]
    fn only_common_prefixes_are_kept() {
        let corpus = corpus();

        let prefixes: Vec<&str> = corpus.common_prefixes().collect();
        assert_eq!(prefixes, ["pre"]);
        assert_eq!(corpus.words_with_prefix("pre").len(), 7);
        assert!(corpus.words_with_prefix("hou").is_empty());
    }

    #[test]
    fn rhymes() {
        let corpus = corpus();

        let mut rhymes = corpus.rhymes_of("chat");
        rhymes.sort_unstable();
        assert_eq!(rhymes, ["hat", "that"]);

        let mut rhymes = corpus.rhymes_of("cat");
        rhymes.sort_unstable();
        assert_eq!(rhymes, ["chat", "flat", "hat", "that"]);

        assert!(super::rhymes("house", "mouse"));
        assert!(!super::rhymes("house", "house"));
        assert!(!super::rhymes("cat", "at"));
    }

    #[test]
    fn puzzle_words_are_dictionary_words() {
        let corpus = corpus().with_puzzle_words(["house", "garden", "zebra"]);

        assert_eq!(corpus.puzzle_words(), ["garden", "house"]);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let word = corpus
                .random_puzzle_word_in(6..=6, &mut rng)
                .expect("garden is six letters");
            assert_eq!(word, "garden");
        }
    }

    #[test]
    fn load_fails_on_missing_file() {
        let config = WordsConfig {
            dictionary: "/definitely/not/here.txt".into(),
            ..WordsConfig::default()
        };

        assert!(matches!(
            WordCorpus::load(&config),
            Err(CorpusError::Read { .. })
        ));
    }

    #[test]
    fn load_fails_on_empty_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "   \n\n").expect("write");

        let config = WordsConfig {
            dictionary: file.path().to_owned(),
            ..WordsConfig::default()
        };

        assert!(matches!(
            WordCorpus::load(&config),
            Err(CorpusError::Empty(_))
        ));
    }

    #[test]
    fn load_derives_puzzle_words() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        for word in WORDS {
            writeln!(file, "{word}").expect("write");
        }

        let config = WordsConfig {
            dictionary: file.path().to_owned(),
            puzzle: None,
            min_puzzle_len: 6,
            max_puzzle_len: 6,
        };

        let corpus = WordCorpus::load(&config).expect("valid word list");
        assert_eq!(corpus.puzzle_words(), ["garden", "prefix"]);
    }
}
