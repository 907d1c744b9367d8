use std::{collections::BTreeSet, fmt};

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    fn step(self, direction: Direction, distance: usize, size: usize) -> Option<Self> {
        let (dr, dc) = direction.delta();
        let row = self.row as isize + dr * distance as isize;
        let col = self.col as isize + dc * distance as isize;

        let in_bounds = |n: isize| (0..size as isize).contains(&n);
        (in_bounds(row) && in_bounds(col)).then(|| Self::new(row as usize, col as usize))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Self; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// (row, column) offset of one step.
    const fn delta(self) -> (isize, isize) {
        match self {
            Self::North => (-1, 0),
            Self::NorthEast => (-1, 1),
            Self::East => (0, 1),
            Self::SouthEast => (1, 1),
            Self::South => (1, 0),
            Self::SouthWest => (1, -1),
            Self::West => (0, -1),
            Self::NorthWest => (-1, -1),
        }
    }
}

/// Cells a word of `len` letters covers from `anchor`, or `None` if it runs
/// off the grid.
fn path(anchor: Cell, direction: Direction, len: usize, size: usize) -> Option<Vec<Cell>> {
    (0..len)
        .map(|i| anchor.step(direction, i, size))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedWord {
    pub word: String,
    pub direction: Direction,
    pub path: Vec<Cell>,
}

/// A finished word search board. Immutable once built.
#[derive(Debug, Clone)]
pub struct Grid {
    size: usize,
    letters: Vec<Vec<char>>,
    placed: Vec<PlacedWord>,
    occupied: BTreeSet<Cell>,
}

impl Grid {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn letter(&self, cell: Cell) -> char {
        self.letters[cell.row][cell.col]
    }

    pub fn placed(&self) -> &[PlacedWord] {
        &self.placed
    }

    /// Cells covered by at least one placed word.
    pub fn occupied(&self) -> &BTreeSet<Cell> {
        &self.occupied
    }

    pub fn read(&self, path: &[Cell]) -> String {
        path.iter().map(|&cell| self.letter(cell)).collect()
    }

    /// Scans every cell in all eight directions for `word`.
    pub fn find(&self, word: &str) -> Option<Vec<Cell>> {
        let letters: Vec<char> = word.chars().collect();
        let first = *letters.first()?;

        for row in 0..self.size {
            for col in 0..self.size {
                let anchor = Cell::new(row, col);
                if self.letter(anchor) != first {
                    continue;
                }

                for direction in Direction::ALL {
                    if let Some(path) = path(anchor, direction, letters.len(), self.size) {
                        if path
                            .iter()
                            .zip(&letters)
                            .all(|(&cell, &letter)| self.letter(cell) == letter)
                        {
                            return Some(path);
                        }
                    }
                }
            }
        }

        None
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.letters {
            let line = row
                .iter()
                .map(|c| c.to_ascii_uppercase().to_string())
                .collect::<Vec<_>>()
                .join(" ");

            writeln!(f, "{line}")?;
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("couldn't fit `{word}` on a {size}x{size} grid after {rebuilds} tries")]
pub struct PlacementFailure {
    pub word: String,
    pub size: usize,
    pub rebuilds: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct GridGenerator {
    size: usize,
    random_attempts: usize,
    rebuilds: usize,
}

impl GridGenerator {
    pub const RANDOM_ATTEMPTS: usize = 200;
    pub const REBUILDS: usize = 5;

    pub const fn new(size: usize) -> Self {
        Self {
            size,
            random_attempts: Self::RANDOM_ATTEMPTS,
            rebuilds: Self::REBUILDS,
        }
    }

    pub const fn rebuilds(self, rebuilds: usize) -> Self {
        Self { rebuilds, ..self }
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    /// Places every word, rebuilding from scratch when one can't be fit.
    /// A puzzle missing any of its words is never returned.
    #[instrument(skip_all, fields(size = self.size))]
    pub fn generate<S: AsRef<str>>(
        &self,
        words: &[S],
        rng: &mut impl Rng,
    ) -> Result<Grid, PlacementFailure> {
        let failure = |word: &str| PlacementFailure {
            word: word.to_owned(),
            size: self.size,
            rebuilds: self.rebuilds,
        };

        let words: Vec<&str> = words.iter().map(|w| w.as_ref()).collect();

        if let Some(word) = words
            .iter()
            .find(|w| w.is_empty() || w.len() > self.size)
        {
            return Err(failure(word));
        }

        let mut last_failed = None;

        for attempt in 1..=self.rebuilds.max(1) {
            let mut draft = Draft::new(self.size);

            match words
                .iter()
                .copied()
                .find(|word| !draft.place(word, self.random_attempts, rng))
            {
                None => {
                    debug!(attempt, "placed all words");
                    return Ok(draft.fill(rng));
                }
                Some(word) => {
                    warn!(attempt, word, "couldn't place word, rebuilding grid");
                    last_failed = Some(word);
                }
            }
        }

        Err(failure(last_failed.unwrap_or_default()))
    }
}

struct Draft {
    size: usize,
    cells: Vec<Vec<Option<char>>>,
    placed: Vec<PlacedWord>,
}

impl Draft {
    fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![vec![None; size]; size],
            placed: Vec::new(),
        }
    }

    /// The path `word` would take, if every cell is free or already holds
    /// the letter it needs.
    fn fits(&self, word: &[char], anchor: Cell, direction: Direction) -> Option<Vec<Cell>> {
        let path = path(anchor, direction, word.len(), self.size)?;

        path.iter()
            .zip(word)
            .all(|(cell, &letter)| {
                self.cells[cell.row][cell.col].map_or(true, |existing| existing == letter)
            })
            .then_some(path)
    }

    fn place(&mut self, word: &str, random_attempts: usize, rng: &mut impl Rng) -> bool {
        let letters: Vec<char> = word.chars().collect();

        let random = (0..random_attempts).find_map(|_| {
            let direction = *Direction::ALL.choose(rng).expect("eight directions");
            let anchor = Cell::new(rng.gen_range(0..self.size), rng.gen_range(0..self.size));
            self.fits(&letters, anchor, direction)
                .map(|path| (direction, path))
        });

        let found = random.or_else(|| {
            debug!(word, "random placement exhausted, scanning");

            Direction::ALL.into_iter().find_map(|direction| {
                (0..self.size * self.size).find_map(|i| {
                    let anchor = Cell::new(i / self.size, i % self.size);
                    self.fits(&letters, anchor, direction)
                        .map(|path| (direction, path))
                })
            })
        });

        let Some((direction, path)) = found else {
            return false;
        };

        for (cell, &letter) in path.iter().zip(&letters) {
            self.cells[cell.row][cell.col] = Some(letter);
        }

        self.placed.push(PlacedWord {
            word: word.to_owned(),
            direction,
            path,
        });

        true
    }

    fn fill(self, rng: &mut impl Rng) -> Grid {
        let occupied = self
            .placed
            .iter()
            .flat_map(|placed| placed.path.iter().copied())
            .collect();

        let letters = self
            .cells
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.unwrap_or_else(|| rng.gen_range(b'a'..=b'z') as char))
                    .collect()
            })
            .collect();

        Grid {
            size: self.size,
            letters,
            placed: self.placed,
            occupied,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    const WORDS: [&str; 3] = ["cat", "house", "garden"];

    #[test]
    fn paths_read_back_as_words() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = GridGenerator::new(8)
                .generate(&WORDS, &mut rng)
                .expect("three short words fit in 8x8");

            assert_eq!(grid.placed().len(), WORDS.len());

            for placed in grid.placed() {
                assert_eq!(grid.read(&placed.path), placed.word);
            }
        }
    }

    #[test]
    fn shared_cells_agree() {
        let words = ["planet", "plant", "tenant", "net", "ant"];

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = GridGenerator::new(8)
                .generate(&words, &mut rng)
                .expect("words fit");

            let mut seen: HashMap<Cell, char> = HashMap::new();
            for placed in grid.placed() {
                for (cell, letter) in placed.path.iter().zip(placed.word.chars()) {
                    if let Some(previous) = seen.insert(*cell, letter) {
                        assert_eq!(previous, letter, "conflicting overlap at {cell:?}");
                    }
                    assert_eq!(grid.letter(*cell), letter);
                }
            }

            assert_eq!(seen.len(), grid.occupied().len());
        }
    }

    #[test]
    fn every_word_can_be_found() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = GridGenerator::new(8)
                .generate(&WORDS, &mut rng)
                .expect("words fit");

            for word in WORDS {
                assert!(grid.find(word).is_some(), "{word} missing (seed {seed})");
            }
        }
    }

    #[test]
    fn find_uses_all_directions() {
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..100 {
            let grid = GridGenerator::new(5)
                .generate(&["abcde"], &mut rng)
                .expect("fits");

            let placed = &grid.placed()[0];
            let found = grid.find("abcde").expect("placed word is findable");
            assert_eq!(grid.read(&found), "abcde");
            assert_eq!(placed.path.len(), 5);
        }
    }

    #[test]
    fn too_long_fails_immediately() {
        let mut rng = StdRng::seed_from_u64(0);

        let err = GridGenerator::new(4)
            .generate(&["cat", "elephant"], &mut rng)
            .expect_err("elephant is longer than the grid");

        assert_eq!(err.word, "elephant");
    }

    #[test]
    #[tracing_test::traced_test]
    fn impossible_layout_is_reported() {
        // a 3x3 grid can't hold four disjoint three-letter lines
        let words = ["abc", "def", "ghi", "jkl"];
        let mut rng = StdRng::seed_from_u64(0);

        let err = GridGenerator::new(3)
            .rebuilds(2)
            .generate(&words, &mut rng)
            .expect_err("can't fit");

        assert_eq!(err.rebuilds, 2);
        assert!(logs_contain("rebuilding grid"));
    }

    #[test]
    fn renders_uppercase_rows() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid = GridGenerator::new(4)
            .generate(&["cats"], &mut rng)
            .expect("fits");

        let rendered = grid.to_string();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 4);
        for line in lines {
            assert_eq!(line.len(), 7);
            assert!(line
                .split(' ')
                .all(|c| c.len() == 1 && c.chars().all(|c| c.is_ascii_uppercase())));
        }
    }
}
