//! Word pools: the shuffled stimulus list and the fixed numbering index.

use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::events::UNKNOWN_WORD_NUMBER;

/// Split pool text on `\r` and `\n`, dropping blank entries.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_pool(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read word pool '{}'", path.display()))?;
    let words = split_lines(&text);
    if words.is_empty() {
        bail!("word pool '{}' contains no words", path.display());
    }
    Ok(words)
}

/// Ordered stimulus words for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_pool(path).map(Self::new)
    }

    /// Shuffle in place with the session RNG so the order is reproducible from the seed.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.words.shuffle(rng);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Partition the first `trials` words into blocks of `block_size`.
    /// The last block is short when `block_size` does not divide `trials`.
    pub fn blocks(&self, trials: usize, block_size: usize) -> Vec<&[String]> {
        let end = trials.min(self.words.len());
        self.words[..end].chunks(block_size.max(1)).collect()
    }
}

/// Canonical word to stable 1-based number, in pool order. Audit only.
#[derive(Debug, Clone, Default)]
pub struct NumberingIndex {
    numbers: HashMap<String, i64>,
}

impl NumberingIndex {
    pub fn from_words(words: &[String]) -> Self {
        let mut numbers = HashMap::with_capacity(words.len());
        for (offset, word) in words.iter().enumerate() {
            numbers.entry(word.clone()).or_insert(offset as i64 + 1);
        }
        Self { numbers }
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_pool(path).map(|words| Self::from_words(&words))
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// Number for `word`, ignoring one trailing space; `-1` when unknown.
    pub fn number(&self, word: &str) -> i64 {
        let word = word.strip_suffix(' ').unwrap_or(word);
        self.numbers
            .get(word)
            .copied()
            .unwrap_or(UNKNOWN_WORD_NUMBER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|word| word.to_string()).collect()
    }

    #[test]
    fn split_lines_handles_crlf_and_blanks() {
        assert_eq!(
            split_lines("CAT\r\nDOG\n\nBIRD\r"),
            words(&["CAT", "DOG", "BIRD"])
        );
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn shuffle_is_reproducible_from_seed() {
        let pool = words(&["A", "B", "C", "D", "E", "F", "G", "H"]);
        let mut first = WordList::new(pool.clone());
        let mut second = WordList::new(pool.clone());
        first.shuffle(&mut StdRng::seed_from_u64(7));
        second.shuffle(&mut StdRng::seed_from_u64(7));
        assert_eq!(first, second);
        let mut sorted = first.words().to_vec();
        sorted.sort();
        assert_eq!(sorted, pool);
    }

    #[test]
    fn blocks_cover_requested_trials() {
        let list = WordList::new(words(&["A", "B", "C", "D", "E"]));
        let single = list.blocks(3, 1);
        assert_eq!(single.len(), 3);
        assert_eq!(single[2], ["C".to_string()]);
        let pairs = list.blocks(5, 2);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2].len(), 1);
    }

    #[test]
    fn numbering_is_one_based_in_pool_order() {
        let index = NumberingIndex::from_words(&words(&["APPLE", "BREAD", "CHAIR"]));
        assert_eq!(index.number("APPLE"), 1);
        assert_eq!(index.number("CHAIR"), 3);
    }

    #[test]
    fn numbering_trims_one_trailing_space() {
        let index = NumberingIndex::from_words(&words(&["APPLE"]));
        assert_eq!(index.number("APPLE "), 1);
        assert_eq!(index.number("APPLE  "), UNKNOWN_WORD_NUMBER);
    }

    #[test]
    fn unknown_word_reports_sentinel() {
        let index = NumberingIndex::from_words(&words(&["APPLE"]));
        assert_eq!(index.number("ZEBRA"), -1);
    }

    #[test]
    fn duplicate_words_keep_first_number() {
        let index = NumberingIndex::from_words(&words(&["APPLE", "BREAD", "APPLE"]));
        assert_eq!(index.number("APPLE"), 1);
        assert_eq!(index.len(), 2);
    }
}
