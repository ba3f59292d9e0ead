//! Symmetric-delete approximate string index
//!
//! Every trained word is expanded into all strings reachable by deleting up to
//! `depth` characters. A lookup expands the input the same way and collects
//! trained words sharing any deletion variant, then confirms each with a real
//! Levenshtein distance. Words only become suggestible once trained at least
//! `min_frequency` times.

use std::collections::{HashMap, HashSet};

use super::types::Suggestion;

/// Approximate-match index over a set of trained words
#[derive(Debug, Clone)]
pub struct FuzzyIndex {
    depth: usize,
    min_frequency: usize,
    counts: HashMap<String, usize>,
    deletes: HashMap<String, Vec<String>>,
    min_len: usize,
    max_len: usize,
}

impl FuzzyIndex {
    /// Create an empty index answering within `depth` edits
    pub fn new(depth: usize, min_frequency: usize) -> Self {
        Self {
            depth,
            min_frequency: min_frequency.max(1),
            counts: HashMap::new(),
            deletes: HashMap::new(),
            min_len: usize::MAX,
            max_len: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of distinct suggestible words
    pub fn len(&self) -> usize {
        self.counts
            .values()
            .filter(|&&count| count >= self.min_frequency)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Train a word (lowercased) into the index
    pub fn train(&mut self, word: &str) {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return;
        }

        let count = self.counts.entry(word.clone()).or_insert(0);
        *count += 1;
        if *count != self.min_frequency {
            return;
        }

        let len = word.chars().count();
        self.min_len = self.min_len.min(len);
        self.max_len = self.max_len.max(len);

        for variant in deletion_variants(&word, self.depth) {
            let words = self.deletes.entry(variant).or_default();
            if !words.contains(&word) {
                words.push(word.clone());
            }
        }
    }

    /// All trained words within `depth` edits of `input`, closest first
    pub fn suggestions(&self, input: &str) -> Vec<Suggestion> {
        let input = input.to_lowercase();
        let len = input.chars().count();
        if self.max_len == 0
            || len + self.depth < self.min_len
            || len > self.max_len + self.depth
        {
            return Vec::new();
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut found = Vec::new();

        for variant in deletion_variants(&input, self.depth) {
            let Some(words) = self.deletes.get(&variant) else {
                continue;
            };
            for word in words {
                if !seen.insert(word.as_str()) {
                    continue;
                }
                let distance = strsim::levenshtein(&input, word);
                if distance <= self.depth {
                    found.push(Suggestion {
                        word: word.clone(),
                        distance,
                    });
                }
            }
        }

        found.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.word.cmp(&b.word)));
        found
    }
}

/// All strings obtained by deleting up to `depth` characters, including `word`
fn deletion_variants(word: &str, depth: usize) -> HashSet<String> {
    let mut variants = HashSet::new();
    variants.insert(word.to_string());

    let mut frontier = vec![word.to_string()];
    for _ in 0..depth {
        let mut next = Vec::new();
        for current in &frontier {
            let chars: Vec<char> = current.chars().collect();
            if chars.len() <= 1 {
                continue;
            }
            for skip in 0..chars.len() {
                let variant: String = chars
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != skip)
                    .map(|(_, c)| *c)
                    .collect();
                if variants.insert(variant.clone()) {
                    next.push(variant);
                }
            }
        }
        frontier = next;
    }

    variants
}
