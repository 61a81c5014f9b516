use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::ops::Bound;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::output;

/// One location's contribution to a single query evaluation: how many
/// matched positions it holds and the fraction of its token stream they
/// represent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(rename = "where")]
    pub location: String,
    #[serde(rename = "count")]
    pub matches: usize,
    pub score: f64,
}

/// Word -> location -> ordered 1-based positions, with a per-location total
/// of every stem observed there. BTree ordering gives the lexicographic
/// iteration the JSON emission and prefix search rely on.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    entries: BTreeMap<String, BTreeMap<String, BTreeSet<usize>>>,
    counts: BTreeMap<String, usize>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `word` at `position` within `location`. The location's token
    /// count grows only when the position is new; re-adding an existing
    /// (word, location, position) triple is a no-op.
    pub fn add(&mut self, word: &str, location: &str, position: usize) -> Result<()> {
        if word.is_empty() {
            return Err(Error::InvalidInput("empty word".into()));
        }
        if location.is_empty() {
            return Err(Error::InvalidInput("empty location".into()));
        }
        if position == 0 {
            return Err(Error::InvalidInput("position must be positive".into()));
        }

        let inserted = self
            .entries
            .entry(word.to_string())
            .or_default()
            .entry(location.to_string())
            .or_default()
            .insert(position);
        if inserted {
            *self.counts.entry(location.to_string()).or_insert(0) += 1;
        }
        Ok(())
    }

    /// Adds a token stream: `words[i]` lands at `start + i`.
    pub fn add_all(&mut self, words: &[String], location: &str, start: usize) -> Result<()> {
        for (offset, word) in words.iter().enumerate() {
            self.add(word, location, start + offset)?;
        }
        Ok(())
    }

    /// Bulk-inserts another index, consuming it. Position sets are unioned
    /// per (word, location); token counts are summed where both sides know
    /// the location and adopted otherwise. Intended to be called once per
    /// local index.
    pub fn merge(&mut self, other: InvertedIndex) {
        for (word, locations) in other.entries {
            match self.entries.entry(word) {
                Entry::Vacant(slot) => {
                    slot.insert(locations);
                }
                Entry::Occupied(mut slot) => {
                    for (location, positions) in locations {
                        slot.get_mut().entry(location).or_default().extend(positions);
                    }
                }
            }
        }
        for (location, count) in other.counts {
            *self.counts.entry(location).or_insert(0) += count;
        }
    }

    /// Ranked results for query words that appear verbatim in the index.
    pub fn exact_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut found = BTreeMap::new();
        for word in queries {
            if let Some(locations) = self.entries.get(word) {
                accumulate(&mut found, locations);
            }
        }
        self.rank(found)
    }

    /// Ranked results where each query word matches every indexed word it
    /// prefixes, walking the ordered tail of the word map and stopping at
    /// the first non-match.
    pub fn partial_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut found = BTreeMap::new();
        for prefix in queries {
            let tail = self
                .entries
                .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded));
            for (word, locations) in tail {
                if !word.starts_with(prefix.as_str()) {
                    break;
                }
                accumulate(&mut found, locations);
            }
        }
        self.rank(found)
    }

    fn rank(&self, found: BTreeMap<&str, usize>) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = found
            .into_iter()
            .map(|(location, matches)| {
                let total = self
                    .count(location)
                    .expect("indexed location missing from count table");
                SearchResult {
                    location: location.to_string(),
                    matches,
                    score: matches as f64 / total as f64,
                }
            })
            .collect();
        results.sort_by(|a, b| self.compare(a, b));
        results
    }

    /// Score descending, then location token count descending, then
    /// location ascending case-insensitively, then case-sensitively.
    fn compare(&self, a: &SearchResult, b: &SearchResult) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| self.count(&b.location).cmp(&self.count(&a.location)))
            .then_with(|| a.location.to_lowercase().cmp(&b.location.to_lowercase()))
            .then_with(|| a.location.cmp(&b.location))
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(word)
    }

    pub fn contains_location(&self, word: &str, location: &str) -> bool {
        self.entries
            .get(word)
            .is_some_and(|locations| locations.contains_key(location))
    }

    pub fn contains_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.positions(word, location)
            .is_some_and(|positions| positions.contains(&position))
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn locations(&self, word: &str) -> impl Iterator<Item = &str> {
        self.entries
            .get(word)
            .into_iter()
            .flat_map(|locations| locations.keys().map(String::as_str))
    }

    pub fn positions(&self, word: &str, location: &str) -> Option<&BTreeSet<usize>> {
        self.entries
            .get(word)
            .and_then(|locations| locations.get(location))
    }

    /// How many locations contain `word`.
    pub fn location_count(&self, word: &str) -> usize {
        self.entries.get(word).map_or(0, BTreeMap::len)
    }

    /// How many positions `word` occupies at `location`.
    pub fn position_count(&self, word: &str, location: &str) -> usize {
        self.positions(word, location).map_or(0, BTreeSet::len)
    }

    /// Total stems observed at `location`, if it was ever indexed.
    pub fn count(&self, location: &str) -> Option<usize> {
        self.counts.get(location).copied()
    }

    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn write_index_json<W: Write>(&self, writer: W) -> Result<()> {
        output::write_pretty(writer, &self.entries)
    }

    pub fn write_counts_json<W: Write>(&self, writer: W) -> Result<()> {
        output::write_pretty(writer, &self.counts)
    }
}

fn accumulate<'a>(
    found: &mut BTreeMap<&'a str, usize>,
    locations: &'a BTreeMap<String, BTreeSet<usize>>,
) {
    for (location, positions) in locations {
        *found.entry(location).or_insert(0) += positions.len();
    }
}
