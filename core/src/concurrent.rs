use std::cell::UnsafeCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use crate::error::Result;
use crate::index::{InvertedIndex, SearchResult};
use crate::lock::ReadWriteLock;

/// An [`InvertedIndex`] shared between builder, crawler, and query threads.
/// Mutations run under the write lock, observations under the read lock,
/// so the bare index's contract carries over unchanged. A bulk [`merge`]
/// holds the write lock for the whole insertion: callers get atomicity by
/// filling a private local index and merging it once.
///
/// [`merge`]: Self::merge
#[derive(Default)]
pub struct ConcurrentIndex {
    lock: ReadWriteLock,
    // Safety invariant: only touched between a lock acquisition and the
    // matching release, via with_read/with_write.
    inner: UnsafeCell<InvertedIndex>,
}

// The lock protocol above is what makes shared references sound.
unsafe impl Sync for ConcurrentIndex {}

impl ConcurrentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_read<R>(&self, observe: impl FnOnce(&InvertedIndex) -> R) -> R {
        let _guard = self.lock.read();
        observe(unsafe { &*self.inner.get() })
    }

    fn with_write<R>(&self, mutate: impl FnOnce(&mut InvertedIndex) -> R) -> R {
        let _guard = self.lock.write();
        mutate(unsafe { &mut *self.inner.get() })
    }

    pub fn add(&self, word: &str, location: &str, position: usize) -> Result<()> {
        self.with_write(|index| index.add(word, location, position))
    }

    pub fn add_all(&self, words: &[String], location: &str, start: usize) -> Result<()> {
        self.with_write(|index| index.add_all(words, location, start))
    }

    pub fn merge(&self, other: InvertedIndex) {
        self.with_write(|index| index.merge(other));
    }

    pub fn exact_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        self.with_read(|index| index.exact_search(queries))
    }

    pub fn partial_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        self.with_read(|index| index.partial_search(queries))
    }

    pub fn len(&self) -> usize {
        self.with_read(InvertedIndex::len)
    }

    pub fn is_empty(&self) -> bool {
        self.with_read(InvertedIndex::is_empty)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.with_read(|index| index.contains(word))
    }

    pub fn contains_location(&self, word: &str, location: &str) -> bool {
        self.with_read(|index| index.contains_location(word, location))
    }

    pub fn contains_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.with_read(|index| index.contains_position(word, location, position))
    }

    pub fn count(&self, location: &str) -> Option<usize> {
        self.with_read(|index| index.count(location))
    }

    pub fn position_count(&self, word: &str, location: &str) -> usize {
        self.with_read(|index| index.position_count(word, location))
    }

    pub fn location_count(&self, word: &str) -> usize {
        self.with_read(|index| index.location_count(word))
    }

    /// Owned snapshot of the word set.
    pub fn words(&self) -> Vec<String> {
        self.with_read(|index| index.words().map(str::to_string).collect())
    }

    /// Owned snapshot of the per-location token counts.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.with_read(|index| index.counts().clone())
    }

    pub fn write_index_json<W: Write>(&self, writer: W) -> Result<()> {
        self.with_read(|index| index.write_index_json(writer))
    }

    pub fn write_counts_json<W: Write>(&self, writer: W) -> Result<()> {
        self.with_read(|index| index.write_counts_json(writer))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn wraps_the_bare_index_contract() {
        let index = ConcurrentIndex::new();
        index.add("hello", "a.txt", 1).unwrap();
        index.add("hello", "a.txt", 1).unwrap();

        assert!(index.contains("hello"));
        assert_eq!(index.count("a.txt"), Some(1));
        assert_eq!(index.position_count("hello", "a.txt"), 1);
    }

    #[test]
    fn parallel_writers_do_not_lose_insertions() {
        let index = Arc::new(ConcurrentIndex::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    let location = format!("file{worker}.txt");
                    let mut local = InvertedIndex::new();
                    for position in 1..=100 {
                        local.add("word", &location, position).unwrap();
                    }
                    index.merge(local);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(index.location_count("word"), 8);
        for worker in 0..8 {
            assert_eq!(index.count(&format!("file{worker}.txt")), Some(100));
        }
    }

    #[test]
    fn readers_see_complete_merges() {
        let index = Arc::new(ConcurrentIndex::new());
        let writer = {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for round in 0..50 {
                    let mut local = InvertedIndex::new();
                    let location = format!("page{round}");
                    for position in 1..=20 {
                        local.add("term", &location, position).unwrap();
                    }
                    index.merge(local);
                }
            })
        };
        let reader = {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                let queries = std::iter::once("term".to_string()).collect();
                for _ in 0..200 {
                    for result in index.exact_search(&queries) {
                        // A visible location always has its full batch.
                        assert_eq!(result.matches, 20);
                        assert!(result.score.is_finite());
                    }
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
    }
}
