use std::collections::BTreeSet;

use rust_stemmers::{Algorithm, Stemmer as Snowball};

use crate::text;

/// Snowball English stemmer over [`text::parse`] output. An instance is not
/// shared across threads; each worker or task constructs its own.
pub struct Stemmer {
    snowball: Snowball,
}

impl Stemmer {
    pub fn new() -> Self {
        Stemmer {
            snowball: Snowball::create(Algorithm::English),
        }
    }

    pub fn stem(&self, word: &str) -> String {
        self.snowball.stem(word).into_owned()
    }

    /// Cleans, splits, and stems a line, preserving token order.
    pub fn stem_line(&self, line: &str) -> Vec<String> {
        text::parse(line).iter().map(|word| self.stem(word)).collect()
    }

    /// Sorted, deduplicated stems of a line.
    pub fn unique_stems(&self, line: &str) -> BTreeSet<String> {
        text::parse(line).iter().map(|word| self.stem(word)).collect()
    }
}

impl Default for Stemmer {
    fn default() -> Self {
        Self::new()
    }
}
