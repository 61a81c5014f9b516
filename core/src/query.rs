use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::concurrent::ConcurrentIndex;
use crate::error::Result;
use crate::index::{InvertedIndex, SearchResult};
use crate::output;
use crate::queue::WorkQueue;
use crate::stem::Stemmer;

type ResultMap = BTreeMap<String, Vec<SearchResult>>;

/// A query source feeding an index, accumulating one ranked result list per
/// canonical query.
pub trait QueryParser {
    /// Runs one query line. Blank lines and lines whose canonical form was
    /// already answered are no-ops.
    fn search_line(&mut self, line: &str);

    /// Runs every line of a query file; when it returns, all results are
    /// observable.
    fn search_file(&mut self, path: &Path) -> Result<()>;

    /// Emits the canonical query -> results map as pretty JSON.
    fn write_results_json(&self, writer: &mut dyn Write) -> Result<()>;
}

/// Sorted-unique stems of a line plus their canonical space-joined form.
/// `None` when the line holds no stems.
fn canonical_query(line: &str) -> Option<(String, BTreeSet<String>)> {
    let stems = Stemmer::new().unique_stems(line);
    if stems.is_empty() {
        return None;
    }
    let joined = stems
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    Some((joined, stems))
}

fn for_each_line(path: &Path, mut handle: impl FnMut(&str)) -> Result<()> {
    let file = File::open(path)?;
    for line in BufReader::new(file).lines() {
        handle(&line?);
    }
    Ok(())
}

/// Single-threaded parser over a bare index.
pub struct SimpleQueryParser<'a> {
    index: &'a InvertedIndex,
    exact: bool,
    results: ResultMap,
}

impl<'a> SimpleQueryParser<'a> {
    pub fn new(index: &'a InvertedIndex, exact: bool) -> Self {
        SimpleQueryParser {
            index,
            exact,
            results: ResultMap::new(),
        }
    }

    pub fn results(&self) -> &ResultMap {
        &self.results
    }
}

impl QueryParser for SimpleQueryParser<'_> {
    fn search_line(&mut self, line: &str) {
        let Some((canonical, stems)) = canonical_query(line) else {
            return;
        };
        if self.results.contains_key(&canonical) {
            return;
        }
        let found = if self.exact {
            self.index.exact_search(&stems)
        } else {
            self.index.partial_search(&stems)
        };
        self.results.insert(canonical, found);
    }

    fn search_file(&mut self, path: &Path) -> Result<()> {
        for_each_line(path, |line| self.search_line(line))
    }

    fn write_results_json(&self, writer: &mut dyn Write) -> Result<()> {
        output::write_pretty(writer, &self.results)
    }
}

/// Parser that runs each query line as a work-queue task against the shared
/// index. Dedup is checked again at insert time; two workers racing on the
/// same canonical query both compute, and the later (identical) result
/// wins.
pub struct ConcurrentQueryParser {
    index: Arc<ConcurrentIndex>,
    queue: Arc<WorkQueue>,
    exact: bool,
    results: Arc<Mutex<ResultMap>>,
}

impl ConcurrentQueryParser {
    pub fn new(index: Arc<ConcurrentIndex>, queue: Arc<WorkQueue>, exact: bool) -> Self {
        ConcurrentQueryParser {
            index,
            queue,
            exact,
            results: Arc::new(Mutex::new(ResultMap::new())),
        }
    }

    pub fn results(&self) -> ResultMap {
        self.results.lock().clone()
    }
}

impl QueryParser for ConcurrentQueryParser {
    fn search_line(&mut self, line: &str) {
        let line = line.to_string();
        let index = Arc::clone(&self.index);
        let results = Arc::clone(&self.results);
        let exact = self.exact;
        self.queue.execute(move || {
            let Some((canonical, stems)) = canonical_query(&line) else {
                return;
            };
            if results.lock().contains_key(&canonical) {
                return;
            }
            let found = if exact {
                index.exact_search(&stems)
            } else {
                index.partial_search(&stems)
            };
            results.lock().insert(canonical, found);
        });
    }

    fn search_file(&mut self, path: &Path) -> Result<()> {
        for_each_line(path, |line| self.search_line(line))?;
        self.queue.finish();
        Ok(())
    }

    fn write_results_json(&self, writer: &mut dyn Write) -> Result<()> {
        output::write_pretty(writer, &*self.results.lock())
    }
}
