use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::concurrent::ConcurrentIndex;
use crate::error::Result;
use crate::index::InvertedIndex;
use crate::queue::WorkQueue;
use crate::stem::Stemmer;

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("text"))
}

/// The files a build of `root` covers: every `.txt`/`.text` regular file
/// under a directory, recursively and in a deterministic order, or `root`
/// itself when it is not a directory.
pub fn text_files(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return vec![root.to_path_buf()];
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!(%error, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_text_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Stems `path` line by line into `index`, with positions counting up from
/// 1 once per emitted stem across the whole file.
pub fn build_file(path: &Path, index: &mut InvertedIndex) -> Result<()> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let stemmer = Stemmer::new();
    let location = path.to_string_lossy();

    let mut position = 1;
    for line in reader.lines() {
        for stem in stemmer.stem_line(&line?) {
            index.add(&stem, &location, position)?;
            position += 1;
        }
    }
    Ok(())
}

/// Sequential builder: indexes files one after another on the calling
/// thread. A file that fails to read is logged and skipped.
pub struct IndexBuilder<'a> {
    index: &'a mut InvertedIndex,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(index: &'a mut InvertedIndex) -> Self {
        IndexBuilder { index }
    }

    pub fn build(&mut self, root: &Path) {
        for path in text_files(root) {
            if let Err(error) = build_file(&path, self.index) {
                tracing::warn!(path = %path.display(), %error, "failed to index file");
            }
        }
    }
}

/// Concurrent builder: one task per file builds a private local index and
/// bulk-merges it into the shared one.
pub struct ConcurrentBuilder {
    index: Arc<ConcurrentIndex>,
    queue: Arc<WorkQueue>,
}

impl ConcurrentBuilder {
    pub fn new(index: Arc<ConcurrentIndex>, queue: Arc<WorkQueue>) -> Self {
        ConcurrentBuilder { index, queue }
    }

    /// Submits every file under `root` and waits for the queue to drain, so
    /// the caller observes a complete index.
    pub fn build(&self, root: &Path) {
        for path in text_files(root) {
            self.build_from_file(path);
        }
        self.queue.finish();
    }

    pub fn build_from_file(&self, path: PathBuf) {
        let index = Arc::clone(&self.index);
        self.queue.execute(move || {
            let mut local = InvertedIndex::new();
            match build_file(&path, &mut local) {
                Ok(()) => index.merge(local),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "failed to index file");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn indexes_a_single_file_with_dense_positions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "Hello, hello world.").unwrap();

        let mut index = InvertedIndex::new();
        IndexBuilder::new(&mut index).build(&path);

        let location = path.to_string_lossy().into_owned();
        assert_eq!(
            index.positions("hello", &location).unwrap().iter().copied().collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(
            index.positions("world", &location).unwrap().iter().copied().collect::<Vec<_>>(),
            vec![3]
        );
        assert_eq!(index.count(&location), Some(3));
    }

    #[test]
    fn positions_keep_counting_across_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        fs::write(&path, "one two\nthree\n\nfour").unwrap();

        let mut index = InvertedIndex::new();
        IndexBuilder::new(&mut index).build(&path);

        let location = path.to_string_lossy().into_owned();
        assert!(index.contains_position("four", &location, 4));
        assert_eq!(index.count(&location), Some(4));
    }

    #[test]
    fn directory_walk_keeps_only_text_extensions() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), "alpha").unwrap();
        fs::write(dir.path().join("keep.TEXT"), "beta").unwrap();
        fs::write(dir.path().join("skip.md"), "gamma").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/nested.txt"), "delta").unwrap();

        let files = text_files(dir.path());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"keep.txt".to_string()));
        assert!(names.contains(&"keep.TEXT".to_string()));
        assert!(names.contains(&"nested.txt".to_string()));
    }

    #[test]
    fn a_missing_file_is_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let mut index = InvertedIndex::new();
        IndexBuilder::new(&mut index).build(&dir.path().join("absent.txt"));
        assert!(index.is_empty());
    }

    #[test]
    fn concurrent_build_matches_sequential_build() {
        let dir = tempdir().unwrap();
        for n in 0..10 {
            let body = format!("Document {n} talks about cats and dogs.\nDogs bark; cats nap {n} times.");
            fs::write(dir.path().join(format!("doc{n}.txt")), body).unwrap();
        }

        let mut sequential = InvertedIndex::new();
        IndexBuilder::new(&mut sequential).build(dir.path());

        let shared = Arc::new(ConcurrentIndex::new());
        let queue = Arc::new(WorkQueue::new(4));
        ConcurrentBuilder::new(Arc::clone(&shared), Arc::clone(&queue)).build(dir.path());
        queue.join();

        assert_eq!(shared.counts(), sequential.counts().clone());
        for word in sequential.words() {
            for location in sequential.locations(word) {
                assert_eq!(
                    shared.position_count(word, location),
                    sequential.position_count(word, location),
                    "mismatch for {word} at {location}"
                );
            }
        }
    }
}
