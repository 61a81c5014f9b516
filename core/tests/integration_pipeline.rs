use std::fs;
use std::sync::Arc;

use scour_core::builder::{ConcurrentBuilder, IndexBuilder};
use scour_core::query::{ConcurrentQueryParser, QueryParser, SimpleQueryParser};
use scour_core::{ConcurrentIndex, InvertedIndex, WorkQueue};
use serde_json::Value;
use tempfile::{tempdir, TempDir};

fn corpus() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "Hello, hello world.").unwrap();
    fs::write(
        dir.path().join("b.txt"),
        "The cat sat.\nCats and catalogs everywhere!",
    )
    .unwrap();
    fs::write(dir.path().join("notes.md"), "ignored entirely").unwrap();
    dir
}

#[test]
fn sequential_build_and_query_end_to_end() {
    let dir = corpus();
    let mut index = InvertedIndex::new();
    IndexBuilder::new(&mut index).build(dir.path());

    let a = dir.path().join("a.txt").to_string_lossy().into_owned();
    let b = dir.path().join("b.txt").to_string_lossy().into_owned();
    assert_eq!(index.count(&a), Some(3));
    assert_eq!(index.count(&b), Some(7));
    assert!(!index.contains("ignored"));

    let queries = dir.path().join("queries.txt");
    fs::write(&queries, "hello\ncat\n").unwrap();

    let mut parser = SimpleQueryParser::new(&index, false);
    parser.search_file(&queries).unwrap();

    let results = parser.results();
    assert_eq!(results["hello"].len(), 1);
    assert_eq!(results["hello"][0].location, a);
    assert_eq!(results["hello"][0].matches, 2);

    // Prefix query: cat, cats -> cat, catalogs -> catalog all live in b.txt.
    assert_eq!(results["cat"][0].location, b);
    assert_eq!(results["cat"][0].matches, 3);
}

#[test]
fn emitted_json_is_tab_indented_with_fixed_point_scores() {
    let dir = corpus();
    let mut index = InvertedIndex::new();
    IndexBuilder::new(&mut index).build(dir.path());

    let mut index_json = Vec::new();
    index.write_index_json(&mut index_json).unwrap();
    let index_json = String::from_utf8(index_json).unwrap();
    assert!(index_json.starts_with("{\n\t\""));
    assert!(index_json.ends_with("}\n"));
    assert!(index_json.contains("\"hello\": {"));

    let parsed: Value = serde_json::from_str(&index_json).unwrap();
    let hello = parsed["hello"].as_object().unwrap();
    let (_, positions) = hello.iter().next().unwrap();
    assert_eq!(positions.as_array().unwrap().len(), 2);

    let queries = dir.path().join("queries.txt");
    fs::write(&queries, "hello world\n").unwrap();
    let mut parser = SimpleQueryParser::new(&index, true);
    parser.search_file(&queries).unwrap();

    let mut results_json = Vec::new();
    parser.write_results_json(&mut results_json).unwrap();
    let results_json = String::from_utf8(results_json).unwrap();
    // Both words land in a.txt: 3 matches over 3 tokens.
    assert!(results_json.contains("\"score\": 1.00000000"));
    assert!(results_json.contains("\"count\": 3"));
    assert!(serde_json::from_str::<Value>(&results_json).is_ok());

    let mut counts_json = Vec::new();
    index.write_counts_json(&mut counts_json).unwrap();
    let counts: Value = serde_json::from_slice(&counts_json).unwrap();
    assert_eq!(counts.as_object().unwrap().len(), 2);
}

#[test]
fn threaded_pipeline_matches_the_sequential_one() {
    let dir = corpus();
    for n in 0..20 {
        fs::write(
            dir.path().join(format!("extra{n:02}.txt")),
            format!("Extra document {n} about running dogs and sleeping cats."),
        )
        .unwrap();
    }
    let queries = dir.path().join("queries.txt");
    fs::write(&queries, "cats\nhello world\ndogs running\nrunning dogs\n").unwrap();

    let mut bare = InvertedIndex::new();
    IndexBuilder::new(&mut bare).build(dir.path());
    let mut sequential = SimpleQueryParser::new(&bare, false);
    sequential.search_file(&queries).unwrap();

    let shared = Arc::new(ConcurrentIndex::new());
    let queue = Arc::new(WorkQueue::new(6));
    ConcurrentBuilder::new(Arc::clone(&shared), Arc::clone(&queue)).build(dir.path());
    let mut threaded = ConcurrentQueryParser::new(Arc::clone(&shared), Arc::clone(&queue), false);
    threaded.search_file(&queries).unwrap();
    queue.join();

    assert_eq!(shared.counts(), bare.counts().clone());
    assert_eq!(threaded.results(), sequential.results().clone());
    // "dogs running" and "running dogs" collapse to one canonical query.
    assert_eq!(threaded.results().len(), 3);
}
