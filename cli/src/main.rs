mod args;

use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use scour_core::builder::{ConcurrentBuilder, IndexBuilder};
use scour_core::crawl::WebCrawler;
use scour_core::query::{ConcurrentQueryParser, QueryParser, SimpleQueryParser};
use scour_core::{ConcurrentIndex, InvertedIndex, WorkQueue, DEFAULT_THREADS};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

use crate::args::ArgumentMap;

fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let map = ArgumentMap::parse(env::args().skip(1));

    // A crawl always runs on the work queue, so -html implies threaded mode.
    let result = if map.has_flag("-threads") || map.has_flag("-html") {
        run_threaded(&map)
    } else {
        run_serial(&map)
    };
    if let Err(error) = result {
        eprintln!("scour: {error:#}");
    }
}

/// Writes one output document, logging instead of failing the run.
fn write_output(path: &Path, emit: impl FnOnce(&mut BufWriter<File>) -> scour_core::Result<()>) {
    let result = File::create(path)
        .map_err(scour_core::Error::from)
        .and_then(|file| emit(&mut BufWriter::new(file)));
    if let Err(error) = result {
        eprintln!("scour: unable to write {}: {error}", path.display());
    }
}

fn run_serial(map: &ArgumentMap) -> Result<()> {
    let mut index = InvertedIndex::new();

    if map.has_flag("-text") {
        let Some(path) = map.path("-text") else {
            eprintln!("scour: -text requires a file or directory path");
            return Ok(());
        };
        IndexBuilder::new(&mut index).build(&path);
    }

    if map.has_flag("-index") {
        write_output(&map.path_or("-index", "index.json"), |w| {
            index.write_index_json(w)
        });
    }
    if map.has_flag("-counts") {
        write_output(&map.path_or("-counts", "counts.json"), |w| {
            index.write_counts_json(w)
        });
    }

    let mut parser = SimpleQueryParser::new(&index, map.has_flag("-exact"));
    run_queries(map, &mut parser);
    Ok(())
}

fn run_threaded(map: &ArgumentMap) -> Result<()> {
    let threads = if map.has_flag("-threads") {
        map.integer_or("-threads", DEFAULT_THREADS as i64)
    } else {
        DEFAULT_THREADS as i64
    };
    if threads < 1 {
        eprintln!("scour: -threads requires a worker count of at least 1");
        return Ok(());
    }

    let index = Arc::new(ConcurrentIndex::new());
    let queue = Arc::new(WorkQueue::new(threads as usize));

    if map.has_flag("-text") {
        let Some(path) = map.path("-text") else {
            eprintln!("scour: -text requires a file or directory path");
            queue.join();
            return Ok(());
        };
        ConcurrentBuilder::new(Arc::clone(&index), Arc::clone(&queue)).build(&path);
    }

    if map.has_flag("-html") {
        let Some(seed) = map.string("-html") else {
            eprintln!("scour: -html requires a seed URL");
            queue.join();
            return Ok(());
        };
        match Url::parse(seed) {
            Ok(seed) => {
                let limit = map.integer_or("-max", 1).max(1) as usize;
                let crawler = WebCrawler::new(Arc::clone(&index), Arc::clone(&queue), limit)?;
                tracing::info!(seed = %seed, limit, "starting crawl");
                crawler.crawl(seed);
                tracing::info!(visited = crawler.visited_count(), "crawl finished");
            }
            Err(error) => eprintln!("scour: malformed seed URL {seed}: {error}"),
        }
    }

    if map.has_flag("-index") {
        write_output(&map.path_or("-index", "index.json"), |w| {
            index.write_index_json(w)
        });
    }
    if map.has_flag("-counts") {
        write_output(&map.path_or("-counts", "counts.json"), |w| {
            index.write_counts_json(w)
        });
    }

    let mut parser =
        ConcurrentQueryParser::new(Arc::clone(&index), Arc::clone(&queue), map.has_flag("-exact"));
    run_queries(map, &mut parser);

    queue.join();
    Ok(())
}

fn run_queries(map: &ArgumentMap, parser: &mut dyn QueryParser) {
    if map.has_flag("-query") {
        let Some(path) = map.path("-query") else {
            eprintln!("scour: -query requires a path to a query file");
            return;
        };
        if let Err(error) = parser.search_file(&path) {
            eprintln!("scour: unable to search queries from {}: {error}", path.display());
        }
    }

    if map.has_flag("-results") {
        write_output(&map.path_or("-results", "results.json"), |w| {
            parser.write_results_json(w)
        });
    }
}
