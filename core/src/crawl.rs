use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::{header, redirect};
use scraper::{Html, Selector};
use url::Url;

use crate::concurrent::ConcurrentIndex;
use crate::error::Result;
use crate::index::InvertedIndex;
use crate::queue::WorkQueue;
use crate::stem::Stemmer;

const USER_AGENT: &str = "scour/0.1 (+https://example.com/scour)";
const REDIRECT_LIMIT: usize = 3;
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Strips the fragment. Query percent-encoding was already applied when the
/// `Url` was parsed, so normalization is idempotent.
pub fn normalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// The HTTP(S) links of every anchor tag in `html`, resolved against
/// `base`, normalized, in document order. Unparseable hrefs and other
/// schemes are dropped.
pub fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    let anchors = Selector::parse("a[href]").expect("valid selector");
    let document = Html::parse_document(html);

    let mut links = Vec::new();
    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            tracing::debug!(href, "dropping unparseable link");
            continue;
        };
        let resolved = normalize(resolved);
        if matches!(resolved.scheme(), "http" | "https") {
            links.push(resolved);
        }
    }
    links
}

/// The page's visible text: the body subtree with tags replaced by spaces.
pub fn strip_html(html: &str) -> String {
    let body = Selector::parse("body").expect("valid selector");
    Html::parse_document(html)
        .select(&body)
        .next()
        .map(|node| node.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

struct CrawlState {
    index: Arc<ConcurrentIndex>,
    queue: Arc<WorkQueue>,
    client: Client,
    visited: Mutex<HashSet<Url>>,
    limit: usize,
}

/// Breadth-first crawler over the work queue, bounded by a hard cap on
/// distinct pages. Each page task fetches, discovers links, indexes the
/// page into a private local index, and bulk-merges it into the shared one.
pub struct WebCrawler {
    state: Arc<CrawlState>,
}

impl WebCrawler {
    pub fn new(index: Arc<ConcurrentIndex>, queue: Arc<WorkQueue>, limit: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::limited(REDIRECT_LIMIT))
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(WebCrawler {
            state: Arc::new(CrawlState {
                index,
                queue,
                client,
                visited: Mutex::new(HashSet::new()),
                limit: limit.max(1),
            }),
        })
    }

    /// Crawls from `seed` until the cap is reached and every submitted page
    /// task has run.
    pub fn crawl(&self, seed: Url) {
        let seed = normalize(seed);
        self.state.visited.lock().insert(seed.clone());
        submit(&self.state, seed);
        self.state.queue.finish();
    }

    /// Distinct pages admitted so far (at most the cap).
    pub fn visited_count(&self) -> usize {
        self.state.visited.lock().len()
    }
}

fn submit(state: &Arc<CrawlState>, url: Url) {
    let task_state = Arc::clone(state);
    state.queue.execute(move || crawl_page(&task_state, url));
}

fn crawl_page(state: &Arc<CrawlState>, url: Url) {
    let html = match fetch(&state.client, &url) {
        Ok(Some(html)) => html,
        Ok(None) => return,
        Err(error) => {
            tracing::warn!(url = %url, %error, "fetch failed");
            return;
        }
    };

    // Admission and task submission share one critical section so the page
    // cap holds under contention. The lock is released before the merge.
    {
        let mut visited = state.visited.lock();
        for link in admit(&mut visited, state.limit, extract_links(&url, &html)) {
            submit(state, link);
        }
    }

    let stemmer = Stemmer::new();
    let words = stemmer.stem_line(&strip_html(&html));
    let mut local = InvertedIndex::new();
    if let Err(error) = local.add_all(&words, url.as_str(), 1) {
        tracing::warn!(url = %url, %error, "failed to index page");
        return;
    }
    state.index.merge(local);
}

/// Inserts discovered links into the visited set in document order while it
/// stays under the cap; returns the newly admitted ones.
fn admit(visited: &mut HashSet<Url>, limit: usize, links: Vec<Url>) -> Vec<Url> {
    let mut accepted = Vec::new();
    for link in links {
        if visited.len() >= limit {
            break;
        }
        if visited.insert(link.clone()) {
            accepted.push(link);
        }
    }
    accepted
}

/// Fetches a page, following at most the configured number of redirects.
/// `None` means the response was not HTML.
fn fetch(client: &Client, url: &Url) -> Result<Option<String>> {
    let response = client.get(url.clone()).send()?.error_for_status()?;
    let html = match response.headers().get(header::CONTENT_TYPE) {
        Some(kind) if !kind.to_str().unwrap_or("").starts_with("text/html") => return Ok(None),
        _ => response.text()?,
    };
    Ok(Some(html))
}
