//! Web-search client (C3).
//!
//! Thin wrapper over You.com's search API: clean the query, fetch up to
//! `TOP_K` hits, and synthesize a snippet per hit from its description and
//! sub-snippets. Retries a handful of times on transport failure or an empty
//! hit list; exhausting retries on empty hits is not fatal, since an answer
//! can still be produced without citations.

use serde::Deserialize;

use crate::config::Config;
use crate::context::Reference;
use crate::error::{GamalError, Result};
use crate::logger;

const SEARCH_URL: &str = "https://api.ydc-index.io/search";
const TOP_K: usize = 3;
const MAX_ATTEMPTS: usize = 3;
const SNIPPET_MAX_LEN: usize = 1000;

pub struct SearchClient {
    http: reqwest::Client,
    api_key: String,
    debug: bool,
}

impl SearchClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.you_api_key.clone(),
            debug: config.debug_search,
        }
    }

    /// Search for `query` and return up to [`TOP_K`] references, numbered
    /// from 1. Returns an empty vector (not an error) if every attempt came
    /// back with zero hits.
    pub async fn search(&self, query: &str) -> Result<Vec<Reference>> {
        let cleaned = clean_query(query);

        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_search(&cleaned).await {
                Ok(hits) if !hits.is_empty() => return Ok(hits),
                Ok(_) => {
                    logger::debug(self.debug, || format!("search attempt {attempt} returned 0 hits"));
                    last_err = None;
                }
                Err(err) => {
                    logger::debug(self.debug, || format!("search attempt {attempt} failed: {err}"));
                    last_err = Some(err);
                }
            }
        }

        // Exhausting retries on a hard failure is fatal; exhausting them on
        // an empty hit list is not, since Respond can still answer without
        // citations.
        match last_err {
            Some(err) => Err(err),
            None => Ok(Vec::new()),
        }
    }

    async fn try_search(&self, query: &str) -> Result<Vec<Reference>> {
        logger::debug(self.debug, || format!("search request: GET {SEARCH_URL}?query={query} (X-API-Key redacted)"));

        let response = self
            .http
            .get(SEARCH_URL)
            .header("X-API-Key", &self.api_key)
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| GamalError::Search(e.to_string()))?;

        logger::debug(self.debug, || format!("search response: {SEARCH_URL} -> {}", response.status()));

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GamalError::Search(format!("HTTP {status}: {body}")));
        }

        let body = response.bytes().await.map_err(|e| GamalError::Search(e.to_string()))?;

        let parsed: YouSearchResponse = serde_json::from_slice(&body)
            .map_err(|e| GamalError::Search(format!("JSON parse error: {e}")))?;

        let hits = parsed
            .hits
            .into_iter()
            .take(TOP_K)
            .enumerate()
            .map(|(i, hit)| Reference {
                position: i + 1,
                title: hit.title,
                url: hit.url,
                snippet: synthesize_snippet(&hit.description, &hit.snippets),
            })
            .collect();

        Ok(hits)
    }
}

fn clean_query(query: &str) -> String {
    let mut q = query.trim();
    q = q.strip_suffix('.').unwrap_or(q);
    if q.len() >= 2 && q.starts_with('"') && q.ends_with('"') {
        q = &q[1..q.len() - 1];
    }
    q.to_string()
}

fn synthesize_snippet(description: &str, snippets: &[String]) -> String {
    let joined = snippets.join("\n");
    let combined = format!("{description}{joined}");
    combined.chars().take(SNIPPET_MAX_LEN).collect()
}

#[derive(Debug, Deserialize)]
struct YouSearchResponse {
    #[serde(default)]
    hits: Vec<YouHit>,
}

#[derive(Debug, Deserialize)]
struct YouHit {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    snippets: Vec<String>,
}
