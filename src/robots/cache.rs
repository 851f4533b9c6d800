//! Per-origin robots.txt cache with single-flight fetching.
//!
//! Entries live for the process lifetime: once an origin's policy has
//! been fetched (or has failed to fetch), that result is reused for
//! every subsequent lookup. Concurrent first-lookups for the same
//! origin share one in-flight fetch rather than issuing duplicate
//! requests.

use crate::robots::parser::ParsedRobots;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use url::Url;

/// Caches parsed robots.txt policy per origin (`scheme://host[:port]`).
pub struct RobotsCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<ParsedRobots>>>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn origin_key(url: &Url) -> String {
        match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), url.host_str().unwrap_or(""), port),
            None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or("")),
        }
    }

    /// Returns whether `url` may be fetched by `user_agent`, fetching and
    /// caching that origin's robots.txt on first use.
    pub async fn can_fetch(&self, client: &reqwest::Client, user_agent: &str, url: &Url) -> bool {
        let policy = self.policy_for(client, user_agent, url).await;
        policy.is_allowed(url.path(), user_agent)
    }

    async fn policy_for(&self, client: &reqwest::Client, user_agent: &str, url: &Url) -> ParsedRobots {
        let key = Self::origin_key(url);

        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(key)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_init(|| async { fetch_robots(client, user_agent, url).await })
            .await
            .clone()
    }
}

impl Default for RobotsCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches `{scheme}://{host}/robots.txt` for the origin of `url`.
///
/// Any failure (network error, non-2xx status, unreadable body) falls
/// back to the permissive `allow_all` sentinel so that crawling is never
/// blocked by an unreachable robots.txt.
async fn fetch_robots(client: &reqwest::Client, user_agent: &str, url: &Url) -> ParsedRobots {
    let mut robots_url = url.clone();
    robots_url.set_path("/robots.txt");
    robots_url.set_query(None);
    robots_url.set_fragment(None);

    let response = match client
        .get(robots_url.clone())
        .header("User-Agent", user_agent)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(_) => return ParsedRobots::allow_all(),
    };

    if !response.status().is_success() {
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(_) => ParsedRobots::allow_all(),
    }
}
