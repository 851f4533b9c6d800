//! Worker task: claim, fetch, parse, enqueue.
//!
//! Each worker owns its own SQLite connection and HTTP client for its
//! entire lifetime. Store calls are blocking (`rusqlite`), so they run
//! through `tokio::task::block_in_place` to avoid stalling other tasks
//! on the same runtime thread.

use crate::content::ContentStore;
use crate::fetcher::{self, FetchOutcome};
use crate::htmlparse;
use crate::pacing::DomainDelay;
use crate::robots::RobotsCache;
use crate::storage::{FrontierEntry, SqliteStore, Store};
use crate::urlnorm;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Config a worker needs that doesn't change over its lifetime.
pub struct WorkerConfig {
    pub max_depth: u32,
    pub max_retries: u32,
    pub stuck_threshold_secs: i64,
    pub same_domain: bool,
    pub user_agent: String,
}

pub struct Worker {
    id: usize,
    store: SqliteStore,
    content_store: Arc<ContentStore>,
    robots: Arc<RobotsCache>,
    domain_delay: Arc<DomainDelay>,
    client: reqwest::Client,
    allowed_domains: Arc<HashSet<String>>,
    config: WorkerConfig,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        store: SqliteStore,
        content_store: Arc<ContentStore>,
        robots: Arc<RobotsCache>,
        domain_delay: Arc<DomainDelay>,
        client: reqwest::Client,
        allowed_domains: Arc<HashSet<String>>,
        config: WorkerConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            store,
            content_store,
            robots,
            domain_delay,
            client,
            allowed_domains,
            config,
            shutdown,
        }
    }

    /// Runs the claim/fetch/parse/enqueue loop until shutdown is signaled.
    pub async fn run(&self) {
        tracing::info!(worker = self.id, "started");

        while !self.shutdown.load(Ordering::Relaxed) {
            let job = tokio::task::block_in_place(|| self.store.claim_next(self.config.stuck_threshold_secs));

            let entry = match job {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(worker = self.id, error = %e, "claim failed");
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    continue;
                }
            };

            self.process(entry).await;
        }

        tracing::info!(worker = self.id, "stopped");
    }

    async fn process(&self, entry: FrontierEntry) {
        let url = entry.url.clone();
        tracing::info!(worker = self.id, url = %url, depth = entry.depth, "claimed");

        let parsed_url = match Url::parse(&url) {
            Ok(u) => u,
            Err(_) => {
                self.mark_failed(entry.id);
                return;
            }
        };

        if !self.robots.can_fetch(&self.client, &self.config.user_agent, &parsed_url).await {
            tracing::info!(worker = self.id, url = %url, "blocked by robots.txt");
            self.mark_failed(entry.id);
            return;
        }

        self.domain_delay.wait(&parsed_url).await;

        match fetcher::fetch(&self.client, &url).await {
            FetchOutcome::NetworkError { message } => {
                tracing::warn!(worker = self.id, url = %url, error = %message, "fetch failed");
                if entry.retries > self.config.max_retries {
                    self.mark_failed(entry.id);
                } else {
                    self.requeue(entry.id);
                }
            }
            FetchOutcome::Response {
                final_url,
                status_code,
                content_type,
                body,
            } => {
                tracing::info!(worker = self.id, url = %url, status = status_code, "fetched");
                self.mark_done(entry.id, &url, Some(status_code));

                if content_type.contains("text/html") {
                    // The page was already fetched and recorded via
                    // mark_done above. A genuine store-layer failure here
                    // (as opposed to a merely non-fatal blob write error)
                    // overrides that to failed, per the post-fetch error
                    // policy: the URL won't be refetched either way.
                    if !self.store_page(&url, status_code, &body) {
                        self.mark_failed(entry.id);
                        return;
                    }

                    if entry.depth < self.config.max_depth {
                        self.enqueue_links(&final_url, &parsed_url, entry.depth, &body);
                    }
                }
            }
        }
    }

    /// Stores the fetched body (deduped by content hash) and its metadata.
    /// `body` is the raw response bytes, hashed and persisted as-is so
    /// `content_hash` reflects exactly what the server sent regardless of
    /// declared charset; only the title/meta/link extraction below works
    /// from a lossily-decoded view, since `scraper` needs `&str`.
    /// Returns `false` only on a genuine store-layer failure (the
    /// unexpected-exception case in the post-fetch error policy); a blob
    /// write failure is tolerated and recorded with an empty path instead.
    fn store_page(&self, url: &str, status_code: u16, body: &[u8]) -> bool {
        let (hash, content_path, _newly_written) =
            match tokio::task::block_in_place(|| self.content_store.store_or_link(&self.store, body)) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(worker = self.id, url, error = %e, "page lookup failed");
                    return false;
                }
            };

        let base = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(worker = self.id, url, error = %e, "failed to parse claimed url");
                return false;
            }
        };
        let html = String::from_utf8_lossy(body);
        let parsed = htmlparse::parse_html(&html, &base);

        let result = tokio::task::block_in_place(|| {
            self.store.save_page_metadata(
                url,
                &content_path.to_string_lossy(),
                &hash,
                parsed.title.as_deref(),
                parsed.meta_description.as_deref(),
                Some(status_code),
            )
        });

        if let Err(e) = result {
            tracing::warn!(worker = self.id, url, error = %e, "failed to save page metadata");
            return false;
        }

        true
    }

    fn enqueue_links(&self, final_url: &str, original_url: &Url, depth: u32, body: &[u8]) {
        let base = Url::parse(final_url).unwrap_or_else(|_| original_url.clone());
        let html = String::from_utf8_lossy(body);
        let parsed = htmlparse::parse_html(&html, &base);

        tokio::task::block_in_place(|| {
            for link in parsed.links {
                let normalized = match urlnorm::normalize(&base, &link) {
                    Some(url) => url,
                    None => continue,
                };

                if self.config.same_domain && !self.is_allowed_domain(&normalized) {
                    continue;
                }

                let next_depth = depth + 1;
                if let Err(e) = self.store.insert_if_new(normalized.as_str(), next_depth) {
                    tracing::warn!(worker = self.id, url = %normalized, error = %e, "failed to enqueue link");
                }
            }
        });
    }

    fn is_allowed_domain(&self, url: &Url) -> bool {
        match urlnorm::host_of(url) {
            Some(host) => self.allowed_domains.contains(&host),
            None => false,
        }
    }

    fn mark_done(&self, id: i64, url: &str, status_code: Option<u16>) {
        if let Err(e) = tokio::task::block_in_place(|| self.store.mark_done(id, url, status_code)) {
            tracing::warn!(worker = self.id, url, error = %e, "mark_done failed");
        }
    }

    fn mark_failed(&self, id: i64) {
        if let Err(e) = tokio::task::block_in_place(|| self.store.mark_failed(id)) {
            tracing::warn!(worker = self.id, id, error = %e, "mark_failed failed");
        }
    }

    fn requeue(&self, id: i64) {
        if let Err(e) = tokio::task::block_in_place(|| self.store.requeue(id)) {
            tracing::warn!(worker = self.id, id, error = %e, "requeue failed");
        }
    }
}
