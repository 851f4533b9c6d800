//! Seeds the frontier and manages the worker pool.

use crate::config::Config;
use crate::content::ContentStore;
use crate::fetcher::build_http_client;
use crate::pacing::DomainDelay;
use crate::robots::RobotsCache;
use crate::storage::{SqliteStore, Store, StoreStats};
use crate::urlnorm;
use crate::worker::{Worker, WorkerConfig};
use crate::CrawlError;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Owns the shared pieces of crawl state (robots cache, delay scheduler,
/// allowed-domain set) and spawns/stops the worker pool.
pub struct Controller {
    database_path: std::path::PathBuf,
    config: Config,
    same_domain: bool,
    allowed_domains: Arc<HashSet<String>>,
    shutdown: Arc<AtomicBool>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl Controller {
    pub fn new(config: Config, same_domain: bool) -> Self {
        Self {
            database_path: std::path::PathBuf::from(&config.output.database_path),
            config,
            same_domain,
            allowed_domains: Arc::new(HashSet::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    /// Adds a seed URL to the frontier at depth 0, registering its
    /// hostname as allowed when running in same-domain mode.
    pub fn add_seed(&mut self, store: &SqliteStore, seed: &str) -> Result<(), CrawlError> {
        let url = Url::parse(seed).map_err(CrawlError::UrlParse)?;

        if self.same_domain {
            if let Some(host) = urlnorm::host_of(&url) {
                Arc::make_mut(&mut self.allowed_domains).insert(host);
            }
        }

        store.insert_if_new(url.as_str(), 0)?;
        Ok(())
    }

    /// Spawns `num_workers` tasks, each with its own database connection,
    /// sharing the robots cache, delay scheduler, and HTTP client.
    pub fn start(&mut self, num_workers: usize, max_depth: u32) -> Result<(), CrawlError> {
        let client = build_http_client(
            &self.config.user_agent,
            Duration::from_secs(self.config.crawler.fetch_timeout_secs),
        )?;
        let robots = Arc::new(RobotsCache::new());
        let domain_delay = Arc::new(DomainDelay::new(Duration::from_millis(
            self.config.crawler.request_delay_ms,
        )));
        let content_store = Arc::new(ContentStore::new(self.config.output.blob_dir.clone())?);
        let user_agent = format!(
            "{}/{} (+{}; {})",
            self.config.user_agent.crawler_name,
            self.config.user_agent.crawler_version,
            self.config.user_agent.contact_url,
            self.config.user_agent.contact_email,
        );

        for id in 1..=num_workers {
            let store = SqliteStore::new(&self.database_path)?;
            let worker = Worker::new(
                id,
                store,
                content_store.clone(),
                robots.clone(),
                domain_delay.clone(),
                client.clone(),
                self.allowed_domains.clone(),
                WorkerConfig {
                    max_depth,
                    max_retries: self.config.crawler.max_retries,
                    stuck_threshold_secs: self.config.crawler.stuck_threshold_secs,
                    same_domain: self.same_domain,
                    user_agent: user_agent.clone(),
                },
                self.shutdown.clone(),
            );

            self.handles.push(tokio::spawn(async move { worker.run().await }));
        }

        tracing::info!(workers = num_workers, same_domain = self.same_domain, "crawler started");
        Ok(())
    }

    /// Signals all workers to stop after their current job, then waits up
    /// to `shutdown_grace` for them to exit before abandoning the rest.
    pub async fn stop(&mut self) {
        tracing::info!("stopping crawler");
        self.shutdown.store(true, Ordering::Relaxed);

        let grace = Duration::from_secs(self.config.crawler.shutdown_grace_secs);
        let deadline = tokio::time::Instant::now() + grace;

        for handle in self.handles.drain(..) {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if tokio::time::timeout(remaining, handle).await.is_err() {
                tracing::warn!("worker did not stop within grace period");
            }
        }

        tracing::info!("stopped");
    }

    /// Returns current frontier status counts.
    pub fn stats(&self, store: &SqliteStore) -> Result<StoreStats, CrawlError> {
        Ok(store.stats()?)
    }
}

/// Opens (creating if necessary) the database and its blob directory.
pub fn open_store(path: &Path) -> Result<SqliteStore, CrawlError> {
    SqliteStore::new(path).map_err(CrawlError::Store)
}
