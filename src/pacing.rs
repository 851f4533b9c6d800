//! Per-host politeness delay.
//!
//! Enforces a minimum interval between requests to the same host. Robots
//! `Crawl-delay` is deliberately not consulted here — only the configured
//! delay applies.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

pub struct DomainDelay {
    delay: Duration,
    last_access: Mutex<HashMap<String, Instant>>,
}

impl DomainDelay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_access: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks until at least `delay` has elapsed since the last request to
    /// this URL's host, then records this access.
    ///
    /// The next allowed instant for the host is reserved under a single
    /// lock acquisition before sleeping, so two workers racing to fetch
    /// the same host serialize onto back-to-back slots instead of both
    /// observing an empty map and firing at once.
    pub async fn wait(&self, url: &Url) {
        let host = url.host_str().unwrap_or("").to_lowercase();

        let sleep_for = {
            let mut last_access = self.last_access.lock().await;
            let now = Instant::now();
            let next_allowed = last_access
                .get(&host)
                .map(|&prev| prev + self.delay)
                .unwrap_or(now);
            let reserved = next_allowed.max(now);
            last_access.insert(host, reserved);
            reserved.saturating_duration_since(now)
        };

        if !sleep_for.is_zero() {
            tokio::time::sleep(sleep_for).await;
        }
    }
}
