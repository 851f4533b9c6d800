//! HTTP fetching
//!
//! A single GET per URL, letting reqwest's redirect policy follow the
//! chain transparently. Every outcome — success, HTTP error status, or
//! network failure — is reported to the caller rather than retried here;
//! retry decisions belong to the worker, which knows the frontier entry's
//! retry count.

use crate::config::UserAgentConfig;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

/// Outcome of fetching a URL.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Got an HTTP response, successful or not. Status is reported as-is;
    /// the caller decides what to do with 4xx/5xx. `body` is the raw
    /// response bytes, undecoded — hashing and storage need exactly what
    /// the server sent, not a charset-reinterpreted copy.
    Response {
        final_url: String,
        status_code: u16,
        content_type: String,
        body: Vec<u8>,
    },
    /// The request never reached a server (DNS, connect, TLS, timeout).
    NetworkError { message: String },
}

/// Builds an HTTP client identifying itself per the configured contact
/// details, so sites can tell who is crawling them and how to reach out.
pub fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches `url`, returning the HTTP response (whatever its status) or a
/// description of why the network request itself failed.
pub async fn fetch(client: &Client, url: &str) -> FetchOutcome {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return FetchOutcome::NetworkError { message: e.to_string() },
    };

    let final_url = response.url().to_string();
    let status_code = response.status().as_u16();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    match response.bytes().await {
        Ok(body) => FetchOutcome::Response {
            final_url,
            status_code,
            content_type,
            body: body.to_vec(),
        },
        Err(e) => FetchOutcome::NetworkError { message: e.to_string() },
    }
}
