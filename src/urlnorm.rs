//! URL resolution and canonicalization.
//!
//! Given a base URL and a (possibly relative) link found on that page,
//! resolves it to an absolute, canonical form: fragment stripped, scheme
//! restricted to http/https, host lowercased, default port elided.

use url::Url;

/// Resolves `link` against `base` and canonicalizes the result.
///
/// Returns `None` if `link` is empty, fails to resolve, or resolves to a
/// non-http(s) scheme.
pub fn normalize(base: &Url, link: &str) -> Option<Url> {
    if link.is_empty() {
        return None;
    }

    let mut resolved = base.join(link).ok()?;

    resolved.set_fragment(None);

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    if let Some(host) = resolved.host_str() {
        let lower = host.to_lowercase();
        if lower != host {
            // `set_host` re-validates and re-lowercases; safe to ignore errors
            // since the host already parsed successfully once.
            let _ = resolved.set_host(Some(&lower));
        }
    }

    if let Some(port) = resolved.port() {
        let is_default = (resolved.scheme() == "http" && port == 80)
            || (resolved.scheme() == "https" && port == 443);
        if is_default {
            let _ = resolved.set_port(None);
        }
    }

    Some(resolved)
}

/// Extracts the lowercase hostname from a URL, if any.
pub fn host_of(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
