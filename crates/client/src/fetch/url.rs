//! URL canonicalization for consistent request identity.
//!
//! Entries are keyed by method + URL, so two spellings of the same URL
//! must collapse to one key before they reach the store.

use holdfast_core::Error;
use url::Url;

/// Canonicalize a URL string for consistent request identity.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Lowercase the host
/// 3. Remove fragment (#...)
/// 4. Keep query string intact (do not reorder)
///
/// Non-http(s) schemes are rejected; the layer never intercepts them.
pub fn canonicalize(input: &str) -> Result<Url, Error> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidRequest("empty URL".into()));
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| Error::InvalidRequest(format!("{trimmed}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            parsed
                .set_host(Some(&lowered))
                .map_err(|e| Error::InvalidRequest(e.to_string()))?;
        }
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
