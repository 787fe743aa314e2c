//! Chapter link discovery.
//!
//! Given a series landing page, collect every anchor that follows the
//! chapter-path convention (a `/title/` segment plus a `ch_<n>` marker),
//! dedup by exact URL, and order ascending by the chapter number parsed out
//! of the URL. The result becomes the persisted work queue.

use crate::browser::PageDriver;
use crate::config::RunConfig;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Script projecting every anchor's resolved href out of the page.
const ANCHOR_SCRIPT: &str =
    "Array.from(document.querySelectorAll('a[href]')).map((a) => a.href)";

fn chapter_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)ch_(\d+)").expect("chapter marker pattern is valid"))
}

/// Whether a URL follows the chapter-path convention.
pub fn is_chapter_link(url: &str, path_marker: &str) -> bool {
    url.contains(path_marker) && chapter_marker().is_match(url)
}

/// The numeric chapter identifier in a URL; 0 when absent or unparseable.
pub fn chapter_number(url: &str) -> u64 {
    chapter_marker()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Dedup by exact URL string (first occurrence wins), then sort ascending by
/// parsed chapter number. The sort is stable, so unparseable URLs keep their
/// discovery order at the front.
pub fn order_chapter_links(links: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique: Vec<String> = links
        .into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect();
    unique.sort_by_key(|url| chapter_number(url));
    unique
}

/// Append a `key=value` listing parameter, respecting any existing query.
/// Unparseable URLs pass through unchanged.
pub fn with_listing_param(link: &str, param: &str) -> String {
    let Some((key, value)) = param.split_once('=') else {
        return link.to_string();
    };
    match url::Url::parse(link) {
        Ok(mut parsed) => {
            parsed.query_pairs_mut().append_pair(key, value);
            parsed.to_string()
        }
        Err(_) => link.to_string(),
    }
}

/// Collect, order, and decorate the chapter links of a series landing page.
///
/// Navigation failure or zero matches yields an empty list, reported here
/// with a warning and never fatal to the caller.
pub async fn discover_chapter_links(
    driver: &mut dyn PageDriver,
    series_url: &str,
    cfg: &RunConfig,
) -> Vec<String> {
    info!("discovering chapters at {series_url}");

    if let Err(e) = driver.navigate(series_url, cfg.navigation_timeout_ms).await {
        warn!("navigation to {series_url} failed: {e:#}");
        return Vec::new();
    }
    // No DOM-ready signal beyond the load event; give late scripts a moment.
    tokio::time::sleep(cfg.gate.settle_delay).await;

    let anchors = match driver.evaluate(ANCHOR_SCRIPT).await {
        Ok(value) => value,
        Err(e) => {
            warn!("anchor collection on {series_url} failed: {e:#}");
            return Vec::new();
        }
    };

    let raw: Vec<String> = anchors
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let matching: Vec<String> = raw
        .into_iter()
        .filter(|url| is_chapter_link(url, &cfg.link_path_marker))
        .collect();
    let ordered = order_chapter_links(matching);

    let links: Vec<String> = match &cfg.listing_param {
        Some(param) => ordered
            .iter()
            .map(|url| with_listing_param(url, param))
            .collect(),
        None => ordered,
    };

    if links.is_empty() {
        warn!("no chapter links found at {series_url}");
    } else {
        info!("found {} chapter links", links.len());
    }
    links
}
