//! External script extraction and fetching.

use super::{follow, FetchFailure, FetchOutcome, HttpFetcher};
use crate::config::EngineConfig;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio::task::JoinSet;
use tokio::time::Instant;
use url::Url;

static SCRIPT_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\b[^>]*?\bsrc\s*=\s*(?:"([^"]+)"|'([^']+)'|([^\s"'>]+))"#)
        .expect("script src regex")
});

#[derive(Debug, Clone)]
pub struct ScriptBody {
    pub url: Url,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptFetchReport {
    /// Successfully fetched scripts, in document order
    pub bodies: Vec<ScriptBody>,
    /// Distinct fetchable script URLs referenced by the document
    pub referenced: usize,
    /// Fetches actually started (never more than `max_scripts`)
    pub attempted: usize,
    /// The scan deadline cut at least one fetch short
    pub deadline_hit: bool,
}

/// Distinct http(s) `<script src>` targets, resolved against `base`, in
/// document order
pub fn extract_script_urls(base: &Url, html: &str) -> Vec<Url> {
    let mut urls: Vec<Url> = Vec::new();

    for cap in SCRIPT_SRC.captures_iter(html) {
        let Some(raw) = cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3)) else {
            continue;
        };
        let Ok(resolved) = base.join(raw.as_str().trim()) else {
            continue;
        };
        if super::is_fetchable(&resolved) && !urls.contains(&resolved) {
            urls.push(resolved);
        }
    }

    urls
}

pub(crate) async fn fetch_scripts(
    fetcher: Arc<dyn HttpFetcher>,
    headers: Vec<(&'static str, String)>,
    base: &Url,
    html: &str,
    config: &EngineConfig,
    deadline: Option<Instant>,
) -> ScriptFetchReport {
    let urls = extract_script_urls(base, html);
    let mut report = ScriptFetchReport {
        referenced: urls.len(),
        ..ScriptFetchReport::default()
    };

    if urls.len() > config.max_scripts {
        log::debug!(
            "{} references {} scripts, fetching the first {}",
            base,
            urls.len(),
            config.max_scripts
        );
    }

    // One task per script, and no more tasks than the cap
    let mut tasks = JoinSet::new();
    for (index, url) in urls.into_iter().take(config.max_scripts).enumerate() {
        let fetcher = Arc::clone(&fetcher);
        let headers = headers.clone();
        let timeout = config.script_timeout;
        let max_redirects = config.script_max_redirects;
        let max_body_bytes = config.max_body_bytes;
        report.attempted += 1;

        tasks.spawn(async move {
            let outcome = follow(
                fetcher.as_ref(),
                headers,
                &url,
                max_redirects,
                timeout,
                deadline,
                max_body_bytes,
            )
            .await;
            (index, url, outcome)
        });
    }

    let mut fetched = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let Ok((index, url, outcome)) = joined else {
            continue;
        };
        match outcome {
            FetchOutcome::Success(doc) if (200..300).contains(&doc.status_code) => {
                log::debug!("Fetched script {} ({} bytes)", url, doc.body.len());
                fetched.push((index, ScriptBody { url, body: doc.body }));
            }
            FetchOutcome::Success(doc) => {
                log::debug!("Skipping script {}: HTTP {}", url, doc.status_code);
            }
            FetchOutcome::Failure { reason, .. } => {
                if reason == FetchFailure::DeadlineExceeded {
                    report.deadline_hit = true;
                }
                log::debug!("Skipping script {}: {}", url, reason);
            }
        }
    }

    fetched.sort_by_key(|(index, _)| *index);
    report.bodies = fetched.into_iter().map(|(_, body)| body).collect();
    report
}
