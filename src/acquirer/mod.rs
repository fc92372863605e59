//! Content Acquirer
//!
//! Resolves a URL to its final document by walking redirects hop by hop,
//! and opportunistically pulls a bounded number of external scripts.
//! Split into submodules:
//! - `http`: the single-hop fetch seam and its reqwest implementation
//! - `scripts`: `<script src>` extraction and bounded concurrent fetching

mod http;
mod scripts;

pub use http::{FetchError, HttpFetcher, HttpRequest, HttpResponse, ReqwestFetcher};
pub use scripts::{extract_script_urls, ScriptBody, ScriptFetchReport};

use crate::config::EngineConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Why the primary target could not be acquired
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    #[error("timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("more than {0} redirects")]
    TooManyRedirects(usize),

    #[error("invalid redirect target '{0}'")]
    InvalidRedirect(String),

    #[error("scheme '{0}' is not fetched")]
    UnsupportedScheme(String),

    #[error("scan deadline exceeded")]
    DeadlineExceeded,
}

impl FetchFailure {
    /// Failures that say something about the target's reachability
    pub fn counts_as_evidence(&self) -> bool {
        !matches!(self, FetchFailure::UnsupportedScheme(_) | FetchFailure::DeadlineExceeded)
    }
}

impl From<FetchError> for FetchFailure {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Timeout => FetchFailure::Timeout,
            FetchError::Connect(m) => FetchFailure::Connect(m),
            FetchError::Network(m) | FetchError::Body(m) => FetchFailure::Network(m),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub final_url: Url,
    pub status_code: u16,
    /// Input URL first, final URL last, no duplicates
    pub redirect_chain: Vec<Url>,
    pub body: String,
    pub truncated: bool,
    pub elapsed: Duration,
}

impl FetchedDocument {
    pub fn redirects_followed(&self) -> usize {
        self.redirect_chain.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(FetchedDocument),
    Failure {
        reason: FetchFailure,
        redirect_chain: Vec<Url>,
    },
}

impl FetchOutcome {
    pub fn redirect_chain(&self) -> &[Url] {
        match self {
            FetchOutcome::Success(doc) => &doc.redirect_chain,
            FetchOutcome::Failure { redirect_chain, .. } => redirect_chain,
        }
    }

    /// Final URL on success, otherwise the last URL reached
    pub fn last_url(&self) -> Option<&Url> {
        match self {
            FetchOutcome::Success(doc) => Some(&doc.final_url),
            FetchOutcome::Failure { redirect_chain, .. } => redirect_chain.last(),
        }
    }

    pub fn document(&self) -> Option<&FetchedDocument> {
        match self {
            FetchOutcome::Success(doc) => Some(doc),
            FetchOutcome::Failure { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            FetchOutcome::Success(_) => None,
            FetchOutcome::Failure { reason, .. } => Some(reason),
        }
    }
}

/// Time left for one network call: the per-call timeout, or less if the scan
/// deadline is closer. `None` once the deadline has passed.
pub(crate) fn call_budget(timeout: Duration, deadline: Option<Instant>) -> Option<(Duration, bool)> {
    match deadline {
        None => Some((timeout, false)),
        Some(d) => {
            let left = d.saturating_duration_since(Instant::now());
            if left.is_zero() {
                None
            } else if left < timeout {
                Some((left, true))
            } else {
                Some((timeout, false))
            }
        }
    }
}

pub(crate) fn is_fetchable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

pub struct ContentAcquirer {
    fetcher: Arc<dyn HttpFetcher>,
    config: EngineConfig,
}

impl ContentAcquirer {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, config: EngineConfig) -> Self {
        Self { fetcher, config }
    }

    fn document_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("user-agent", self.config.user_agent.clone()),
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("accept-language", "en-US,en;q=0.9".to_string()),
        ]
    }

    fn script_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("user-agent", self.config.user_agent.clone()),
            ("accept", "*/*".to_string()),
        ]
    }

    /// Fetch the primary document with the configured caps
    pub async fn fetch_document(&self, url: &Url, deadline: Option<Instant>) -> FetchOutcome {
        self.fetch(url, self.config.max_redirects, self.config.request_timeout, deadline)
            .await
    }

    /// GET `url`, following at most `max_redirects` redirects. Each hop gets
    /// `timeout`, shortened to whatever is left before `deadline`.
    pub async fn fetch(
        &self,
        url: &Url,
        max_redirects: usize,
        timeout: Duration,
        deadline: Option<Instant>,
    ) -> FetchOutcome {
        follow(
            self.fetcher.as_ref(),
            self.document_headers(),
            url,
            max_redirects,
            timeout,
            deadline,
            self.config.max_body_bytes,
        )
        .await
    }

    /// Fetch up to `max_scripts` external scripts referenced by `html`
    pub async fn fetch_scripts(
        &self,
        base: &Url,
        html: &str,
        deadline: Option<Instant>,
    ) -> ScriptFetchReport {
        scripts::fetch_scripts(
            Arc::clone(&self.fetcher),
            self.script_headers(),
            base,
            html,
            &self.config,
            deadline,
        )
        .await
    }
}

/// Redirect-following GET over any fetcher
pub(crate) async fn follow(
    fetcher: &dyn HttpFetcher,
    headers: Vec<(&'static str, String)>,
    url: &Url,
    max_redirects: usize,
    timeout: Duration,
    deadline: Option<Instant>,
    max_body_bytes: usize,
) -> FetchOutcome {
    let started = Instant::now();
    let mut chain = vec![url.clone()];
    let mut current = url.clone();
    let mut hops = 0usize;

    if !is_fetchable(&current) {
        return FetchOutcome::Failure {
            reason: FetchFailure::UnsupportedScheme(current.scheme().to_string()),
            redirect_chain: chain,
        };
    }

    loop {
        let Some((budget, deadline_bound)) = call_budget(timeout, deadline) else {
            return FetchOutcome::Failure {
                reason: FetchFailure::DeadlineExceeded,
                redirect_chain: chain,
            };
        };

        let request = HttpRequest {
            url: current.clone(),
            headers: headers.clone(),
            timeout: budget,
            max_body_bytes,
        };

        log::debug!("GET {} (hop {}, budget {:?})", current, hops, budget);
        let response = match tokio::time::timeout(budget, fetcher.get(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(FetchError::Timeout)) | Err(_) => {
                let reason = if deadline_bound {
                    FetchFailure::DeadlineExceeded
                } else {
                    FetchFailure::Timeout
                };
                return FetchOutcome::Failure { reason, redirect_chain: chain };
            }
            Ok(Err(e)) => {
                log::debug!("GET {} failed: {}", current, e);
                return FetchOutcome::Failure {
                    reason: e.into(),
                    redirect_chain: chain,
                };
            }
        };

        if response.is_redirect() {
            let location = response.location.as_deref().unwrap_or_default();
            if hops >= max_redirects {
                return FetchOutcome::Failure {
                    reason: FetchFailure::TooManyRedirects(max_redirects),
                    redirect_chain: chain,
                };
            }

            let next = match current.join(location) {
                Ok(next) => next,
                Err(_) => {
                    return FetchOutcome::Failure {
                        reason: FetchFailure::InvalidRedirect(location.to_string()),
                        redirect_chain: chain,
                    }
                }
            };

            // A revisited URL moves to the end so the chain still ends at
            // the URL last visited.
            chain.retain(|u| u != &next);
            chain.push(next.clone());
            hops += 1;

            if !is_fetchable(&next) {
                return FetchOutcome::Failure {
                    reason: FetchFailure::UnsupportedScheme(next.scheme().to_string()),
                    redirect_chain: chain,
                };
            }

            current = next;
            continue;
        }

        let body = String::from_utf8_lossy(&response.body).into_owned();
        return FetchOutcome::Success(FetchedDocument {
            final_url: current,
            status_code: response.status,
            redirect_chain: chain,
            body,
            truncated: response.truncated,
            elapsed: started.elapsed(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> EngineConfig {
        EngineConfig {
            request_timeout: Duration::from_millis(500),
            script_timeout: Duration::from_millis(300),
            scan_deadline: Duration::from_secs(5),
            ..EngineConfig::default()
        }
    }

    fn acquirer() -> ContentAcquirer {
        ContentAcquirer::new(Arc::new(ReqwestFetcher::new().unwrap()), test_config())
    }

    #[tokio::test]
    async fn fetch_follows_redirects_and_records_chain() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/middle"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/middle"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/end"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/end"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>done</html>"))
            .mount(&server)
            .await;

        let start = Url::parse(&format!("{}/start", server.uri())).unwrap();
        let outcome = acquirer().fetch_document(&start, None).await;

        let doc = outcome.document().expect("should succeed");
        assert_eq!(doc.status_code, 200);
        assert_eq!(doc.body, "<html>done</html>");
        assert_eq!(doc.redirects_followed(), 2);
        assert_eq!(doc.redirect_chain.first(), Some(&start));
        assert_eq!(doc.redirect_chain.last(), Some(&doc.final_url));
        assert!(doc.final_url.path().ends_with("/end"));
    }

    #[tokio::test]
    async fn fetch_non_2xx_is_still_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let outcome = acquirer().fetch_document(&url, None).await;
        assert_eq!(outcome.document().map(|d| d.status_code), Some(404));
    }

    #[tokio::test]
    async fn fetch_redirect_loop_hits_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/b"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/a"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/a", server.uri())).unwrap();
        let outcome = acquirer()
            .fetch(&url, 4, Duration::from_millis(500), None)
            .await;

        assert_eq!(outcome.failure(), Some(&FetchFailure::TooManyRedirects(4)));
        // both URLs, each once
        assert_eq!(outcome.redirect_chain().len(), 2);
    }

    #[tokio::test]
    async fn fetch_timeout_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let outcome = acquirer().fetch_document(&url, None).await;
        assert_eq!(outcome.failure(), Some(&FetchFailure::Timeout));
        assert_eq!(outcome.redirect_chain(), &[url]);
    }

    #[tokio::test]
    async fn fetch_deadline_shortens_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let deadline = Instant::now() + Duration::from_millis(100);
        let outcome = acquirer()
            .fetch(&url, 5, Duration::from_secs(2), Some(deadline))
            .await;
        assert_eq!(outcome.failure(), Some(&FetchFailure::DeadlineExceeded));
    }

    #[tokio::test]
    async fn fetch_connection_refused_is_failure() {
        // Port 9 (discard) on localhost is almost never listening
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let outcome = acquirer().fetch_document(&url, None).await;
        let failure = outcome.failure().expect("should fail");
        assert!(failure.counts_as_evidence());
    }

    #[tokio::test]
    async fn fetch_body_is_truncated_at_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
            .mount(&server)
            .await;

        let config = EngineConfig {
            max_body_bytes: 1024,
            ..test_config()
        };
        let acquirer = ContentAcquirer::new(Arc::new(ReqwestFetcher::new().unwrap()), config);
        let url = Url::parse(&server.uri()).unwrap();
        let doc = acquirer.fetch_document(&url, None).await;
        let doc = doc.document().unwrap();
        assert_eq!(doc.body.len(), 1024);
        assert!(doc.truncated);
    }

    #[tokio::test]
    async fn unsupported_scheme_is_not_fetched() {
        let url = Url::parse("javascript:alert(1)").unwrap();
        let outcome = acquirer().fetch_document(&url, None).await;
        assert_eq!(
            outcome.failure(),
            Some(&FetchFailure::UnsupportedScheme("javascript".to_string()))
        );
        assert!(!outcome.failure().unwrap().counts_as_evidence());
    }
}
