//! Risk engine: validate, acquire, trust check, scripts, normalize, score.

use crate::acquirer::{
    ContentAcquirer, FetchFailure, FetchOutcome, HttpFetcher, ReqwestFetcher, ScriptFetchReport,
};
use crate::config::EngineConfig;
use crate::errors::{LinkwardError, LinkwardResult};
use crate::models::ScanResult;
use crate::normalizer::PayloadNormalizer;
use crate::rules::RuleRegistry;
use crate::scoring::{ScanEvidence, ScoringAggregator};
use crate::trust::{DomainSet, ThreatProvider, TrustDecision, TrustProvider};
use std::sync::Arc;
use tokio::time::Instant;
use url::Url;

/// Schemes that never carry `//` but are still meant literally
const OPAQUE_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:", "mailto:", "file:"];

/// Trim user input, default a missing scheme to `https://` and validate it.
pub fn prepare_target(raw: &str) -> LinkwardResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LinkwardError::invalid_url(raw, "empty input"));
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if trimmed.contains("://") || OPAQUE_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| LinkwardError::invalid_url(trimmed, e))?;
    if matches!(url.scheme(), "http" | "https") && url.host_str().map_or(true, str::is_empty) {
        return Err(LinkwardError::invalid_url(trimmed, "missing host"));
    }
    Ok(url)
}

/// Shared, read-only scanner. Cheap to wrap in an `Arc` and call from many
/// tasks at once.
pub struct RiskEngine {
    acquirer: ContentAcquirer,
    normalizer: PayloadNormalizer,
    scoring: ScoringAggregator,
    trust: Arc<dyn TrustProvider>,
    threats: Arc<dyn ThreatProvider>,
    config: EngineConfig,
}

impl RiskEngine {
    /// Engine with the reqwest fetcher, built-in rules and built-in allow-list
    pub fn new(config: EngineConfig) -> LinkwardResult<Self> {
        let fetcher = ReqwestFetcher::new()?;
        Ok(Self::with_fetcher(Arc::new(fetcher), config))
    }

    pub fn with_fetcher(fetcher: Arc<dyn HttpFetcher>, config: EngineConfig) -> Self {
        Self {
            acquirer: ContentAcquirer::new(fetcher, config.clone()),
            normalizer: PayloadNormalizer::new(),
            scoring: ScoringAggregator::new(Arc::new(RuleRegistry::builtin())),
            trust: Arc::new(DomainSet::builtin_trusted()),
            threats: Arc::new(DomainSet::default()),
            config,
        }
    }

    pub fn with_trust(mut self, trust: Arc<dyn TrustProvider>) -> Self {
        self.trust = trust;
        self
    }

    pub fn with_threats(mut self, threats: Arc<dyn ThreatProvider>) -> Self {
        self.threats = threats;
        self
    }

    pub fn with_registry(mut self, registry: Arc<RuleRegistry>) -> Self {
        self.scoring = ScoringAggregator::new(registry);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        self.scoring.registry()
    }

    /// Scan one URL. Only syntactically invalid input is an error; every
    /// network problem ends up in the result.
    pub async fn scan(&self, raw: &str) -> LinkwardResult<ScanResult> {
        let input = raw.trim();
        let url = Url::parse(input).map_err(|e| LinkwardError::invalid_url(input, e))?;
        let deadline = Instant::now() + self.config.scan_deadline;
        log::info!("Scanning {}", url);

        let outcome = self.acquirer.fetch_document(&url, Some(deadline)).await;
        let evaluated = outcome.last_url().cloned().unwrap_or_else(|| url.clone());
        let host = evaluated
            .host_str()
            .map(|h| h.trim_end_matches('.').to_ascii_lowercase());

        let decision = TrustDecision::Unchecked.resolve(host.as_deref(), self.trust.as_ref());
        if let TrustDecision::Trusted(domain) = &decision {
            log::info!("{} resolved to trusted domain {}", input, domain);
            let incomplete = outcome.failure() == Some(&FetchFailure::DeadlineExceeded)
                || Instant::now() >= deadline;
            let status = describe_outcome(&outcome, None, incomplete);
            return Ok(self
                .scoring
                .trusted(input, &evaluated, &outcome, domain, status, incomplete));
        }

        let known_threat = host
            .as_deref()
            .is_some_and(|h| self.threats.is_known_threat(h));

        let scripts = match outcome.document() {
            Some(doc) => {
                self.acquirer
                    .fetch_scripts(&doc.final_url, &doc.body, Some(deadline))
                    .await
            }
            None => ScriptFetchReport::default(),
        };

        let main_body = outcome.document().map(|d| d.body.as_str()).unwrap_or_default();
        let script_bodies: Vec<&str> = scripts.bodies.iter().map(|s| s.body.as_str()).collect();
        let inspectable = self.normalizer.normalize(main_body, &script_bodies);

        let incomplete = outcome.failure() == Some(&FetchFailure::DeadlineExceeded)
            || scripts.deadline_hit
            || Instant::now() >= deadline;

        let evidence = ScanEvidence {
            input,
            evaluated_url: &evaluated,
            outcome: &outcome,
            inspectable: &inspectable,
            scripts_fetched: scripts.bodies.len(),
            known_threat,
            analysis_incomplete: incomplete,
            content_status: describe_outcome(&outcome, Some(&scripts), incomplete),
        };
        let result = self.scoring.score(&evidence);

        log::info!(
            "{} scored {} ({}) with {} warnings",
            input,
            result.score,
            result.tier,
            result.detected_warnings
        );
        Ok(result)
    }
}

/// Free-text account of what was fetched
fn describe_outcome(
    outcome: &FetchOutcome,
    scripts: Option<&ScriptFetchReport>,
    incomplete: bool,
) -> String {
    let mut status = match outcome {
        FetchOutcome::Success(doc) => {
            let mut s = format!(
                "Fetched {} (HTTP {}, {} bytes",
                doc.final_url,
                doc.status_code,
                doc.body.len()
            );
            if doc.truncated {
                s.push_str(", truncated");
            }
            s.push(')');
            match doc.redirects_followed() {
                0 => {}
                1 => s.push_str(" after 1 redirect"),
                n => s.push_str(&format!(" after {} redirects", n)),
            }
            s.push('.');
            s
        }
        FetchOutcome::Failure { reason, .. } => format!("Page could not be retrieved: {}.", reason),
    };

    if let Some(report) = scripts.filter(|r| r.referenced > 0) {
        status.push_str(&format!(
            " Scripts: {} of {} fetched.",
            report.bodies.len(),
            report.referenced
        ));
    }
    if incomplete {
        status.push_str(" Analysis incomplete: scan deadline reached.");
    }
    status
}
