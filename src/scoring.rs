//! Scoring Aggregator
//!
//! Turns acquisition evidence plus the rule registry's verdicts into a
//! [`ScanResult`]. Connectivity checks are scored first and live outside the
//! registry because they look at the fetch outcome, not at the URL or text.

use crate::acquirer::FetchOutcome;
use crate::models::{RiskTier, RuleCategory, ScanResult, TriggeredRule};
use crate::normalizer::InspectableText;
use crate::rules::{RuleContext, RuleRegistry};
use std::sync::Arc;
use url::Url;

pub const MAX_SCORE: u8 = 100;

/// Lower bound of each tier, highest first. Anything below the last entry
/// is `Low`.
pub const TIER_THRESHOLDS: [(u8, RiskTier); 3] = [
    (80, RiskTier::Critical),
    (50, RiskTier::High),
    (20, RiskTier::Medium),
];

/// Redirects followed before `long_redirect_chain` fires
pub const LONG_CHAIN_REDIRECTS: usize = 3;

pub fn tier_for(score: u8) -> RiskTier {
    TIER_THRESHOLDS
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map(|(_, tier)| *tier)
        .unwrap_or(RiskTier::Low)
}

/// A fixed-weight check on the fetch outcome
#[derive(Debug, Clone, Copy)]
pub struct ConnectivityCheck {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub weight: u32,
}

impl ConnectivityCheck {
    fn to_triggered(self) -> TriggeredRule {
        TriggeredRule {
            id: self.id.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            weight: self.weight,
            category: RuleCategory::Behavioral,
        }
    }
}

pub const ACQUISITION_FAILED: ConnectivityCheck = ConnectivityCheck {
    id: "acquisition_failed",
    title: "Page could not be retrieved",
    description: "The page did not load; unreachable or evasive hosts are common for short-lived phishing sites.",
    weight: 25,
};

pub const NON_OK_STATUS: ConnectivityCheck = ConnectivityCheck {
    id: "non_ok_status",
    title: "Unexpected HTTP status",
    description: "The final response was not HTTP 200.",
    weight: 15,
};

pub const LONG_REDIRECT_CHAIN: ConnectivityCheck = ConnectivityCheck {
    id: "long_redirect_chain",
    title: "Long redirect chain",
    description: "The link bounced through more than three redirects before settling.",
    weight: 15,
};

pub const KNOWN_THREAT_DOMAIN: ConnectivityCheck = ConnectivityCheck {
    id: "known_threat_domain",
    title: "Known threat domain",
    description: "The final domain appears on a threat list.",
    weight: 60,
};

const TRUSTED_AUTHORITY_ID: &str = "trusted_authority";

/// Everything gathered for one scan before scoring
#[derive(Debug)]
pub struct ScanEvidence<'a> {
    /// Input as given by the caller (trimmed)
    pub input: &'a str,
    /// URL the rules look at: the final URL, or the input when unresolved
    pub evaluated_url: &'a Url,
    pub outcome: &'a FetchOutcome,
    pub inspectable: &'a InspectableText,
    pub scripts_fetched: usize,
    pub known_threat: bool,
    pub analysis_incomplete: bool,
    pub content_status: String,
}

pub struct ScoringAggregator {
    registry: Arc<RuleRegistry>,
}

impl ScoringAggregator {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Connectivity points, then registry rules in order, then clamp.
    pub fn score(&self, evidence: &ScanEvidence<'_>) -> ScanResult {
        let outcome = evidence.outcome;
        let mut triggered: Vec<TriggeredRule> = Vec::new();

        for check in connectivity_checks(outcome, evidence.known_threat) {
            log::debug!("Connectivity check '{}' fired (+{})", check.id, check.weight);
            triggered.push(check.to_triggered());
        }

        let document = outcome.document();
        let ctx = RuleContext::new(evidence.evaluated_url, &evidence.inspectable.text).with_fetch(
            document.map(|d| d.status_code),
            document.map(|d| d.body.len()),
        );
        let evaluation = self.registry.evaluate(&ctx);
        for rule in &evaluation.triggered {
            if triggered.iter().all(|t| t.id != rule.id) {
                triggered.push(rule.to_triggered());
            }
        }

        let raw_score = triggered
            .iter()
            .fold(0u32, |acc, t| acc.saturating_add(t.weight));
        let score = clamp_score(raw_score);
        let tier = tier_for(score);

        ScanResult {
            input_url: evidence.input.to_string(),
            final_url: evidence.evaluated_url.to_string(),
            redirect_chain: chain_strings(outcome),
            status_code: document.map(|d| d.status_code),
            raw_score,
            score,
            tier,
            summary: tier.summary().to_string(),
            detected_warnings: count_warnings(&triggered),
            triggered_rules: triggered,
            content_status: evidence.content_status.clone(),
            trusted: false,
            analysis_incomplete: evidence.analysis_incomplete,
            scripts_fetched: evidence.scripts_fetched,
            decoded_payloads: evidence.inspectable.decoded_payloads,
            content_sha256: document.map(|_| evidence.inspectable.sha256()),
            rule_faults: evaluation.faults.iter().map(|id| id.to_string()).collect(),
            rule_set_version: self.registry.version().to_string(),
            scanned_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Result for an allow-listed final domain: zero score, one informational
    /// entry, no content evaluation.
    pub fn trusted(
        &self,
        input: &str,
        evaluated_url: &Url,
        outcome: &FetchOutcome,
        domain: &str,
        content_status: String,
        analysis_incomplete: bool,
    ) -> ScanResult {
        let entry = TriggeredRule {
            id: TRUSTED_AUTHORITY_ID.to_string(),
            title: "Trusted authority".to_string(),
            description: format!("{} is on the trusted domain list.", domain),
            weight: 0,
            category: RuleCategory::Domain,
        };

        ScanResult {
            input_url: input.to_string(),
            final_url: evaluated_url.to_string(),
            redirect_chain: chain_strings(outcome),
            status_code: outcome.document().map(|d| d.status_code),
            raw_score: 0,
            score: 0,
            tier: RiskTier::Low,
            summary: RiskTier::Low.summary().to_string(),
            detected_warnings: 0,
            triggered_rules: vec![entry],
            content_status,
            trusted: true,
            analysis_incomplete,
            scripts_fetched: 0,
            decoded_payloads: 0,
            content_sha256: None,
            rule_faults: Vec::new(),
            rule_set_version: self.registry.version().to_string(),
            scanned_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn connectivity_checks(outcome: &FetchOutcome, known_threat: bool) -> Vec<ConnectivityCheck> {
    let mut fired = Vec::new();

    match outcome {
        FetchOutcome::Failure { reason, .. } if reason.counts_as_evidence() => {
            fired.push(ACQUISITION_FAILED);
        }
        FetchOutcome::Failure { .. } => {}
        FetchOutcome::Success(doc) => {
            if doc.status_code != 200 {
                fired.push(NON_OK_STATUS);
            }
        }
    }

    if outcome.redirect_chain().len().saturating_sub(1) > LONG_CHAIN_REDIRECTS {
        fired.push(LONG_REDIRECT_CHAIN);
    }
    if known_threat {
        fired.push(KNOWN_THREAT_DOMAIN);
    }
    fired
}

fn clamp_score(raw: u32) -> u8 {
    raw.min(u32::from(MAX_SCORE)) as u8
}

fn count_warnings(triggered: &[TriggeredRule]) -> usize {
    triggered.iter().filter(|t| t.weight > 0).count()
}

fn chain_strings(outcome: &FetchOutcome) -> Vec<String> {
    outcome.redirect_chain().iter().map(Url::to_string).collect()
}
