use serde::{Deserialize, Serialize};

/// Coarse severity label derived from the clamped score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    /// Human-readable verdict shown next to the tier
    pub fn summary(&self) -> &'static str {
        match self {
            RiskTier::Low => "No significant risk indicators were found.",
            RiskTier::Medium => "Some risk indicators were found; proceed with caution.",
            RiskTier::High => "Multiple strong risk indicators; avoid entering any data.",
            RiskTier::Critical => "This link is very likely malicious. Do not open it.",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Low => write!(f, "Low"),
            RiskTier::Medium => write!(f, "Medium"),
            RiskTier::High => write!(f, "High"),
            RiskTier::Critical => write!(f, "Critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Structural,
    Domain,
    Transport,
    Path,
    Content,
    Behavioral,
}

impl RuleCategory {
    /// Categories that inspect fetched content rather than the URL itself
    pub fn is_content(&self) -> bool {
        matches!(self, RuleCategory::Content | RuleCategory::Behavioral)
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleCategory::Structural => write!(f, "structural"),
            RuleCategory::Domain => write!(f, "domain"),
            RuleCategory::Transport => write!(f, "transport"),
            RuleCategory::Path => write!(f, "path"),
            RuleCategory::Content => write!(f, "content"),
            RuleCategory::Behavioral => write!(f, "behavioral"),
        }
    }
}

/// A rule (or connectivity check) that fired during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredRule {
    pub id: String,
    #[serde(rename = "name")]
    pub title: String,
    #[serde(rename = "risk_description")]
    pub description: String,
    #[serde(rename = "points_added")]
    pub weight: u32,
    pub category: RuleCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(rename = "link_input")]
    pub input_url: String,
    #[serde(rename = "link_final")]
    pub final_url: String,
    pub redirect_chain: Vec<String>,
    pub status_code: Option<u16>,

    // Scoring
    #[serde(rename = "suspicious_points")]
    pub raw_score: u32,
    pub score: u8,
    #[serde(rename = "risk_score")]
    pub tier: RiskTier,
    #[serde(rename = "result_message")]
    pub summary: String,
    #[serde(rename = "violated_rules")]
    pub triggered_rules: Vec<TriggeredRule>,
    pub detected_warnings: usize,

    // Acquisition
    #[serde(rename = "page_content_status")]
    pub content_status: String,
    pub trusted: bool,
    pub analysis_incomplete: bool,
    pub scripts_fetched: usize,
    pub decoded_payloads: usize,
    pub content_sha256: Option<String>,

    // Bookkeeping
    pub rule_faults: Vec<String>,
    pub rule_set_version: String,
    pub scanned_at: String,
}

impl ScanResult {
    pub fn has_rule(&self, id: &str) -> bool {
        self.triggered_rules.iter().any(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
        assert!(RiskTier::High < RiskTier::Critical);
    }

    #[test]
    fn test_triggered_rule_wire_names() {
        let rule = TriggeredRule {
            id: "direct_ip_host".to_string(),
            title: "Direct IP address".to_string(),
            description: "Host is a raw IPv4 literal".to_string(),
            weight: 30,
            category: RuleCategory::Structural,
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["name"], "Direct IP address");
        assert_eq!(json["risk_description"], "Host is a raw IPv4 literal");
        assert_eq!(json["points_added"], 30);
        assert_eq!(json["category"], "structural");
    }
}
