//! Report rendering for the CLI: styled text per URL, or one JSON document.

use crate::errors::{LinkwardError, LinkwardResult};
use crate::models::{RiskTier, ScanResult};
use console::{style, StyledObject};
use std::path::Path;

const URL_WIDTH: usize = 72;

pub struct TextReporter;

impl TextReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, result: &ScanResult) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "{} {}\n",
            tier_badge(result.tier),
            style(truncate_middle(&result.input_url, URL_WIDTH)).white().bold()
        ));
        if result.final_url != result.input_url {
            out.push_str(&format!(
                "   {} {}\n",
                style("final:").dim(),
                truncate_middle(&result.final_url, URL_WIDTH)
            ));
        }
        if result.redirect_chain.len() > 1 {
            out.push_str(&format!(
                "   {} {} hop(s)\n",
                style("redirects:").dim(),
                result.redirect_chain.len() - 1
            ));
        }
        out.push_str(&format!(
            "   {} {}/100 ({} points)\n",
            style("score:").dim(),
            style(result.score).bold(),
            result.raw_score
        ));
        out.push_str(&format!("   {} {}\n", style("verdict:").dim(), result.summary));
        out.push_str(&format!("   {} {}\n", style("content:").dim(), result.content_status));

        for rule in &result.triggered_rules {
            let points = if rule.weight == 0 {
                style("info".to_string()).green()
            } else {
                style(format!("+{}", rule.weight)).yellow()
            };
            out.push_str(&format!(
                "   {} {:>5} {} {}\n",
                style("├─").dim(),
                points,
                style(&rule.title).bold(),
                style(format!("[{}]", rule.category)).dim()
            ));
            out.push_str(&format!("   {}       {}\n", style("│").dim(), rule.description));
        }

        if !result.rule_faults.is_empty() {
            out.push_str(&format!(
                "   {} rules skipped after faults: {}\n",
                style("!").red(),
                result.rule_faults.join(", ")
            ));
        }
        out
    }
}

impl Default for TextReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn tier_badge(tier: RiskTier) -> StyledObject<String> {
    let label = format!("[{:^8}]", tier.to_string().to_uppercase());
    match tier {
        RiskTier::Low => style(label).green().bold(),
        RiskTier::Medium => style(label).yellow().bold(),
        RiskTier::High => style(label).red().bold(),
        RiskTier::Critical => style(label).white().on_red().bold(),
    }
}

/// Shorten long URLs around the middle so host and tail stay visible
fn truncate_middle(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        return s.to_string();
    }
    let half = max_len / 2;
    let start: String = s.chars().take(half).collect();
    let end: String = s.chars().skip(len - half).collect();
    format!("{}…{}", start, end)
}

/// Serialize all results as one pretty JSON array, to `path` or stdout.
pub fn write_json(results: &[ScanResult], path: Option<&Path>) -> LinkwardResult<()> {
    let json = serde_json::to_string_pretty(results)?;
    match path {
        Some(path) => {
            std::fs::write(path, json).map_err(|e| LinkwardError::io(e, Some(path.to_path_buf())))?;
            log::info!("JSON report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RuleCategory, TriggeredRule};

    fn sample() -> ScanResult {
        ScanResult {
            input_url: "http://192.168.1.10/login".to_string(),
            final_url: "http://192.168.1.10/login".to_string(),
            redirect_chain: vec!["http://192.168.1.10/login".to_string()],
            status_code: None,
            raw_score: 85,
            score: 85,
            tier: RiskTier::Critical,
            summary: RiskTier::Critical.summary().to_string(),
            triggered_rules: vec![TriggeredRule {
                id: "direct_ip_host".to_string(),
                title: "Direct IP address".to_string(),
                description: "Host is a raw IPv4 literal".to_string(),
                weight: 30,
                category: RuleCategory::Structural,
            }],
            detected_warnings: 1,
            content_status: "Page could not be retrieved: timed out.".to_string(),
            trusted: false,
            analysis_incomplete: false,
            scripts_fetched: 0,
            decoded_payloads: 0,
            content_sha256: None,
            rule_faults: Vec::new(),
            rule_set_version: "2024.10".to_string(),
            scanned_at: "2024-10-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_render_lists_rules() {
        let text = TextReporter::new().render(&sample());
        assert!(text.contains("CRITICAL"));
        assert!(text.contains("Direct IP address"));
        assert!(text.contains("+30"));
        assert!(text.contains("timed out"));
    }

    #[test]
    fn test_truncate_middle() {
        let long = format!("https://example.com/{}", "a".repeat(200));
        let short = truncate_middle(&long, 40);
        assert_eq!(short.chars().count(), 41);
        assert!(short.starts_with("https://example.com/"));
        assert_eq!(truncate_middle("short", 40), "short");
    }

    #[test]
    fn test_write_json_file_uses_wire_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json(&[sample()], Some(&path)).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["link_input"], "http://192.168.1.10/login");
        assert_eq!(value[0]["risk_score"], "Critical");
        assert_eq!(value[0]["suspicious_points"], 85);
        assert_eq!(value[0]["violated_rules"][0]["points_added"], 30);
    }
}
