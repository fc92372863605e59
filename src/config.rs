//! Engine tuning knobs.

use crate::cli::Args;
use std::time::Duration;

/// Browser-like identification sent with every request
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Timeout for the primary document fetch (per hop)
    pub request_timeout: Duration,
    /// Timeout for each external script fetch
    pub script_timeout: Duration,
    /// Overall budget for one scan
    pub scan_deadline: Duration,
    pub max_redirects: usize,
    pub max_scripts: usize,
    /// Redirects a single script fetch may follow
    pub script_max_redirects: usize,
    pub max_body_bytes: usize,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(8),
            script_timeout: Duration::from_secs(3),
            scan_deadline: Duration::from_secs(20),
            max_redirects: 10,
            max_scripts: 5,
            script_max_redirects: 3,
            max_body_bytes: 2 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            request_timeout: Duration::from_secs(args.timeout.max(1)),
            script_timeout: Duration::from_secs(args.script_timeout.max(1)),
            scan_deadline: Duration::from_secs(args.deadline.max(1)),
            max_redirects: args.max_redirects,
            max_scripts: args.max_scripts,
            max_body_bytes: args.max_body_kb.saturating_mul(1024),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_args() {
        let args = Args::parse_from([
            "linkward",
            "--timeout",
            "0",
            "--max-scripts",
            "2",
            "--max-body-kb",
            "16",
            "example.com",
        ]);
        let config = EngineConfig::from_args(&args);
        assert_eq!(config.request_timeout, Duration::from_secs(1));
        assert_eq!(config.max_scripts, 2);
        assert_eq!(config.max_body_bytes, 16 * 1024);
        assert_eq!(config.script_max_redirects, 3);
    }
}
