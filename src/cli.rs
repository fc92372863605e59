use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "linkward",
    about = "linkward - URL risk assessment from lexical, transport and content signals",
    version
)]

pub struct Args {
    /// URLs to assess (missing schemes default to https://)
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Write the JSON report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Timeout for the primary document fetch, in seconds
    #[arg(long, default_value = "8")]
    pub timeout: u64,

    /// Timeout for each external script fetch, in seconds
    #[arg(long, default_value = "3")]
    pub script_timeout: u64,

    /// Overall time budget for one scan, in seconds
    #[arg(long, default_value = "20")]
    pub deadline: u64,

    /// Maximum number of redirects to follow
    #[arg(long, default_value = "10")]
    pub max_redirects: usize,

    /// Maximum number of external scripts fetched per page
    #[arg(long, default_value = "5")]
    pub max_scripts: usize,

    /// Maximum document size to inspect in KB
    #[arg(long, default_value = "2048")]
    pub max_body_kb: usize,

    /// Additional trusted domains (JSON `{"domains": [...]}` or one per line)
    #[arg(long)]
    pub allowlist: Option<PathBuf>,

    /// Known-malicious domains (same formats as --allowlist)
    #[arg(long)]
    pub threatlist: Option<PathBuf>,

    /// Do not load the built-in trusted domain list
    #[arg(long)]
    pub no_builtin_allowlist: bool,

    /// Number of URLs scanned in parallel (0 = auto-detect)
    #[arg(short, long, default_value = "0")]
    pub concurrency: usize,

    /// Enable verbose logging of all operations
    #[arg(short, long)]
    pub verbose: bool,

    /// Hide progress output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OutputFormat {
    /// Styled per-URL report
    Text,
    /// JSON array of scan results
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
