//! linkward URL risk engine
//!
//! Scores an arbitrary link by combining lexical checks on the URL, a
//! redirect-following fetch of the page and its scripts, and pattern-based
//! detection over the retrieved content.

pub mod acquirer;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod models;
pub mod normalizer;
pub mod reporter;
pub mod rules;
pub mod scoring;
pub mod trust;
pub mod ui;

pub use config::EngineConfig;
pub use engine::{prepare_target, RiskEngine};
pub use errors::{LinkwardError, LinkwardResult};
pub use models::{RiskTier, RuleCategory, ScanResult, TriggeredRule};
