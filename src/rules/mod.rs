//! Rule Registry
//!
//! Every detection rule is a row of data: a stable id, a category, a fixed
//! weight, a human-readable explanation and a check. Checks are either a
//! regex over the URL, a regex over the inspectable text, or a plain function
//! over the [`RuleContext`]. The table lives in `definitions`; the
//! non-regex checks live in `predicates`.
//!
//! The registry is compiled once and is read-only afterwards, so a single
//! `Arc<RuleRegistry>` can serve any number of concurrent scans.

mod definitions;
pub(crate) mod predicates;

use crate::errors::{LinkwardError, LinkwardResult};
use crate::models::{RuleCategory, TriggeredRule};
use regex::Regex;
use url::Url;

/// Version tag of the built-in rule and weight table
pub const RULE_SET_VERSION: &str = "2024.10";

/// Reason a check could not produce a verdict
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleFault {
    #[error("URL has no {0} component")]
    MissingComponent(&'static str),

    #[error("unparseable input: {0}")]
    Unparseable(String),
}

pub type CheckFn = fn(&RuleContext<'_>) -> Result<bool, RuleFault>;

/// How a rule decides whether it fires
#[derive(Clone, Copy)]
pub(crate) enum Check {
    /// Regex over the full URL string
    UrlPattern(&'static str),
    /// Regex over the inspectable text
    ContentPattern(&'static str),
    Predicate(CheckFn),
}

/// Uncompiled rule row
pub(crate) struct RuleDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: RuleCategory,
    pub weight: u32,
    pub check: Check,
}

enum CompiledCheck {
    Url(Regex),
    Content(Regex),
    Predicate(CheckFn),
}

/// Everything a rule may look at.
#[derive(Debug)]
pub struct RuleContext<'a> {
    /// Final resolved URL, or the input URL when acquisition never resolved
    pub url: &'a Url,
    /// Lowercased host, when the URL has one
    pub host: Option<String>,
    /// Main document plus scripts plus decoded payloads
    pub content: &'a str,
    pub status_code: Option<u16>,
    /// Length of the primary document body before normalization
    pub body_len: Option<usize>,
}

impl<'a> RuleContext<'a> {
    pub fn new(url: &'a Url, content: &'a str) -> Self {
        Self {
            url,
            host: url.host_str().map(|h| h.trim_end_matches('.').to_ascii_lowercase()),
            content,
            status_code: None,
            body_len: None,
        }
    }

    pub fn with_fetch(mut self, status_code: Option<u16>, body_len: Option<usize>) -> Self {
        self.status_code = status_code;
        self.body_len = body_len;
        self
    }

    /// Host of a hierarchical URL; a fault if an http(s) URL lacks one
    pub(crate) fn require_host(&self) -> Result<Option<&str>, RuleFault> {
        match (&self.host, self.url.scheme()) {
            (Some(h), _) => Ok(Some(h.as_str())),
            (None, "http" | "https") => Err(RuleFault::MissingComponent("host")),
            (None, _) => Ok(None),
        }
    }
}

/// A compiled, immutable rule
pub struct Rule {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: RuleCategory,
    pub weight: u32,
    check: CompiledCheck,
}

impl Rule {
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
        match &self.check {
            CompiledCheck::Url(re) => Ok(re.is_match(ctx.url.as_str())),
            CompiledCheck::Content(re) => Ok(re.is_match(ctx.content)),
            CompiledCheck::Predicate(f) => f(ctx),
        }
    }

    pub fn to_triggered(&self) -> TriggeredRule {
        TriggeredRule {
            id: self.id.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            weight: self.weight,
            category: self.category,
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Outcome of running the whole registry once
#[derive(Debug, Default)]
pub struct RuleEvaluation<'r> {
    /// Fired rules, in registry order
    pub triggered: Vec<&'r Rule>,
    /// Ids of rules whose check faulted
    pub faults: Vec<&'static str>,
}

/// Ordered set of compiled rules
pub struct RuleRegistry {
    rules: Vec<Rule>,
    version: &'static str,
}

impl RuleRegistry {
    /// Compile the built-in rule table
    pub fn builtin() -> Self {
        Self::from_definitions(definitions::get_rule_definitions())
    }

    pub(crate) fn from_definitions(defs: Vec<RuleDefinition>) -> Self {
        let mut rules: Vec<Rule> = Vec::with_capacity(defs.len());

        for def in defs {
            if rules.iter().any(|r| r.id == def.id) {
                log::warn!("Duplicate rule id '{}' ignored", def.id);
                continue;
            }

            let check = match def.check {
                Check::UrlPattern(p) => compile(p).map(CompiledCheck::Url),
                Check::ContentPattern(p) => compile(p).map(CompiledCheck::Content),
                Check::Predicate(f) => Ok(CompiledCheck::Predicate(f)),
            };

            match check {
                Ok(check) => rules.push(Rule {
                    id: def.id,
                    title: def.title,
                    description: def.description,
                    category: def.category,
                    weight: def.weight,
                    check,
                }),
                Err(e) => {
                    log::warn!("Failed to compile rule '{}': {}", def.id, e);
                }
            }
        }

        Self {
            rules,
            version: RULE_SET_VERSION,
        }
    }

    /// Run every rule in order. A faulting rule counts as not fired.
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> RuleEvaluation<'_> {
        let mut evaluation = RuleEvaluation::default();

        for rule in &self.rules {
            match rule.evaluate(ctx) {
                Ok(true) => {
                    log::debug!("Rule '{}' fired (+{})", rule.id, rule.weight);
                    evaluation.triggered.push(rule);
                }
                Ok(false) => {}
                Err(fault) => {
                    log::warn!("Rule '{}' failed closed on {}: {}", rule.id, ctx.url, fault);
                    evaluation.faults.push(rule.id);
                }
            }
        }

        evaluation
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn version(&self) -> &'static str {
        self.version
    }
}

fn compile(pattern: &str) -> LinkwardResult<Regex> {
    Regex::new(pattern).map_err(|e| LinkwardError::regex(e, pattern))
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
