//! Trust Override and domain lists.
//!
//! The engine only ever reads domain lists. Who owns them, where they come
//! from and how often they are refreshed is up to the caller: a static set
//! built at startup, or a [`SharedDomainSet`] whose snapshot some other task
//! swaps out. An empty or stale snapshot is valid.

use crate::errors::{LinkwardError, LinkwardResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, RwLock};

const BUILTIN_TRUSTED_JSON: &str = include_str!("../data/trusted-domains.json");

/// Allow-list lookup
pub trait TrustProvider: Send + Sync {
    fn is_trusted(&self, domain: &str) -> bool;
}

/// Known-threat lookup
pub trait ThreatProvider: Send + Sync {
    fn is_known_threat(&self, domain: &str) -> bool;
}

#[derive(Debug, Deserialize)]
struct DomainFile {
    domains: Vec<String>,
}

/// Immutable set of domains; a host matches an entry or any of its subdomains.
#[derive(Debug, Clone, Default)]
pub struct DomainSet {
    domains: HashSet<String>,
}

impl DomainSet {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .filter_map(|d| normalize_domain(d.as_ref()))
                .collect(),
        }
    }

    /// The built-in list of well-known platforms
    pub fn builtin_trusted() -> Self {
        match Self::parse(BUILTIN_TRUSTED_JSON) {
            Ok(set) => set,
            Err(e) => {
                log::warn!("Built-in trusted domain list is unreadable: {}", e);
                Self::default()
            }
        }
    }

    /// Parse either `{"domains": [...]}` JSON or one domain per line
    /// (`#` starts a comment).
    pub fn parse(text: &str) -> LinkwardResult<Self> {
        if text.trim_start().starts_with('{') {
            let file: DomainFile = serde_json::from_str(text)?;
            return Ok(Self::new(file.domains));
        }

        Ok(Self::new(
            text.lines()
                .map(|line| line.split('#').next().unwrap_or_default().trim())
                .filter(|line| !line.is_empty()),
        ))
    }

    pub fn load(path: &Path) -> LinkwardResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LinkwardError::io(e, Some(path.to_path_buf())))?;
        let set = Self::parse(&text)?;
        log::info!("Loaded {} domains from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn extend(&mut self, other: DomainSet) {
        self.domains.extend(other.domains);
    }

    /// True when `host` equals an entry or is a subdomain of one
    pub fn matches(&self, host: &str) -> bool {
        let Some(host) = normalize_domain(host) else {
            return false;
        };
        if self.domains.contains(&host) {
            return true;
        }

        // Walk parent domains: a.b.example.com -> b.example.com -> example.com
        let mut rest = host.as_str();
        while let Some((_, parent)) = rest.split_once('.') {
            if self.domains.contains(parent) {
                return true;
            }
            rest = parent;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

fn normalize_domain(raw: &str) -> Option<String> {
    let d = raw.trim().trim_end_matches('.').trim_start_matches("*.");
    if d.is_empty() {
        None
    } else {
        Some(d.to_ascii_lowercase())
    }
}

impl TrustProvider for DomainSet {
    fn is_trusted(&self, domain: &str) -> bool {
        self.matches(domain)
    }
}

impl ThreatProvider for DomainSet {
    fn is_known_threat(&self, domain: &str) -> bool {
        self.matches(domain)
    }
}

/// Refreshable snapshot of a [`DomainSet`], owned by some external feed.
#[derive(Debug, Clone, Default)]
pub struct SharedDomainSet {
    inner: Arc<RwLock<Arc<DomainSet>>>,
}

impl SharedDomainSet {
    pub fn new(initial: DomainSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Current snapshot; readers never hold the lock while matching
    pub fn snapshot(&self) -> Arc<DomainSet> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Swap in a new snapshot
    pub fn replace(&self, next: DomainSet) {
        let next = Arc::new(next);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

impl TrustProvider for SharedDomainSet {
    fn is_trusted(&self, domain: &str) -> bool {
        self.snapshot().matches(domain)
    }
}

impl ThreatProvider for SharedDomainSet {
    fn is_known_threat(&self, domain: &str) -> bool {
        self.snapshot().matches(domain)
    }
}

/// Trust state of a single scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    Unchecked,
    /// Final domain is allow-listed; carries the matched host
    Trusted(String),
    Evaluated,
}

impl TrustDecision {
    /// Resolve `Unchecked` against the provider. Terminal states stay put.
    pub fn resolve(self, host: Option<&str>, provider: &dyn TrustProvider) -> Self {
        match self {
            TrustDecision::Unchecked => match host {
                Some(h) if provider.is_trusted(h) => TrustDecision::Trusted(h.to_string()),
                _ => TrustDecision::Evaluated,
            },
            terminal => terminal,
        }
    }

    pub fn is_trusted(&self) -> bool {
        matches!(self, TrustDecision::Trusted(_))
    }
}
