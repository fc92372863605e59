//! Payload Normalizer
//!
//! Builds the inspectable text: the main document, every fetched script and
//! any quoted Base64 literal whose decoded form looks like code or a URL.
//! Decoding is a single pass; decoded output is never scanned again.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Shortest literal considered a Base64 candidate
pub const MIN_BASE64_LEN: usize = 20;

/// Decoded payloads appended per scan
pub const MAX_DECODED_PAYLOADS: usize = 64;

/// Decode attempts per scan, whatever their outcome
pub const MAX_DECODE_ATTEMPTS: usize = 4096;

/// Padding is optional; obfuscators routinely strip it
const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

static BASE64_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']([A-Za-z0-9+/_-]{20,}={0,2})["']"#).expect("base64 literal regex")
});

/// Decoded text must contain one of these to be kept
const INTENT_MARKERS: &[&str] = &[
    "http://",
    "https://",
    "eval(",
    "document.",
    "window.",
    "fetch(",
    "xmlhttprequest",
    "<script",
    "atob(",
    "location",
    "<form",
    "<iframe",
];

#[derive(Debug, Clone, Default)]
pub struct InspectableText {
    pub text: String,
    /// Decoded Base64 payloads that were appended
    pub decoded_payloads: usize,
    /// Decode attempts made (bounded by `MAX_DECODE_ATTEMPTS`)
    pub candidates_examined: usize,
}

impl InspectableText {
    pub fn sha256(&self) -> String {
        hex::encode(Sha256::digest(self.text.as_bytes()))
    }
}

#[derive(Debug, Clone)]
pub struct PayloadNormalizer {
    min_len: usize,
    max_payloads: usize,
    max_attempts: usize,
}

impl PayloadNormalizer {
    pub fn new() -> Self {
        Self {
            min_len: MIN_BASE64_LEN,
            max_payloads: MAX_DECODED_PAYLOADS,
            max_attempts: MAX_DECODE_ATTEMPTS,
        }
    }

    pub fn normalize<S: AsRef<str>>(&self, main_body: &str, script_bodies: &[S]) -> InspectableText {
        let mut text = String::with_capacity(
            main_body.len() + script_bodies.iter().map(|s| s.as_ref().len() + 1).sum::<usize>(),
        );
        text.push_str(main_body);
        for script in script_bodies {
            text.push('\n');
            text.push_str(script.as_ref());
        }

        let mut decoded = Vec::new();
        let mut examined = 0usize;
        for cap in BASE64_LITERAL.captures_iter(&text) {
            if decoded.len() >= self.max_payloads {
                log::debug!("Decoded payload limit ({}) reached", self.max_payloads);
                break;
            }
            if examined >= self.max_attempts {
                log::debug!("Base64 decode attempt limit ({}) reached", self.max_attempts);
                break;
            }
            let Some(candidate) = cap.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if candidate.len() < self.min_len {
                continue;
            }
            examined += 1;

            if let Some(payload) = decode_candidate(candidate) {
                if has_intent_marker(&payload) && !decoded.contains(&payload) {
                    log::debug!("Unwrapped {} byte Base64 payload", payload.len());
                    decoded.push(payload);
                }
            }
        }

        let decoded_payloads = decoded.len();
        for payload in decoded {
            text.push('\n');
            text.push_str(&payload);
        }

        InspectableText {
            text,
            decoded_payloads,
            candidates_examined: examined,
        }
    }
}

impl Default for PayloadNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode with the standard alphabet, falling back to URL-safe. Text only.
fn decode_candidate(candidate: &str) -> Option<String> {
    let bytes = STANDARD_LENIENT
        .decode(candidate)
        .or_else(|_| URL_SAFE_LENIENT.decode(candidate))
        .ok()?;
    String::from_utf8(bytes).ok()
}

fn has_intent_marker(decoded: &str) -> bool {
    let lower = decoded.to_ascii_lowercase();
    INTENT_MARKERS.iter().any(|m| lower.contains(m))
}
