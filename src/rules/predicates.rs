//! Non-regex rule checks and the URL helpers they share.

use super::{RuleContext, RuleFault};
use regex::Regex;
use std::sync::LazyLock;
use url::{Host, Position};

/// Second-level labels that form a public suffix together with the TLD
const MULTI_PART_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "co.jp", "ne.jp", "or.jp",
    "com.au", "net.au", "org.au", "com.br", "com.cn", "com.mx", "com.tr",
    "co.in", "co.kr", "co.nz", "co.za", "com.sg", "com.ar", "com.sa", "com.eg",
];

const SUSPICIOUS_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "club", "online", "site",
    "work", "click", "link", "loan", "zip", "mov", "buzz", "rest", "fit",
    "country", "kim", "men", "icu", "cyou", "sbs", "cfd", "live", "shop",
];

const EXECUTABLE_EXTENSIONS: &[&str] = &[
    "exe", "scr", "msi", "bat", "cmd", "ps1", "vbs", "jar", "apk", "dmg",
    "zip", "rar", "7z", "iso",
];

const UNSAFE_SCHEMES: &[&str] = &["javascript", "data", "vbscript", "file"];

const REDIRECT_PARAMS: &[&str] = &[
    "redir", "redirect", "redirect_uri", "redirect_url", "url", "forward",
    "next", "return", "returnurl", "return_to", "goto", "dest", "destination",
];

const SENSITIVE_KEYWORDS: &[&str] = &[
    "secure", "verify", "login", "signin", "account", "update", "banking", "password",
];

/// Impersonation target: brand token and the domains it legitimately owns
struct Brand {
    token: &'static str,
    domains: &'static [&'static str],
}

const BRANDS: &[Brand] = &[
    Brand { token: "paypal", domains: &["paypal.com", "paypal.me", "paypalobjects.com"] },
    Brand { token: "apple", domains: &["apple.com", "icloud.com"] },
    Brand { token: "icloud", domains: &["icloud.com", "apple.com"] },
    Brand { token: "microsoft", domains: &["microsoft.com", "microsoftonline.com", "live.com"] },
    Brand { token: "office365", domains: &["office.com", "microsoft.com"] },
    Brand { token: "outlook", domains: &["outlook.com", "live.com", "office.com"] },
    Brand { token: "google", domains: &["google.com", "googleusercontent.com", "googleapis.com"] },
    Brand { token: "gmail", domains: &["gmail.com", "google.com"] },
    Brand { token: "amazon", domains: &["amazon.com", "amazon.co.uk", "amazon.de", "amazonaws.com"] },
    Brand { token: "facebook", domains: &["facebook.com", "fb.com"] },
    Brand { token: "instagram", domains: &["instagram.com"] },
    Brand { token: "whatsapp", domains: &["whatsapp.com", "whatsapp.net"] },
    Brand { token: "netflix", domains: &["netflix.com"] },
    Brand { token: "linkedin", domains: &["linkedin.com"] },
    Brand { token: "dropbox", domains: &["dropbox.com"] },
    Brand { token: "binance", domains: &["binance.com"] },
    Brand { token: "coinbase", domains: &["coinbase.com"] },
    Brand { token: "steam", domains: &["steampowered.com", "steamcommunity.com"] },
    Brand { token: "chase", domains: &["chase.com"] },
    Brand { token: "wellsfargo", domains: &["wellsfargo.com"] },
    Brand { token: "dhl", domains: &["dhl.com", "dhl.de"] },
    Brand { token: "fedex", domains: &["fedex.com"] },
    Brand { token: "ebay", domains: &["ebay.com", "ebay.co.uk"] },
];

static EXFIL_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(navigator\.sendBeacon|\$\.post|axios\.post|fetch)\s*\(\s*["'`](https?://[^"'`\s]+)"#)
        .expect("exfiltration call regex")
});

static XHR_POST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\.open\s*\(\s*["']post["']\s*,\s*["'`](https?://[^"'`\s]+)"#)
        .expect("xhr post regex")
});

static FETCH_POST_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)method\s*:\s*["']post["']"#).expect("fetch method regex")
});

static COOKIE_BEACON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:new\s+Image\s*\(\s*\)|\.src\s*=)[^;\n]{0,120}document\.cookie"#)
        .expect("cookie beacon regex")
});

/// Registrable domain of a host ("a.b.example.co.uk" -> "example.co.uk")
pub fn registrable_domain(host: &str) -> &str {
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return host;
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let keep = if MULTI_PART_SUFFIXES.contains(&last_two.as_str()) { 3 } else { 2 };
    if labels.len() <= keep {
        return host;
    }

    let skip: usize = labels[..labels.len() - keep].iter().map(|l| l.len() + 1).sum();
    &host[skip..]
}

/// True when `host` is `domain` or one of its subdomains
pub fn is_same_or_subdomain(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

pub fn tld(host: &str) -> Option<&str> {
    host.rsplit('.').next().filter(|t| !t.is_empty())
}

fn is_named_host(ctx: &RuleContext<'_>) -> bool {
    matches!(ctx.url.host(), Some(Host::Domain(_)))
}

pub(crate) fn has_userinfo(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    Ok(!ctx.url.username().is_empty() || ctx.url.password().is_some())
}

pub(crate) fn is_ipv4_host(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    Ok(matches!(ctx.url.host(), Some(Host::Ipv4(_))))
}

pub(crate) fn is_unsafe_scheme(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    Ok(UNSAFE_SCHEMES.contains(&ctx.url.scheme()))
}

pub(crate) fn has_deep_subdomains(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    let Some(host) = ctx.require_host()? else {
        return Ok(false);
    };
    if !is_named_host(ctx) {
        return Ok(false);
    }

    let total = host.split('.').count();
    let registrable = registrable_domain(host).split('.').count();
    Ok(total.saturating_sub(registrable) > 3)
}

pub(crate) fn has_repeated_protocol(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    let tail = ctx.url[Position::BeforePath..].to_ascii_lowercase();
    if ["http://", "https://", "http%3a%2f%2f", "https%3a%2f%2f"]
        .iter()
        .any(|token| tail.contains(token))
    {
        return Ok(true);
    }

    // a host-looking path segment, as in /www.bank.example/login
    Ok(ctx.url.path_segments().is_some_and(|mut segments| {
        segments.any(|segment| {
            segment.len() > 4 && segment.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("www."))
        })
    }))
}

pub(crate) fn has_punycode_label(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    Ok(ctx
        .host
        .as_deref()
        .is_some_and(|h| h.split('.').any(|label| label.starts_with("xn--"))))
}

pub(crate) fn has_nonstandard_port(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    Ok(ctx.url.port().is_some_and(|p| p != 80 && p != 443))
}

pub(crate) fn has_excessive_query(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    Ok(ctx.url.query_pairs().count() > 6)
}

pub(crate) fn has_path_traversal(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    let tail = ctx.url[Position::BeforePath..].to_ascii_lowercase();
    Ok(["../", "..\\", "%2e%2e", "..%2f", "..%5c", "%252e%252e"]
        .iter()
        .any(|token| tail.contains(token)))
}

pub(crate) fn impersonates_brand(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    let Some(host) = ctx.require_host()? else {
        return Ok(false);
    };
    if !is_named_host(ctx) {
        return Ok(false);
    }

    let parts: Vec<&str> = host.split(['.', '-']).collect();
    // brand's own label on a regional TLD, e.g. google.de or amazon.co.uk
    let root_label = registrable_domain(host).split('.').next().unwrap_or_default();
    let regional = !tld(host).is_some_and(|t| SUSPICIOUS_TLDS.contains(&t));
    Ok(BRANDS.iter().any(|brand| {
        parts.contains(&brand.token)
            && !(regional && root_label == brand.token)
            && !brand.domains.iter().any(|d| is_same_or_subdomain(host, d))
    }))
}

pub(crate) fn has_suspicious_tld(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    if !is_named_host(ctx) {
        return Ok(false);
    }
    Ok(ctx
        .host
        .as_deref()
        .and_then(tld)
        .is_some_and(|t| SUSPICIOUS_TLDS.contains(&t)))
}

pub(crate) fn is_numeric_heavy(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    let Some(host) = ctx.require_host()? else {
        return Ok(false);
    };
    if !is_named_host(ctx) {
        return Ok(false);
    }

    let root = registrable_domain(host).split('.').next().unwrap_or_default();
    let digits = root.chars().filter(|c| c.is_ascii_digit()).count();
    Ok(digits >= 4 && digits * 2 >= root.len())
}

pub(crate) fn is_plain_http(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    Ok(ctx.url.scheme() == "http")
}

pub(crate) fn sensitive_keyword_over_http(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    if ctx.url.scheme() != "http" {
        return Ok(false);
    }
    let lower = ctx.url.as_str().to_ascii_lowercase();
    Ok(SENSITIVE_KEYWORDS.iter().any(|kw| lower.contains(kw)))
}

pub(crate) fn is_executable_download(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    let path = ctx.url.path().to_ascii_lowercase();
    let Some((_, ext)) = path.rsplit_once('.') else {
        return Ok(false);
    };
    Ok(!ext.contains('/') && EXECUTABLE_EXTENSIONS.contains(&ext))
}

pub(crate) fn has_redirect_parameter(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    Ok(ctx
        .url
        .query_pairs()
        .any(|(key, _)| REDIRECT_PARAMS.contains(&key.to_ascii_lowercase().as_str())))
}

pub(crate) fn posts_to_third_party(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    if ctx.content.is_empty() {
        return Ok(false);
    }
    if COOKIE_BEACON.is_match(ctx.content) {
        return Ok(true);
    }

    let page_domain = ctx.host.as_deref().map(registrable_domain);
    let is_third_party = |target: &str| -> bool {
        let Ok(parsed) = url::Url::parse(target) else {
            return false;
        };
        match (parsed.host_str(), page_domain) {
            (Some(h), Some(page)) => registrable_domain(&h.to_ascii_lowercase()) != page,
            (Some(_), None) => true,
            _ => false,
        }
    };

    for cap in EXFIL_CALL.captures_iter(ctx.content) {
        let (Some(call), Some(target)) = (cap.get(1), cap.get(2)) else {
            continue;
        };
        let is_post = if call.as_str().eq_ignore_ascii_case("fetch") {
            let window_end = (target.end() + 200).min(ctx.content.len());
            let window = ctx.content.get(target.end()..window_end).unwrap_or_default();
            FETCH_POST_METHOD.is_match(window)
        } else {
            true
        };
        if is_post && is_third_party(target.as_str()) {
            return Ok(true);
        }
    }

    Ok(XHR_POST
        .captures_iter(ctx.content)
        .filter_map(|cap| cap.get(1))
        .any(|target| is_third_party(target.as_str())))
}

pub(crate) fn is_short_ok_body(ctx: &RuleContext<'_>) -> Result<bool, RuleFault> {
    Ok(ctx.status_code == Some(200) && ctx.body_len.is_some_and(|len| len < 500))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registrable_domain() {
        assert_eq!(registrable_domain("example.com"), "example.com");
        assert_eq!(registrable_domain("a.b.example.com"), "example.com");
        assert_eq!(registrable_domain("shop.example.co.uk"), "example.co.uk");
        assert_eq!(registrable_domain("localhost"), "localhost");
    }

    #[test]
    fn test_subdomain_matching_respects_label_boundary() {
        assert!(is_same_or_subdomain("google.com", "google.com"));
        assert!(is_same_or_subdomain("mail.google.com", "google.com"));
        assert!(!is_same_or_subdomain("evilgoogle.com", "google.com"));
        assert!(!is_same_or_subdomain("google.com.evil.example", "google.com"));
    }

    #[test]
    fn test_tld() {
        assert_eq!(tld("example.tk"), Some("tk"));
        assert_eq!(tld("example."), None);
    }
}
