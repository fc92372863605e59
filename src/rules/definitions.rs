//! Rule Definitions
//!
//! The built-in rule and weight table. Order here is evaluation order and
//! therefore report order.

use super::predicates as p;
use super::{Check, RuleDefinition};
use crate::models::RuleCategory;

/// Get all rule definitions, in evaluation order
pub(crate) fn get_rule_definitions() -> Vec<RuleDefinition> {
    vec![
        // Structural / obfuscation
        RuleDefinition {
            id: "userinfo_in_authority",
            title: "Credentials embedded in URL",
            description: "The URL carries a user@ prefix before the host, a classic trick to make the real destination look like a trusted site.",
            category: RuleCategory::Structural,
            weight: 30,
            check: Check::Predicate(p::has_userinfo),
        },
        RuleDefinition {
            id: "direct_ip_host",
            title: "Direct IP address",
            description: "The host is a raw IPv4 address instead of a domain name; legitimate public sites rarely do this.",
            category: RuleCategory::Structural,
            weight: 30,
            check: Check::Predicate(p::is_ipv4_host),
        },
        RuleDefinition {
            id: "unsafe_scheme",
            title: "Unsafe URI scheme",
            description: "The link uses a scheme such as javascript: or data: that executes or embeds content directly instead of navigating to a site.",
            category: RuleCategory::Structural,
            weight: 40,
            check: Check::Predicate(p::is_unsafe_scheme),
        },
        RuleDefinition {
            id: "deep_subdomains",
            title: "Excessive subdomain depth",
            description: "The host has an unusually long chain of subdomains, often used to push a fake brand name to the front.",
            category: RuleCategory::Structural,
            weight: 10,
            check: Check::Predicate(p::has_deep_subdomains),
        },
        RuleDefinition {
            id: "repeated_protocol_token",
            title: "Embedded second URL",
            description: "The path or query contains another protocol token, suggesting a wrapped or chained redirect target.",
            category: RuleCategory::Structural,
            weight: 20,
            check: Check::Predicate(p::has_repeated_protocol),
        },
        RuleDefinition {
            id: "punycode_host",
            title: "Punycode / IDN host",
            description: "The host contains internationalized labels (xn--) that can render as look-alike characters of a known brand.",
            category: RuleCategory::Structural,
            weight: 25,
            check: Check::Predicate(p::has_punycode_label),
        },
        RuleDefinition {
            id: "nonstandard_port",
            title: "Non-standard port",
            description: "The URL targets an explicit port other than 80 or 443.",
            category: RuleCategory::Structural,
            weight: 10,
            check: Check::Predicate(p::has_nonstandard_port),
        },
        RuleDefinition {
            id: "excessive_query_params",
            title: "Excessive query parameters",
            description: "The query string carries an unusually large number of parameters, common in tracking and cloaking links.",
            category: RuleCategory::Structural,
            weight: 5,
            check: Check::Predicate(p::has_excessive_query),
        },
        RuleDefinition {
            id: "path_traversal",
            title: "Directory traversal sequence",
            description: "The path or query contains ../ style sequences used to escape a web root.",
            category: RuleCategory::Structural,
            weight: 20,
            check: Check::Predicate(p::has_path_traversal),
        },

        // Domain / typosquatting
        RuleDefinition {
            id: "brand_impersonation",
            title: "Brand impersonation",
            description: "A well-known brand name appears in the host, but the host does not belong to that brand's domains.",
            category: RuleCategory::Domain,
            weight: 35,
            check: Check::Predicate(p::impersonates_brand),
        },
        RuleDefinition {
            id: "suspicious_tld",
            title: "Frequently abused TLD",
            description: "The domain is registered under a top-level domain that is cheap or free and heavily used for abuse.",
            category: RuleCategory::Domain,
            weight: 15,
            check: Check::Predicate(p::has_suspicious_tld),
        },
        RuleDefinition {
            id: "numeric_heavy_domain",
            title: "Numeric domain name",
            description: "The domain name consists mostly of digits, typical of throwaway registrations.",
            category: RuleCategory::Domain,
            weight: 10,
            check: Check::Predicate(p::is_numeric_heavy),
        },

        // Transport
        RuleDefinition {
            id: "unencrypted_connection",
            title: "Unencrypted connection",
            description: "The final page is served over plain HTTP, so anything entered can be read or altered in transit.",
            category: RuleCategory::Transport,
            weight: 15,
            check: Check::Predicate(p::is_plain_http),
        },
        RuleDefinition {
            id: "insecure_sensitive_keyword",
            title: "Sensitive keyword without encryption",
            description: "The URL advertises login, verification or account actions while using an unencrypted scheme.",
            category: RuleCategory::Transport,
            weight: 20,
            check: Check::Predicate(p::sensitive_keyword_over_http),
        },

        // Path / file
        RuleDefinition {
            id: "executable_download",
            title: "Executable or archive download",
            description: "The URL points directly at an executable, installer or archive file.",
            category: RuleCategory::Path,
            weight: 25,
            check: Check::Predicate(p::is_executable_download),
        },
        RuleDefinition {
            id: "sensitive_path",
            title: "Administrative or sensitive path",
            description: "The path references administrative panels, backups or configuration files.",
            category: RuleCategory::Path,
            weight: 10,
            check: Check::UrlPattern(r"(?i)^[a-z][a-z0-9+.-]*://[^/?#]*[^?#]*/(?:admin|administrator|backup|backups|config|wp-admin|phpmyadmin|\.env|\.git)(?:[/._-]|[?#]|$)"),
        },
        RuleDefinition {
            id: "redirect_parameter",
            title: "Open redirect parameter",
            description: "The query string contains a parameter such as url= or redirect= that may forward visitors elsewhere.",
            category: RuleCategory::Path,
            weight: 10,
            check: Check::Predicate(p::has_redirect_parameter),
        },

        // Content
        RuleDefinition {
            id: "credential_harvesting",
            title: "Credential input form",
            description: "The page asks for a password or payment card details.",
            category: RuleCategory::Content,
            weight: 40,
            check: Check::ContentPattern(r#"(?i)<input\b[^>]*\btype\s*=\s*["']?password|\b(?:name|id|autocomplete)\s*=\s*["']?(?:cc-?number|cc-csc|card-?number|credit-?card|cardnum|cvv2?|cvc|security-?code)\b"#),
        },
        RuleDefinition {
            id: "device_permission_request",
            title: "Device permission request",
            description: "Scripts request camera, microphone, location or notification access.",
            category: RuleCategory::Content,
            weight: 15,
            check: Check::ContentPattern(r"(?i)getUserMedia|navigator\.mediaDevices|geolocation\.(?:getCurrentPosition|watchPosition)|Notification\.requestPermission"),
        },
        RuleDefinition {
            id: "hidden_iframe",
            title: "Hidden iframe",
            description: "The page embeds an invisible iframe, a common drive-by and clickjacking technique.",
            category: RuleCategory::Content,
            weight: 10,
            check: Check::ContentPattern(r#"(?i)<iframe\b[^>]*(?:\bwidth\s*=\s*["']?0["'\s>]|\bheight\s*=\s*["']?0["'\s>]|display\s*:\s*none|visibility\s*:\s*hidden)"#),
        },

        // Behavioral
        RuleDefinition {
            id: "forced_redirect",
            title: "Client-side forced redirect",
            description: "The page moves the visitor elsewhere on its own through a script or meta refresh.",
            category: RuleCategory::Behavioral,
            weight: 15,
            check: Check::ContentPattern(r#"(?i)\blocation(?:\.href)?\s*=\s*["'`]|\blocation\.(?:replace|assign)\s*\(|<meta\b[^>]*http-equiv\s*=\s*["']?refresh"#),
        },
        RuleDefinition {
            id: "data_exfiltration",
            title: "Data sent to third party",
            description: "Scripts post data or cookies to an endpoint outside the page's own domain.",
            category: RuleCategory::Behavioral,
            weight: 25,
            check: Check::Predicate(p::posts_to_third_party),
        },
        RuleDefinition {
            id: "obfuscated_script",
            title: "Obfuscated script",
            description: "Scripts decode and execute hidden code at runtime.",
            category: RuleCategory::Behavioral,
            weight: 20,
            check: Check::ContentPattern(r"(?i)eval\s*\(\s*(?:atob|unescape|decodeURIComponent)\s*\(|document\.write\s*\(\s*unescape\s*\(|(?:String\.fromCharCode\s*\([^)]*\)\s*\+?\s*){3,}|(?:\\x[0-9a-f]{2}){24,}"),
        },
        RuleDefinition {
            id: "short_body",
            title: "Near-empty page",
            description: "The server answered 200 OK with an almost empty document, typical of placeholders and instant redirects.",
            category: RuleCategory::Behavioral,
            weight: 10,
            check: Check::Predicate(p::is_short_ok_body),
        },
    ]
}
