use linkward::trust::DomainSet;
use linkward::{EngineConfig, RiskEngine, RiskTier};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> EngineConfig {
    EngineConfig {
        request_timeout: Duration::from_secs(2),
        script_timeout: Duration::from_secs(1),
        scan_deadline: Duration::from_secs(10),
        ..EngineConfig::default()
    }
}

fn engine(config: EngineConfig) -> RiskEngine {
    RiskEngine::new(config).expect("http client")
}

fn page(extra: &str) -> String {
    format!(
        "<html><head><title>Store</title></head><body>{}{}</body></html>",
        "<p>Browse our catalogue of ordinary household goods.</p>".repeat(20),
        extra
    )
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn password_field_triggers_credential_harvesting() {
    let server = MockServer::start().await;
    serve(&server, "/with", page("<form><input type=\"password\" name=\"pw\"></form>")).await;
    serve(&server, "/without", page("<form><input type=\"text\" name=\"q\"></form>")).await;

    let engine = engine(config());
    let with = engine.scan(&format!("{}/with", server.uri())).await.unwrap();
    let without = engine.scan(&format!("{}/without", server.uri())).await.unwrap();

    assert!(with.has_rule("credential_harvesting"));
    assert!(!without.has_rule("credential_harvesting"));
    assert!(with.raw_score >= without.raw_score + 40);
}

#[tokio::test]
async fn plain_http_target_is_flagged_unencrypted() {
    let server = MockServer::start().await;
    serve(&server, "/", page("")).await;

    let result = engine(config()).scan(&server.uri()).await.unwrap();
    assert!(result.has_rule("unencrypted_connection"));
    assert!(result.has_rule("direct_ip_host"));
    assert_eq!(result.status_code, Some(200));
    assert!(result.content_sha256.is_some());
}

#[tokio::test]
async fn primary_timeout_is_acquisition_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(4)))
        .mount(&server)
        .await;

    let config = EngineConfig {
        request_timeout: Duration::from_secs(1),
        ..config()
    };
    let result = engine(config).scan(&server.uri()).await.unwrap();

    assert!(result.has_rule("acquisition_failed"));
    assert!(result.score > 0);
    assert!(result.content_status.contains("timed out"));
    assert!(!result.analysis_incomplete);
}

#[tokio::test]
async fn deadline_returns_partial_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(4)))
        .mount(&server)
        .await;

    let config = EngineConfig {
        request_timeout: Duration::from_secs(8),
        scan_deadline: Duration::from_secs(1),
        ..config()
    };
    let result = engine(config).scan(&server.uri()).await.unwrap();

    assert!(result.analysis_incomplete);
    assert!(!result.has_rule("acquisition_failed"));
    // URL rules still ran
    assert!(result.has_rule("direct_ip_host"));
    assert!(result.content_status.contains("deadline"));
}

#[tokio::test]
async fn redirect_chain_ends_at_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/landing"))
        .mount(&server)
        .await;
    serve(&server, "/landing", page("")).await;

    let input = format!("{}/go", server.uri());
    let result = engine(config()).scan(&input).await.unwrap();

    assert_eq!(result.redirect_chain.len(), 2);
    assert_eq!(result.redirect_chain.first(), Some(&input));
    assert_eq!(result.redirect_chain.last(), Some(&result.final_url));
    assert!(result.final_url.ends_with("/landing"));
}

#[tokio::test]
async fn script_fetching_stops_at_cap() {
    let server = MockServer::start().await;
    let tags: String = (0..8)
        .map(|i| format!("<script src=\"/js/{i}.js\"></script>"))
        .collect();
    serve(&server, "/", page(&tags)).await;
    for i in 0..8 {
        serve(&server, &format!("/js/{i}.js"), format!("console.log({i});")).await;
    }

    let config = EngineConfig {
        max_scripts: 3,
        ..config()
    };
    let result = engine(config).scan(&server.uri()).await.unwrap();
    assert_eq!(result.scripts_fetched, 3);

    let requests = server.received_requests().await.unwrap_or_default();
    let script_requests = requests
        .iter()
        .filter(|r| r.url.path().starts_with("/js/"))
        .count();
    assert_eq!(script_requests, 3);
}

#[tokio::test]
async fn allow_listed_final_domain_is_trusted() {
    let server = MockServer::start().await;
    serve(&server, "/", page("<input type=\"password\"><script src=\"/a.js\"></script>")).await;
    serve(&server, "/a.js", "eval(atob('x'))".to_string()).await;

    let engine = engine(config()).with_trust(Arc::new(DomainSet::new(["127.0.0.1"])));
    let result = engine.scan(&server.uri()).await.unwrap();

    assert!(result.trusted);
    assert_eq!(result.score, 0);
    assert_eq!(result.tier, RiskTier::Low);
    assert_eq!(result.triggered_rules.len(), 1);
    assert_eq!(result.triggered_rules[0].id, "trusted_authority");
    assert_eq!(result.scripts_fetched, 0);

    // no script fetch for trusted targets
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.iter().all(|r| r.url.path() != "/a.js"));
}

#[tokio::test]
async fn obfuscated_script_payload_is_unwrapped() {
    use base64::Engine as _;
    let hidden = base64::engine::general_purpose::STANDARD
        .encode("window.location.replace('https://collect.evil.example/')");

    let server = MockServer::start().await;
    serve(&server, "/", page("<script src=\"/loader.js\"></script>")).await;
    serve(&server, "/loader.js", format!("var cfg = \"{}\";", hidden)).await;

    let result = engine(config()).scan(&server.uri()).await.unwrap();
    assert_eq!(result.scripts_fetched, 1);
    assert_eq!(result.decoded_payloads, 1);
    assert!(result.has_rule("forced_redirect"));
}
