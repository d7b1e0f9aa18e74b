
use cardscan::{
    CardScanner, EndpointConfig, EndpointRegistry, ExtractionRequest, ParseError, ServiceError,
    TransportError,
};
use std::sync::Arc;
use test_helpers::{MockEndpoint, HANG};

const CARD_JSON: &str =
    r#"{"name":"Ada Lovelace","company_name":"Acme Analytical","phone":"555-0100","email":"ada@acme.io"}"#;

fn fast_config(url: &str) -> EndpointConfig {
    EndpointConfig::new("mock", url)
        .with_timeout(5)
        .with_max_retries(3)
        .with_retry_backoff(0.01)
}

fn scanner_for(dir: &tempfile::TempDir) -> CardScanner {
    let registry = EndpointRegistry::load(dir.path().join("api_endpoints.json")).unwrap();
    CardScanner::new(Arc::new(registry))
}

fn request() -> ExtractionRequest {
    ExtractionRequest::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
}

// ── Retry behaviour ──

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let mock = MockEndpoint::start(vec![(503, ""), (503, ""), (200, CARD_JSON)]).await;
    let dir = tempfile::tempdir().unwrap();
    let scanner = scanner_for(&dir);

    let details = scanner
        .extract_with(&fast_config(&mock.url), &request())
        .await
        .unwrap();

    assert_eq!(mock.hits(), 3);
    assert_eq!(details.name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(details.company.as_deref(), Some("Acme Analytical"));
    assert_eq!(details.mobile.as_deref(), Some("555-0100"));
    assert!(details.processing_time.is_some());
}

#[tokio::test]
async fn non_retryable_status_fails_on_first_attempt() {
    let mock = MockEndpoint::start(vec![(400, "bad image")]).await;
    let dir = tempfile::tempdir().unwrap();
    let scanner = scanner_for(&dir);

    let err = scanner
        .extract_with(&fast_config(&mock.url), &request())
        .await
        .unwrap_err();

    assert_eq!(mock.hits(), 1);
    match err {
        ServiceError::Transport(TransportError::HttpStatus { status, body }) => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad image");
        }
        other => panic!("expected HTTP 400 transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn exhausted_retries_surface_final_status() {
    let mock = MockEndpoint::start(vec![(503, "busy")]).await;
    let dir = tempfile::tempdir().unwrap();
    let scanner = scanner_for(&dir);

    let config = fast_config(&mock.url).with_max_retries(2);
    let err = scanner.extract_with(&config, &request()).await.unwrap_err();

    // Initial attempt plus two retries.
    assert_eq!(mock.hits(), 3);
    assert!(matches!(
        err,
        ServiceError::Transport(TransportError::HttpStatus { status: 503, .. })
    ));
}

#[tokio::test]
async fn timeout_is_not_retried() {
    let mock = MockEndpoint::start(vec![(HANG, "")]).await;
    let dir = tempfile::tempdir().unwrap();
    let scanner = scanner_for(&dir);

    let config = fast_config(&mock.url).with_timeout(1);
    let err = scanner.extract_with(&config, &request()).await.unwrap_err();

    assert_eq!(mock.hits(), 1);
    assert!(matches!(
        err,
        ServiceError::Transport(TransportError::Timeout { seconds: 1, .. })
    ));
}

// ── Request shape ──

#[tokio::test]
async fn multipart_body_carries_image_and_query() {
    let mock = MockEndpoint::start(vec![(200, "{}")]).await;
    let dir = tempfile::tempdir().unwrap();
    let scanner = scanner_for(&dir);

    scanner
        .extract_with(&fast_config(&mock.url), &request())
        .await
        .unwrap();

    let body = mock.last_request();
    assert!(body.contains("name=\"image\""), "missing image part");
    assert!(body.contains("business_card.jpg"), "missing file name");
    assert!(body.contains("image/jpeg"), "missing content type");
    assert!(body.contains("name=\"query\""), "missing query part");
    assert!(body.contains("business cards"), "missing instruction text");
}

// ── Response handling ──

#[tokio::test]
async fn messy_reply_is_normalized_and_mapped() {
    // Quoted, escaped, ends in a period: the worst observed endpoint mood.
    let mock = MockEndpoint::start(vec![(
        200,
        "\"{\\\"name\\\":\\\"Ada\\\",\\\"company\\\":\\\"Acme\\\"}\".",
    )])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let scanner = scanner_for(&dir);

    let details = scanner
        .extract_with(&fast_config(&mock.url), &request())
        .await
        .unwrap();

    assert_eq!(details.name.as_deref(), Some("Ada"));
    assert_eq!(details.company.as_deref(), Some("Acme"));
}

#[tokio::test]
async fn unparsable_reply_is_a_malformed_response() {
    let mock = MockEndpoint::start(vec![(200, "sorry, I could not read the card")]).await;
    let dir = tempfile::tempdir().unwrap();
    let scanner = scanner_for(&dir);

    let err = scanner
        .extract_with(&fast_config(&mock.url), &request())
        .await
        .unwrap_err();

    assert_eq!(mock.hits(), 1);
    assert!(matches!(
        err,
        ServiceError::MalformedResponse(ParseError::Unparsable { .. })
    ));
}

#[tokio::test]
async fn empty_object_reply_is_a_valid_empty_result() {
    let mock = MockEndpoint::start(vec![(200, "{}")]).await;
    let dir = tempfile::tempdir().unwrap();
    let scanner = scanner_for(&dir);

    let details = scanner
        .extract_with(&fast_config(&mock.url), &request())
        .await
        .unwrap();

    // Nothing recognized is success, not failure.
    assert_eq!(details.name, None);
    assert_eq!(details.company, None);
    assert_eq!(details.email, None);
    assert!(details.processing_time.is_some());
}

// ── Registry-driven extraction ──

#[tokio::test]
async fn extract_uses_the_active_registry_entry() {
    let mock = MockEndpoint::start(vec![(200, CARD_JSON)]).await;
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(EndpointRegistry::load(dir.path().join("api_endpoints.json")).unwrap());
    registry.add(fast_config(&mock.url)).unwrap();
    registry.set_active("mock").unwrap();

    let scanner = CardScanner::new(registry);
    let details = scanner.extract(&request()).await.unwrap();

    assert_eq!(mock.hits(), 1);
    assert_eq!(details.email.as_deref(), Some("ada@acme.io"));
}

// ── Liveness ──

#[tokio::test]
async fn health_is_true_for_any_response_even_405() {
    let mock = MockEndpoint::start(vec![(405, "")]).await;
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(EndpointRegistry::load(dir.path().join("api_endpoints.json")).unwrap());
    registry.add(fast_config(&mock.url)).unwrap();
    registry.set_active("mock").unwrap();

    let scanner = CardScanner::new(registry);
    assert!(scanner.health().await);
}

#[tokio::test]
async fn health_is_false_for_a_dead_socket() {
    // Bind then drop to get an address nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(EndpointRegistry::load(dir.path().join("api_endpoints.json")).unwrap());
    registry
        .add(fast_config(&format!("http://{addr}")))
        .unwrap();
    registry.set_active("mock").unwrap();

    let scanner = CardScanner::new(registry);
    assert!(!scanner.health().await);
}
