//! HTTP provider tests against a local mock server.

use polyglot_abstraction::{ErrorKind, FailureReason, Provider};
use polyglot_providers::{
    DeepLProvider, FlashProvider, GoogleProvider, ProviderConfig, ProviderFactory, ProviderType,
};

#[tokio::test]
async fn test_deepl_translate_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v2/translate")
        .match_header("authorization", "DeepL-Auth-Key test-key")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"text":["hola"],"source_lang":"ES","target_lang":"EN-US"}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"translations":[{"detected_source_language":"ES","text":"hello"}]}"#)
        .create_async()
        .await;

    let provider = DeepLProvider::new("test-key").with_base_url(server.url());
    let result = provider.translate("hola", "es", "en").await.unwrap();

    assert_eq!(result.text, "hello");
    assert_eq!(result.provider, "deepl");
    assert!((result.confidence - 0.95).abs() < f64::EPSILON);
    assert!(result.cost > 0.0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_deepl_rate_limit_is_transient() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v2/translate")
        .with_status(429)
        .with_body(r#"{"message":"Too many requests"}"#)
        .create_async()
        .await;

    let provider = DeepLProvider::new("test-key").with_base_url(server.url());
    let err = provider.translate("hola", "es", "en").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Transient);
    assert_eq!(err.reason, FailureReason::RateLimited);
    assert_eq!(err.provider, "deepl");
}

#[tokio::test]
async fn test_deepl_auth_failure_is_permanent() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v2/translate")
        .with_status(403)
        .with_body(r#"{"message":"Wrong key"}"#)
        .create_async()
        .await;

    let provider = DeepLProvider::new("bad-key").with_base_url(server.url());
    let err = provider.translate("hola", "es", "en").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Permanent);
    assert_eq!(err.reason, FailureReason::Authentication);
}

#[tokio::test]
async fn test_google_translate_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/language/translate/v2")
        .match_header("x-goog-api-key", "g-key")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"q":"hola","source":"es","target":"en","format":"text"}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":{"translations":[{"translatedText":"hello"}]}}"#)
        .create_async()
        .await;

    let provider = GoogleProvider::new("g-key").with_base_url(server.url());
    let result = provider.translate("hola", "es", "en").await.unwrap();

    assert_eq!(result.text, "hello");
    assert_eq!(result.provider, "google");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_google_bad_language_pair_is_permanent() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/language/translate/v2")
        .with_status(400)
        .with_body(r#"{"error":{"code":400,"message":"Bad language pair: es|xx"}}"#)
        .create_async()
        .await;

    let provider = GoogleProvider::new("g-key").with_base_url(server.url());
    let err = provider.translate("hola", "es", "xx").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Permanent);
    assert_eq!(err.reason, FailureReason::UnsupportedLanguagePair);
}

#[tokio::test]
async fn test_google_server_error_is_transient() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/language/translate/v2")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let provider = GoogleProvider::new("g-key").with_base_url(server.url());
    let err = provider.translate("hola", "es", "en").await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.reason, FailureReason::ServiceUnavailable);
}

#[tokio::test]
async fn test_flash_translate_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
        .match_header("x-goog-api-key", "f-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"hello\n"}]}}]}"#,
        )
        .create_async()
        .await;

    let provider = FlashProvider::new("f-key").with_base_url(server.url());
    let result = provider.translate("hola", "es", "en").await.unwrap();

    assert_eq!(result.text, "hello");
    assert_eq!(result.provider, "flash");
    assert!((result.confidence - 0.85).abs() < f64::EPSILON);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_flash_undecodable_body_is_transient() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
        .with_status(200)
        .with_body("<html>proxy error</html>")
        .create_async()
        .await;

    let provider = FlashProvider::new("f-key").with_base_url(server.url());
    let err = provider.translate("hola", "es", "en").await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.reason, FailureReason::InvalidResponse);
}

#[tokio::test]
async fn test_flash_empty_candidates_is_invalid_response() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
        .with_status(200)
        .with_body(r#"{"candidates":[]}"#)
        .create_async()
        .await;

    let provider = FlashProvider::new("f-key").with_base_url(server.url());
    let err = provider.translate("hola", "es", "en").await.unwrap_err();

    assert_eq!(err.reason, FailureReason::InvalidResponse);
}

#[tokio::test]
async fn test_connection_refused_is_transient_network_error() {
    let provider = DeepLProvider::new("k").with_base_url("http://127.0.0.1:1");
    let err = provider.translate("hola", "es", "en").await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.reason, FailureReason::Network);
}

#[tokio::test]
async fn test_health_checks() {
    let mut server = mockito::Server::new_async().await;
    let _usage = server
        .mock("GET", "/v2/usage")
        .with_status(200)
        .with_body(r#"{"character_count":10,"character_limit":500000}"#)
        .create_async()
        .await;
    let _languages = server
        .mock("GET", "/language/translate/v2/languages")
        .with_status(500)
        .create_async()
        .await;

    let deepl = DeepLProvider::new("k").with_base_url(server.url());
    let google = GoogleProvider::new("k").with_base_url(server.url());
    let unreachable = FlashProvider::new("k").with_base_url("http://127.0.0.1:1");

    assert!(deepl.health_check().await);
    assert!(!google.health_check().await);
    assert!(!unreachable.health_check().await);
}

#[tokio::test]
async fn test_factory_builds_provider_against_base_url() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .with_status(200)
        .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]}}]}"#)
        .create_async()
        .await;

    let config = ProviderConfig::new("fast", ProviderType::Flash)
        .with_api_key("inline")
        .with_api_key_env("POLYGLOT_TEST_UNSET_FLASH_KEY")
        .with_base_url(server.url())
        .with_model("gemini-2.0-flash");
    let provider = ProviderFactory::create(&config).unwrap();
    let result = provider.translate("hola", "es", "en").await.unwrap();

    assert_eq!(result.provider, "fast");
    assert_eq!(result.text, "hi");
}
