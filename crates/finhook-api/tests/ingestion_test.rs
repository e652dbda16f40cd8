//! Integration tests for `POST /webhook/btg`.

use std::sync::Arc;

use axum::http::StatusCode;
use finhook_api::{
    error::{INVALID_PAYLOAD_MESSAGE, SUBMIT_FAILED_MESSAGE},
    handlers::webhook::ACCEPTED_MESSAGE,
};
use finhook_core::{MemoryRecordStore, WebhookType};
use finhook_testing::{EnvelopeBuilder, TestEnv, TEST_EPOCH_MS};
use serde_json::json;

#[tokio::test]
async fn account_envelope_is_stored_as_operations() {
    let env = TestEnv::new().expect("test env setup");

    let response = env
        .post_webhook(&json!({"response": {"accountNumber": "123", "fileSize": 10, "url": "http://x"}}))
        .await
        .expect("request");

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], ACCEPTED_MESSAGE);
    assert_eq!(response.body["webhookType"], "operations-by-account");
    assert_eq!(response.body["fileName"], format!("operations-by-account-123-{TEST_EPOCH_MS}.json"));
    assert_eq!(
        response.body["metadata"],
        json!({"accountNumber": "123", "fileSize": 10, "period": "N/A", "downloadUrl": "http://x"})
    );

    let files = env.files_in(WebhookType::OperationsByAccount).expect("list files");
    assert_eq!(files, vec![format!("operations-by-account-123-{TEST_EPOCH_MS}.json")]);
    assert!(env.files_in(WebhookType::PositionsByPartner).expect("list files").is_empty());
}

#[tokio::test]
async fn envelope_without_account_is_stored_as_positions() {
    let env = TestEnv::new().expect("test env setup");

    let response =
        env.post_webhook(&json!({"response": {"fileSize": 5, "url": "http://y"}})).await.expect("request");

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["webhookType"], "positions-by-partner");
    assert_eq!(response.body["metadata"]["accountNumber"], "N/A");
    assert_eq!(
        env.files_in(WebhookType::PositionsByPartner).expect("list files"),
        vec![format!("positions-by-partner-partner-{TEST_EPOCH_MS}.json")]
    );
}

#[tokio::test]
async fn empty_account_number_counts_as_absent() {
    let env = TestEnv::new().expect("test env setup");

    let response = env.post_webhook(&EnvelopeBuilder::positions().account("").build()).await.expect("request");

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["webhookType"], "positions-by-partner");
}

#[tokio::test]
async fn period_is_reported_when_both_dates_are_set() {
    let env = TestEnv::new().expect("test env setup");
    let envelope = EnvelopeBuilder::operations("55").period("2025-01-01", "2025-01-31").build();

    let response = env.post_webhook(&envelope).await.expect("request");

    assert_eq!(response.body["metadata"]["period"], "2025-01-01 até 2025-01-31");
}

#[tokio::test]
async fn stored_file_holds_the_envelope_and_metadata() {
    let env = TestEnv::new().expect("test env setup");
    let envelope = EnvelopeBuilder::operations("123")
        .period("2025-01-01", "2025-01-31")
        .last_modified("2025-02-01T10:00:00Z")
        .extra("checksum", json!("abc"))
        .build();

    let response = env.post_webhook(&envelope).await.expect("request");
    let name = response.body["fileName"].as_str().expect("file name");
    let stored = env.read_record(WebhookType::OperationsByAccount, name).expect("read record");

    assert_eq!(stored["data"], envelope);
    assert_eq!(stored["webhookType"], "operations-by-account");
    assert_eq!(stored["timestamp"], "2023-11-14T22:13:20.000Z");
    assert_eq!(stored["metadata"], response.body["metadata"]);
}

#[tokio::test]
async fn stored_data_keeps_the_body_key_order() {
    let env = TestEnv::new().expect("test env setup");
    let key = env.api_key().to_string();
    let body = r#"{"response":{"url":"http://x","accountNumber":"1"},"errors":[]}"#;

    let response = env.post_raw(body, Some(&key)).await.expect("request");
    let name = response.body["fileName"].as_str().expect("file name");
    let path = env.partition_dir(WebhookType::OperationsByAccount).expect("partition").join(name);
    let text = std::fs::read_to_string(path).expect("read record");
    let stored: serde_json::Value = serde_json::from_str(&text).expect("valid json");

    assert_eq!(serde_json::to_string(&stored["data"]).expect("serialize"), body);
    let url_at = text.find("\"url\"").expect("url key");
    let account_at = text.find("\"accountNumber\"").expect("accountNumber key");
    assert!(url_at < account_at, "keys were reordered:\n{text}");
}

#[tokio::test]
async fn optional_fields_of_unexpected_type_are_accepted() {
    let env = TestEnv::new().expect("test env setup");

    for envelope in [
        json!({"errors": [{"code": 500, "message": "upstream"}], "response": {"url": "http://x"}}),
        json!({"response": {"url": "http://x", "lastModified": 1_700_000_000}}),
        json!({"response": {"url": "http://x", "fileSize": 1024.0}}),
    ] {
        let response = env.post_webhook(&envelope).await.expect("request");
        assert_eq!(response.status, StatusCode::OK, "envelope {envelope}");
    }

    assert_eq!(env.files_in(WebhookType::PositionsByPartner).expect("list files").len(), 3);
}

#[tokio::test]
async fn empty_object_is_rejected() {
    let env = TestEnv::new().expect("test env setup");

    let response = env.post_webhook(&json!({})).await.expect("request");

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), Some(INVALID_PAYLOAD_MESSAGE));
    assert_eq!(env.file_count().expect("count files"), 0);
}

#[tokio::test]
async fn missing_or_empty_url_is_rejected() {
    let env = TestEnv::new().expect("test env setup");

    for envelope in [
        json!({"response": {"accountNumber": "1"}}),
        json!({"response": {"accountNumber": "1", "url": ""}}),
        json!({"response": null}),
        json!({"errors": [], "response": {"url": null}}),
    ] {
        let response = env.post_webhook(&envelope).await.expect("request");
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "envelope {envelope}");
    }
    assert_eq!(env.file_count().expect("count files"), 0);
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    let env = TestEnv::new().expect("test env setup");
    let key = env.api_key().to_string();

    for body in ["", "not json", "[1, 2]", "\"text\"", "{\"response\": {\"url\": 5}}"] {
        let response = env.post_raw(body, Some(&key)).await.expect("request");
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert_eq!(response.message(), Some(INVALID_PAYLOAD_MESSAGE));
    }
}

#[tokio::test]
async fn provider_errors_do_not_block_storage() {
    let env = TestEnv::new().expect("test env setup");
    let envelope = EnvelopeBuilder::positions().error("E42", "partial file").build();

    let response = env.post_webhook(&envelope).await.expect("request");

    assert_eq!(response.status, StatusCode::OK);
    let name = response.body["fileName"].as_str().expect("file name");
    let stored = env.read_record(WebhookType::PositionsByPartner, name).expect("read record");
    assert_eq!(stored["data"]["errors"][0]["code"], "E42");
}

#[tokio::test]
async fn null_errors_are_accepted() {
    let env = TestEnv::new().expect("test env setup");

    let response =
        env.post_webhook(&json!({"errors": null, "response": {"url": "http://x"}})).await.expect("request");

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn same_millisecond_submissions_do_not_overwrite() {
    let env = TestEnv::new().expect("test env setup");
    let envelope = EnvelopeBuilder::operations("9").build();

    let first = env.post_webhook(&envelope).await.expect("first");
    let second = env.post_webhook(&envelope).await.expect("second");

    assert_ne!(first.body["fileName"], second.body["fileName"]);
    assert_eq!(env.files_in(WebhookType::OperationsByAccount).expect("list files").len(), 2);
}

#[tokio::test]
async fn hostile_account_number_stays_in_its_partition() {
    let env = TestEnv::new().expect("test env setup");

    let response =
        env.post_webhook(&EnvelopeBuilder::operations("../../etc/passwd").build()).await.expect("request");

    assert_eq!(response.status, StatusCode::OK);
    let name = response.body["fileName"].as_str().expect("file name");
    assert!(!name.contains('/'));
    assert_eq!(env.files_in(WebhookType::OperationsByAccount).expect("list files"), vec![name.to_string()]);
    assert_eq!(response.body["metadata"]["accountNumber"], "../../etc/passwd");
}

#[tokio::test]
async fn storage_failure_returns_generic_error() {
    let store = MemoryRecordStore::new();
    store.fail_writes(true);
    let env = TestEnv::with_store(Arc::new(store.clone()));

    let response = env.post_webhook(&EnvelopeBuilder::positions().build()).await.expect("request");

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.message(), Some(SUBMIT_FAILED_MESSAGE));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let env = TestEnv::new().expect("test env setup");
    let key = env.api_key().to_string();
    let padding = "x".repeat(env.config.max_body_bytes + 1);
    let body = json!({"response": {"url": "http://x", "note": padding}}).to_string();

    let response = env.post_raw(body, Some(&key)).await.expect("request");

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(env.file_count().expect("count files"), 0);
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let env = TestEnv::new().expect("test env setup");

    let response = env.post_webhook(&EnvelopeBuilder::positions().build()).await.expect("request");

    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(response.headers["referrer-policy"], "no-referrer");
}
