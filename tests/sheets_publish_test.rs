// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Integration tests for the spreadsheet sink
//!
//! Runs the publisher against a local wiremock server standing in for the
//! Sheets API and the OAuth2 token endpoint, asserting the exact wire
//! behavior: URL, query parameters, bearer authentication, row body, and
//! the refresh-token grant.

use std::path::PathBuf;

use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hydrolog::acquisition::Reading;
use hydrolog::config::SheetConfig;
use hydrolog::sheets::{
    OauthTokenProvider, PublishError, ReadingSink, SheetsPublisher, StaticTokenProvider,
    TokenProvider,
};

fn sheet_config(base_url: &str, token_cache: PathBuf) -> SheetConfig {
    SheetConfig {
        spreadsheet_id: "sheet-1".to_string(),
        range: "A1:C1".to_string(),
        api_base_url: base_url.to_string(),
        token_endpoint: format!("{}/token", base_url),
        client_id: "client-1".to_string(),
        client_secret: "secret-1".to_string(),
        token_cache,
    }
}

fn reference_reading() -> Reading {
    Reading {
        timestamp: "2023-01-01T10:15:30.000000".to_string(),
        raw_microamps: 16_000,
        derived_value: 22.5,
    }
}

#[tokio::test]
async fn test_publish_appends_one_typed_row() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-1/values/A1:C1:append"))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(query_param("insertDataOption", "INSERT_ROWS"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "range": "A1:C1",
            "values": [["2023-01-01T10:15:30.000000", 16_000, 22.5]],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": "sheet-1",
            "tableRange": "A1:C4",
            "updates": {
                "updatedRange": "A5:C5",
                "updatedRows": 1,
                "updatedColumns": 3,
                "updatedCells": 3,
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = sheet_config(&server.uri(), PathBuf::from("unused.json"));
    let publisher = SheetsPublisher::new(&config, Box::new(StaticTokenProvider::new("test-token")));

    let ack = publisher.publish(&reference_reading()).await.unwrap();
    assert_eq!(ack.spreadsheet_id, "sheet-1");
    assert_eq!(ack.updates.updated_rows, 1);
    assert_eq!(ack.updates.updated_range, "A5:C5");
}

#[tokio::test]
async fn test_publish_surfaces_sink_rejection_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficient scope"))
        .expect(1) // A single attempt: the publisher never retries
        .mount(&server)
        .await;

    let config = sheet_config(&server.uri(), PathBuf::from("unused.json"));
    let publisher = SheetsPublisher::new(&config, Box::new(StaticTokenProvider::new("test-token")));

    let err = publisher.publish(&reference_reading()).await.unwrap_err();
    match err {
        PublishError::Status { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("insufficient scope"));
        }
        other => panic!("unexpected error variant: {other:?}"),
    }
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .and(body_string_contains("client_id=client-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    std::fs::write(
        &cache_path,
        // Expired in 2020: the provider must refresh before answering
        r#"{"access_token":"stale-token","refresh_token":"refresh-1","expiry":"2020-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    let config = sheet_config(&server.uri(), cache_path.clone());
    let provider = OauthTokenProvider::new(&config);

    let token = provider.access_token().await.unwrap();
    assert_eq!(token, "fresh-token");

    // The rotated cache is persisted for the next process start, keeping
    // the original refresh token since none was returned
    let persisted = std::fs::read_to_string(&cache_path).unwrap();
    assert!(persisted.contains("fresh-token"));
    assert!(persisted.contains("refresh-1"));

    // A second call is served from the refreshed in-memory cache
    assert_eq!(provider.access_token().await.unwrap(), "fresh-token");
}

#[tokio::test]
async fn test_rejected_refresh_is_a_publish_credential_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    std::fs::write(
        &cache_path,
        r#"{"access_token":"stale","refresh_token":"revoked","expiry":"2020-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    let config = sheet_config(&server.uri(), cache_path);
    let publisher = SheetsPublisher::new(
        &config,
        Box::new(OauthTokenProvider::new(&config)),
    );

    let err = publisher.publish(&reference_reading()).await.unwrap_err();
    assert!(matches!(err, PublishError::Credential(_)));
}
