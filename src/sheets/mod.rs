// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Spreadsheet sink
//!
//! Appends readings to a Google Sheets spreadsheet with the `values:append`
//! call: one POST per reading, `USER_ENTERED` value interpretation (the
//! sheet coerces the numeric strings itself) and `INSERT_ROWS` placement.
//!
//! Unlike the sensor reader, the publisher performs NO internal retry: any
//! credential, transport or HTTP-status failure surfaces as a
//! [`PublishError`] and the acquisition loop decides what to do with it
//! (it logs the failure and drops the reading).

pub mod token;

pub use token::{CredentialError, OauthTokenProvider, StaticTokenProvider, TokenProvider};

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use crate::acquisition::Reading;
use crate::config::SheetConfig;

/// A failed append. Surfaced to the acquisition loop, never retried here.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("could not obtain a sink credential: {0}")]
    Credential(#[from] CredentialError),

    #[error("append request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sink rejected the append: HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Cell statistics echoed back by the sink for an append.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppendUpdates {
    pub updated_range: String,
    pub updated_rows: u32,
    pub updated_columns: u32,
    pub updated_cells: u32,
}

/// Acknowledgement returned by the sink on a successful append.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppendResponse {
    pub spreadsheet_id: String,
    pub table_range: Option<String>,
    pub updates: AppendUpdates,
}

/// Destination for readings.
///
/// The acquisition loop depends on this trait rather than on the concrete
/// publisher so tests can substitute a failing or recording sink.
#[async_trait]
pub trait ReadingSink: Send + Sync {
    async fn publish(&self, reading: &Reading) -> Result<AppendResponse, PublishError>;
}

/// Google Sheets implementation of [`ReadingSink`].
pub struct SheetsPublisher {
    http: reqwest::Client,
    api_base_url: String,
    spreadsheet_id: String,
    range: String,
    tokens: Box<dyn TokenProvider>,
}

impl SheetsPublisher {
    pub fn new(config: &SheetConfig, tokens: Box<dyn TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            tokens,
        }
    }
}

#[async_trait]
impl ReadingSink for SheetsPublisher {
    async fn publish(&self, reading: &Reading) -> Result<AppendResponse, PublishError> {
        let token = self.tokens.access_token().await?;

        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.api_base_url, self.spreadsheet_id, self.range
        );
        let body = serde_json::json!({
            "range": self.range,
            "values": [[
                reading.timestamp,
                reading.raw_microamps,
                reading.derived_value,
            ]],
        });

        debug!("Sending data to sheet {}", self.spreadsheet_id);
        let response = self
            .http
            .post(&url)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ack: AppendResponse = response.json().await?;
        info!(
            "Sheet acknowledged append of {} row(s) into {}",
            ack.updates.updated_rows, ack.updates.updated_range
        );
        Ok(ack)
    }
}
