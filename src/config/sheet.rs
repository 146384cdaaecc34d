// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Spreadsheet sink configuration
//!
//! This module defines the structure for configuring the Google Sheets
//! destination and the OAuth2 client used to authenticate against it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the spreadsheet sink.
///
/// # Fields
///
/// * `spreadsheet_id` - Identifier of the destination spreadsheet
/// * `range` - A1 range locating the logical table rows are appended to
/// * `api_base_url` - Sheets API base (overridden in tests)
/// * `token_endpoint` - OAuth2 token endpoint for the refresh grant
/// * `client_id` / `client_secret` - OAuth2 client registered for the
///   spreadsheets scope
/// * `token_cache` - Path of the persisted token cache, restored across
///   process restarts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// The ID of the spreadsheet to append to.
    pub spreadsheet_id: String,

    /// The A1 notation of a range to search for a logical table of data.
    ///
    /// Values are appended after the last row of that table.
    pub range: String,

    /// Base URL of the Sheets API.
    pub api_base_url: String,

    /// OAuth2 token endpoint used for the `refresh_token` grant.
    pub token_endpoint: String,

    /// OAuth2 client ID.
    pub client_id: String,

    /// OAuth2 client secret.
    pub client_secret: String,

    /// Where the access/refresh token cache lives on disk.
    pub token_cache: PathBuf,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            range: "A1:C1".to_string(),
            api_base_url: "https://sheets.googleapis.com".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            token_cache: PathBuf::from("token.json"),
        }
    }
}
