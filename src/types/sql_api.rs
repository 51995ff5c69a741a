// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SQL API v2 request/response types.
//!
//! These types map directly to the JSON structures used by
//! `POST /api/v2/statements` and the partition retrieval endpoint. They are
//! primarily used by `SqlApiClient`.

use crate::types::binding::WireBinding;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Top-level `code` of a successfully executed statement.
pub const SUCCESS_CODE: &str = "090001";

/// Top-level `code` of a statement that is still executing (HTTP 202).
pub const ASYNC_IN_PROGRESS_CODE: &str = "333334";

/// Request body for statement execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteStatementRequest {
    pub statement: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Upstream execution timeout in seconds.
    pub timeout: u64,
    pub result_set_meta_data: ResultSetFormat,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, WireBinding>,
}

/// Requested result format.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSetFormat {
    pub format: String,
}

impl ResultSetFormat {
    pub fn json() -> Self {
        Self {
            format: "json".to_string(),
        }
    }
}

/// Response from statement submission or status polling.
///
/// Every field is optional on the wire; the submitter decides which absences
/// are contract violations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    #[serde(default)]
    pub statement_handle: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub sql_state: Option<String>,
    #[serde(default)]
    pub statement_status_url: Option<String>,
    #[serde(default)]
    pub result_set_meta_data: Option<ResultSetMetaData>,
    /// Inline chunk: one array of cell values per row.
    #[serde(default)]
    pub data: Option<Vec<Vec<Value>>>,
}

impl StatementResponse {
    /// Whether the top-level code reports success (or is absent).
    pub fn is_success_code(&self) -> bool {
        match self.code.as_deref() {
            None | Some("") => true,
            Some(code) => code == SUCCESS_CODE,
        }
    }
}

/// Metadata describing the result set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetMetaData {
    #[serde(default)]
    pub num_rows: Option<i64>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub row_type: Option<Vec<ColumnInfo>>,
    #[serde(default)]
    pub partition_info: Vec<PartitionInfo>,
}

/// A single column in `rowType`.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub nullable: Option<bool>,
}

/// One entry of `partitionInfo`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    #[serde(default)]
    pub row_count: Option<i64>,
    #[serde(default)]
    pub uncompressed_size: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Response from a partition GET.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartitionResponse {
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

/// Error body returned with a non-2xx status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub sql_state: Option<String>,
    #[serde(default)]
    pub statement_handle: Option<String>,
}
