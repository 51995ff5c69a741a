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

//! SQL API v2 client implementation.
//!
//! This module implements the `WarehouseClient` trait using the REST
//! statement endpoints:
//! - `POST /api/v2/statements` submits a statement
//! - `GET /api/v2/statements/{handle}` polls a statement still running
//! - `GET <partition url>` fetches one result partition

use crate::client::{SqlApiHttpClient, WarehouseClient};
use crate::error::{Error, Result};
use crate::reader::decoder::decode_columns;
use crate::result::{PartitionDescriptor, ResultMetadata, SubmittedStatement};
use crate::types::binding::{format_bindings, Bindings};
use crate::types::sql_api::{
    ExecuteStatementRequest, PartitionResponse, ResultSetFormat, StatementResponse,
    ASYNC_IN_PROGRESS_CODE,
};
use async_trait::async_trait;
use reqwest::{Method, Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Per-statement settings sent with every submission.
#[derive(Debug, Clone)]
pub struct StatementConfig {
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: Option<String>,
    /// Upstream execution timeout, sent in the request body.
    pub statement_timeout: Duration,
    /// Delay between status polls while a statement is still running.
    pub poll_interval: Duration,
    /// Give up polling after this long.
    pub poll_timeout: Duration,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            warehouse: String::new(),
            database: String::new(),
            schema: String::new(),
            role: None,
            statement_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
            poll_timeout: Duration::from_secs(600),
        }
    }
}

/// Client for the SQL API v2 statement endpoints.
#[derive(Debug)]
pub struct SqlApiClient {
    http_client: Arc<SqlApiHttpClient>,
    base_url: String,
    config: StatementConfig,
}

impl SqlApiClient {
    pub fn new(
        http_client: Arc<SqlApiHttpClient>,
        base_url: impl Into<String>,
        config: StatementConfig,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        }
    }

    pub fn http_client(&self) -> &Arc<SqlApiHttpClient> {
        &self.http_client
    }

    pub fn config(&self) -> &StatementConfig {
        &self.config
    }

    fn statements_url(&self) -> String {
        format!("{}/api/v2/statements", self.base_url)
    }

    fn status_url(&self, response: &StatementResponse, statement_handle: &str) -> String {
        match response.statement_status_url.as_deref() {
            Some(path) if path.starts_with('/') => format!("{}{}", self.base_url, path),
            _ => format!("{}/{}", self.statements_url(), statement_handle),
        }
    }

    fn build_request_body(&self, sql: &str, bindings: &Bindings) -> ExecuteStatementRequest {
        ExecuteStatementRequest {
            statement: sql.to_string(),
            warehouse: self.config.warehouse.clone(),
            database: self.config.database.clone(),
            schema: self.config.schema.clone(),
            role: self.config.role.clone(),
            timeout: self.config.statement_timeout.as_secs(),
            result_set_meta_data: ResultSetFormat::json(),
            bindings: format_bindings(bindings),
        }
    }

    /// Send a request and parse the statement response body.
    async fn send(&self, request: Request) -> Result<(StatusCode, StatementResponse)> {
        let response = self.http_client.execute(request).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::connectivity(format!("Failed to read response: {}", e)))?;
        Ok((status, parse_statement_response(&body)?))
    }

    async fn call_execute_api(
        &self,
        sql: &str,
        bindings: &Bindings,
    ) -> Result<(StatusCode, StatementResponse)> {
        let url = self.statements_url();
        let request_body = self.build_request_body(sql, bindings);

        debug!(
            "Executing statement at {} ({} bindings): {}",
            url,
            request_body.bindings.len(),
            sql
        );

        let request = self
            .http_client
            .inner()?
            .request(Method::POST, &url)
            .json(&request_body)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build request: {}", e)))?;

        let (status, response) = self.send(request).await?;
        debug!(
            "Execute response: status={}, statement_handle={:?}, code={:?}",
            status.as_u16(),
            response.statement_handle,
            response.code
        );
        Ok((status, response))
    }

    async fn get_statement_status(&self, url: &str) -> Result<(StatusCode, StatementResponse)> {
        debug!("Getting statement status at {}", url);

        let request = self
            .http_client
            .inner()?
            .request(Method::GET, url)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build request: {}", e)))?;

        self.send(request).await
    }

    /// Poll while the statement is still running (HTTP 202).
    async fn wait_for_completion(
        &self,
        status: StatusCode,
        response: StatementResponse,
    ) -> Result<StatementResponse> {
        let start = Instant::now();
        let (mut status, mut response) = (status, response);

        while is_still_running(status, &response) {
            let statement_handle = response.statement_handle.clone().ok_or_else(|| {
                Error::protocol("Statement still running but response has no statementHandle")
            })?;

            if start.elapsed() >= self.config.poll_timeout {
                let mut err = Error::upstream(format!(
                    "Statement {} did not complete within {:?}",
                    statement_handle, self.config.poll_timeout
                ));
                if let Some(code) = response.code {
                    err = err.with_code(code);
                }
                return Err(err);
            }

            tokio::time::sleep(self.config.poll_interval).await;

            debug!("Polling statement status: {}", statement_handle);
            let url = self.status_url(&response, &statement_handle);
            (status, response) = self.get_statement_status(&url).await?;
        }

        Ok(response)
    }
}

/// A statement is still executing when the upstream answers 202 or reports
/// the in-progress code.
fn is_still_running(status: StatusCode, response: &StatementResponse) -> bool {
    status == StatusCode::ACCEPTED || response.code.as_deref() == Some(ASYNC_IN_PROGRESS_CODE)
}

/// Parse a statement response body. A body that is not the expected JSON
/// object is a protocol error.
pub fn parse_statement_response(body: &str) -> Result<StatementResponse> {
    serde_json::from_str(body).map_err(|e| {
        Error::protocol(format!(
            "Failed to parse statement response: {} - body: {}",
            e, body
        ))
    })
}

/// Validate a completed statement response and convert it into metadata
/// plus the undecoded inline chunk.
///
/// The top-level code is checked before anything else, so an upstream
/// failure is never misreported as a missing field.
pub(crate) fn into_submitted(response: StatementResponse) -> Result<SubmittedStatement> {
    if !response.is_success_code() {
        let message = response
            .message
            .unwrap_or_else(|| "Unknown error".to_string());
        let mut err = Error::upstream(message).with_code(response.code.unwrap_or_default());
        if let Some(sql_state) = response.sql_state {
            err = err.with_sql_state(sql_state);
        }
        return Err(err);
    }

    let statement_handle = response
        .statement_handle
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::protocol("Response is missing statementHandle"))?;

    let row_type = response
        .result_set_meta_data
        .as_ref()
        .and_then(|m| m.row_type.as_deref())
        .ok_or_else(|| {
            Error::protocol(format!(
                "Response for statement {} is missing resultSetMetaData.rowType",
                statement_handle
            ))
        })?;
    let columns = decode_columns(row_type);

    let meta = response.result_set_meta_data.unwrap_or_default();
    let partitions = meta
        .partition_info
        .into_iter()
        .enumerate()
        .map(|(index, info)| PartitionDescriptor {
            index,
            url: info.url,
            row_count: info.row_count,
        })
        .collect();

    Ok(SubmittedStatement {
        statement_handle,
        metadata: ResultMetadata {
            columns,
            total_rows: meta.num_rows,
            partitions,
        },
        data: response.data.unwrap_or_default(),
    })
}

#[async_trait]
impl WarehouseClient for SqlApiClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn submit_statement(
        &self,
        sql: &str,
        bindings: &Bindings,
    ) -> Result<SubmittedStatement> {
        // 1. Call the statements endpoint
        let (status, response) = self.call_execute_api(sql, bindings).await?;

        // 2. Poll if the statement is still running
        let response = self.wait_for_completion(status, response).await?;

        // 3. Validate the response shape
        let submitted = into_submitted(response)?;
        debug!(
            "Statement {} submitted: {} columns, {} inline rows, {} partitions",
            submitted.statement_handle,
            submitted.metadata.columns.len(),
            submitted.data.len(),
            submitted.metadata.partitions.len()
        );
        Ok(submitted)
    }

    async fn fetch_partition(&self, url: &str) -> Result<Vec<Vec<Value>>> {
        let request = self
            .http_client
            .inner()?
            .request(Method::GET, url)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build request: {}", e)))?;

        let response = self.http_client.execute(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::connectivity(format!("Failed to read partition: {}", e)))?;

        let partition: PartitionResponse = serde_json::from_str(&body).map_err(|e| {
            Error::protocol(format!("Failed to parse partition response from {}: {}", url, e))
        })?;
        Ok(partition.data)
    }

    fn close(&self) {
        self.http_client.close();
    }
}
