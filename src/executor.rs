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

//! Query execution entry points.
//!
//! [`QueryExecutor`] composes submission, decoding and partition fetching:
//!
//! ```text
//! submit ──► decode inline chunk ──► RowStream ──► inline rows
//!                                        │
//!                                        └──► (inline exhausted) fetch partitions
//!                                               concurrently ──► rows by index
//! ```
//!
//! `execute_query` is `execute_query_streaming` drained into a `Vec`.

use crate::auth::{AuthProvider, KeyPairAuthenticator};
use crate::client::{SqlApiClient, SqlApiHttpClient, WarehouseClient};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::reader::decoder::{check_missing_partitions, decode_rows};
use crate::reader::partition::PartitionFetcher;
use crate::reader::stream::RowStream;
use crate::result::{Row, SubmittedStatement};
use crate::types::binding::Bindings;
use std::sync::Arc;
use tracing::{debug, warn};

/// Statement used by [`QueryExecutor::check_connection`].
const CONNECTION_CHECK_SQL: &str = "SELECT 1";

/// Executes statements and assembles their results.
///
/// Cheap to clone; clones share the HTTP client and the cached token.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    client: Arc<dyn WarehouseClient>,
}

impl QueryExecutor {
    pub fn new(client: Arc<dyn WarehouseClient>) -> Self {
        Self { client }
    }

    /// Build the full key-pair authenticated client stack from settings.
    ///
    /// The private key is read on the first request, not here, so a bad key
    /// surfaces as a `Credential` error from the first execution.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config.base_url()?;
        debug!("Creating SQL API client for {}", base_url);

        let auth_provider: Arc<dyn AuthProvider> =
            Arc::new(KeyPairAuthenticator::new(config.credentials()?));
        let http_client = Arc::new(SqlApiHttpClient::new(
            config.http_config().clone(),
            auth_provider,
        )?);
        let client = SqlApiClient::new(http_client, base_url, config.statement_config());

        Ok(Self::new(Arc::new(client)))
    }

    pub fn client(&self) -> &Arc<dyn WarehouseClient> {
        &self.client
    }

    /// Submit a statement and return a lazy stream over its rows.
    ///
    /// Submission failures are returned here; partition failures are yielded
    /// by the stream once the inline rows have been consumed.
    pub async fn execute_query_streaming(
        &self,
        sql: &str,
        bindings: &Bindings,
    ) -> Result<RowStream> {
        let SubmittedStatement {
            statement_handle,
            metadata,
            data,
        } = self.client.submit_statement(sql, bindings).await?;

        let inline_rows = decode_rows(&metadata.columns, data)?;
        check_missing_partitions(&metadata, inline_rows.len());

        let has_inline_data = !inline_rows.is_empty();
        let fetcher = PartitionFetcher::new(
            Arc::clone(&self.client),
            statement_handle.clone(),
            metadata.columns.clone(),
        );
        let pending = fetcher.plan(&metadata.partitions, has_inline_data);

        debug!(
            "Statement {}: {} inline rows, {} partitions pending",
            statement_handle,
            inline_rows.len(),
            pending.len()
        );

        Ok(RowStream::new(
            statement_handle,
            metadata.columns,
            inline_rows,
            fetcher,
            pending,
        ))
    }

    /// Execute a statement and collect every row, inline rows first and then
    /// partitions in index order.
    pub async fn execute_query(&self, sql: &str, bindings: &Bindings) -> Result<Vec<Row>> {
        self.execute_query_streaming(sql, bindings)
            .await?
            .collect_rows()
            .await
    }

    /// Whether a trivial statement succeeds. Never fails.
    pub async fn check_connection(&self) -> bool {
        match self
            .execute_query(CONNECTION_CHECK_SQL, &Bindings::new())
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!("Connection check failed: {}", e);
                false
            }
        }
    }

    /// Release pooled connections. Later calls reopen them.
    pub fn close(&self) {
        self.client.close();
    }
}
