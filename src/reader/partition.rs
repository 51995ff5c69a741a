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

//! Concurrent retrieval of result partitions.
//!
//! ## Algorithm
//!
//! 1. Partition 0 is skipped when the inline chunk already carried rows.
//! 2. A partition without a URL gets one built from the statement handle.
//! 3. Relative URLs are resolved: `/path` against the account endpoint,
//!    anything else against `/api/v2/statements/{handle}/`.
//! 4. All pending partitions are fetched at once, with no concurrency cap.
//!    The first failure drops the remaining in-flight requests and fails the
//!    whole batch.
//! 5. Each partition is decoded with the column list of the submission.
//! 6. Rows come out in partition-index order whatever order the network
//!    completes in (`try_join_all` keeps input order).

use crate::client::WarehouseClient;
use crate::error::Result;
use crate::reader::decoder::decode_rows;
use crate::result::{Columns, PartitionDescriptor, Row};
use futures_util::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A partition scheduled for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPartition {
    pub index: usize,
    pub url: String,
}

/// Absolute URL for one partition.
pub fn resolve_partition_url(
    base_url: &str,
    statement_handle: &str,
    descriptor: &PartitionDescriptor,
) -> String {
    let base_url = base_url.trim_end_matches('/');

    let url = match descriptor.url.as_deref() {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => {
            warn!(
                "Partition {} missing URL, constructing from statement handle",
                descriptor.index
            );
            format!(
                "/api/v2/statements/{}?partition={}",
                statement_handle, descriptor.index
            )
        }
    };

    if url.starts_with("http://") || url.starts_with("https://") {
        url
    } else if url.starts_with('/') {
        format!("{}{}", base_url, url)
    } else {
        format!(
            "{}/api/v2/statements/{}/{}",
            base_url, statement_handle, url
        )
    }
}

/// Select and resolve the partitions that still need fetching, ordered by
/// index.
pub fn plan_partitions(
    base_url: &str,
    statement_handle: &str,
    descriptors: &[PartitionDescriptor],
    has_inline_data: bool,
) -> Vec<PendingPartition> {
    let mut pending: Vec<PendingPartition> = descriptors
        .iter()
        .filter(|d| !(d.index == 0 && has_inline_data))
        .map(|d| PendingPartition {
            index: d.index,
            url: resolve_partition_url(base_url, statement_handle, d),
        })
        .collect();
    pending.sort_by_key(|p| p.index);
    pending
}

/// Fetches and decodes the partitions of one statement.
#[derive(Debug, Clone)]
pub struct PartitionFetcher {
    client: Arc<dyn WarehouseClient>,
    statement_handle: String,
    columns: Columns,
}

impl PartitionFetcher {
    pub fn new(
        client: Arc<dyn WarehouseClient>,
        statement_handle: impl Into<String>,
        columns: Columns,
    ) -> Self {
        Self {
            client,
            statement_handle: statement_handle.into(),
            columns,
        }
    }

    /// Plan the remaining partitions for this statement.
    pub fn plan(
        &self,
        descriptors: &[PartitionDescriptor],
        has_inline_data: bool,
    ) -> Vec<PendingPartition> {
        plan_partitions(
            self.client.base_url(),
            &self.statement_handle,
            descriptors,
            has_inline_data,
        )
    }

    /// Fetch every partition not already covered by the inline chunk.
    pub async fn fetch_remaining(
        &self,
        descriptors: &[PartitionDescriptor],
        has_inline_data: bool,
    ) -> Result<Vec<Row>> {
        let pending = self.plan(descriptors, has_inline_data);
        self.fetch_all(pending).await
    }

    /// Fetch the given partitions concurrently and concatenate their rows in
    /// the order given.
    pub async fn fetch_all(&self, pending: Vec<PendingPartition>) -> Result<Vec<Row>> {
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            "Gathering {} partitions for statement {}",
            pending.len(),
            self.statement_handle
        );

        let chunks = try_join_all(pending.iter().map(|p| self.fetch_one(p))).await?;

        let rows: Vec<Row> = chunks.into_iter().flatten().collect();
        info!(
            "Partitions gathered for statement {}: {} rows",
            self.statement_handle,
            rows.len()
        );
        Ok(rows)
    }

    async fn fetch_one(&self, partition: &PendingPartition) -> Result<Vec<Row>> {
        debug!("Fetching partition {} from {}", partition.index, partition.url);

        let raw = self
            .client
            .fetch_partition(&partition.url)
            .await
            .inspect_err(|e| {
                error!(
                    "Failed to fetch partition {} ({}): {}",
                    partition.index, partition.url, e
                )
            })?;

        let rows = decode_rows(&self.columns, raw)?;
        debug!("Partition {}: {} rows", partition.index, rows.len());
        Ok(rows)
    }
}
