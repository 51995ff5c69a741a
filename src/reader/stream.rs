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

//! Lazy, single-pass row stream over one statement's results.
//!
//! Phase transitions:
//! ```text
//!   Inline -> Complete            (no partitions pending)
//!   Inline -> Fetching            (inline rows exhausted)
//!   Fetching -> Merged            (every partition fetched and decoded)
//!   Fetching -> Failed            (any partition failed; terminal)
//!   Merged -> Complete            (partition rows exhausted)
//! ```
//!
//! Partition fetching is not started until the last inline row has been
//! handed out. Dropping the stream mid-fetch drops the in-flight requests;
//! the shared HTTP client is unaffected.

use crate::error::Result;
use crate::reader::partition::{PartitionFetcher, PendingPartition};
use crate::result::{Columns, Row};
use futures_util::future::BoxFuture;
use futures_util::stream::Stream;
use futures_util::{FutureExt, StreamExt, TryStreamExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// Where a [`RowStream`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Handing out rows from the submission response.
    Inline,
    /// Waiting for all partitions to arrive.
    Fetching,
    /// Handing out partition rows in index order.
    Merged,
    /// Exhausted.
    Complete,
    /// A partition fetch failed; the error has been yielded.
    Failed,
}

/// Rows of one executed statement: inline chunk first, then partitions.
pub struct RowStream {
    statement_handle: String,
    columns: Columns,
    inline: std::vec::IntoIter<Row>,
    fetch: Option<BoxFuture<'static, Result<Vec<Row>>>>,
    partition_rows: std::vec::IntoIter<Row>,
    phase: StreamPhase,
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("statement_handle", &self.statement_handle)
            .field("columns", &self.columns)
            .field("phase", &self.phase)
            .finish()
    }
}

impl RowStream {
    /// Stream over inline rows followed by the given pending partitions.
    pub fn new(
        statement_handle: impl Into<String>,
        columns: Columns,
        inline_rows: Vec<Row>,
        fetcher: PartitionFetcher,
        pending: Vec<PendingPartition>,
    ) -> Self {
        let fetch = if pending.is_empty() {
            None
        } else {
            // Not polled (and so not started) until the inline rows run out.
            Some(async move { fetcher.fetch_all(pending).await }.boxed())
        };

        Self {
            statement_handle: statement_handle.into(),
            columns,
            inline: inline_rows.into_iter(),
            fetch,
            partition_rows: Vec::new().into_iter(),
            phase: StreamPhase::Inline,
        }
    }

    pub fn statement_handle(&self) -> &str {
        &self.statement_handle
    }

    /// Lower-cased column names, in result order.
    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Next row, or `None` once the stream is exhausted.
    pub async fn next_row(&mut self) -> Option<Result<Row>> {
        self.next().await
    }

    /// Drain the stream into a vector, failing on the first error.
    pub async fn collect_rows(self) -> Result<Vec<Row>> {
        self.try_collect().await
    }
}

impl Stream for RowStream {
    type Item = Result<Row>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match this.phase {
                StreamPhase::Inline => {
                    if let Some(row) = this.inline.next() {
                        return Poll::Ready(Some(Ok(row)));
                    }
                    this.phase = if this.fetch.is_some() {
                        debug!(
                            "Inline rows exhausted for statement {}, fetching partitions",
                            this.statement_handle
                        );
                        StreamPhase::Fetching
                    } else {
                        StreamPhase::Complete
                    };
                }
                StreamPhase::Fetching => {
                    let Some(fetch) = this.fetch.as_mut() else {
                        this.phase = StreamPhase::Complete;
                        continue;
                    };
                    match fetch.as_mut().poll(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Ok(rows)) => {
                            this.fetch = None;
                            this.partition_rows = rows.into_iter();
                            this.phase = StreamPhase::Merged;
                        }
                        Poll::Ready(Err(e)) => {
                            this.fetch = None;
                            this.phase = StreamPhase::Failed;
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
                StreamPhase::Merged => {
                    if let Some(row) = this.partition_rows.next() {
                        return Poll::Ready(Some(Ok(row)));
                    }
                    this.phase = StreamPhase::Complete;
                }
                StreamPhase::Complete | StreamPhase::Failed => return Poll::Ready(None),
            }
        }
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        if self.phase == StreamPhase::Fetching {
            debug!(
                "Row stream for statement {} dropped during partition fetch; abandoning requests",
                self.statement_handle
            );
        }
    }
}
