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

//! Client implementations for communicating with the SQL API.
//!
//! This module provides:
//! - `WarehouseClient` trait: Abstract interface for statement submission
//!   and partition retrieval
//! - `SqlApiHttpClient`: Low-level HTTP client that attaches auth headers
//! - `SqlApiClient`: Implementation using the SQL API v2 (REST)

pub mod http;
pub mod sql_api;

use crate::error::Result;
use crate::result::SubmittedStatement;
use crate::types::binding::Bindings;
use async_trait::async_trait;
use serde_json::Value;

pub use http::{HttpClientConfig, SqlApiHttpClient};
pub use sql_api::{SqlApiClient, StatementConfig};

/// Abstract interface for the remote execution API.
///
/// Implementations handle the wire protocol; everything above this seam
/// (decoding, partition fan-out, streaming) is protocol-agnostic.
#[async_trait]
pub trait WarehouseClient: Send + Sync + std::fmt::Debug {
    /// Account endpoint that relative partition URLs resolve against.
    fn base_url(&self) -> &str;

    /// Submit a statement and return its metadata and inline chunk.
    async fn submit_statement(&self, sql: &str, bindings: &Bindings)
        -> Result<SubmittedStatement>;

    /// Fetch one partition's raw rows from an absolute URL.
    async fn fetch_partition(&self, url: &str) -> Result<Vec<Vec<Value>>>;

    /// Release pooled connections. Later calls reopen them.
    fn close(&self);
}
