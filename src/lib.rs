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

//! Snowflake SQL API v2 client for Rust
//!
//! This crate executes SQL statements against the Snowflake SQL API using
//! key-pair (JWT) authentication and returns the results as decoded rows,
//! either collected or as a lazy stream.
//!
//! ## Overview
//!
//! - [`QueryExecutor`] - Entry point: `execute_query`, `execute_query_streaming`
//!   and `check_connection`
//! - [`ClientConfig`] - Account, target and key settings
//! - [`KeyPairAuthenticator`] - Signs and caches the bearer token
//! - [`WarehouseClient`] - Seam between result assembly and the wire protocol
//! - [`RowStream`] - Inline rows first, then partitions in index order
//!
//! ## Features
//!
//! - **Key-pair auth**: PKCS#8 (optionally encrypted) and PKCS#1 keys, RS256
//!   tokens reused until five minutes before expiry
//! - **Typed bindings**: integer, real and text parameters
//! - **Partitioned results**: remaining partitions fetched concurrently and
//!   merged in partition order
//! - **Async statements**: `202 Accepted` responses are polled to completion
//!
//! ## Example
//!
//! ```ignore
//! use snowflake_sql_api::{Bindings, ClientConfig, QueryExecutor};
//!
//! let config = ClientConfig::from_env()?;
//! let executor = QueryExecutor::from_config(&config)?;
//!
//! let mut bindings = Bindings::new();
//! bindings.insert("1".to_string(), 10i64.into());
//! let rows = executor
//!     .execute_query("SELECT ID, NAME FROM COMPANIES LIMIT ?", &bindings)
//!     .await?;
//! for row in rows {
//!     println!("{}", row.get_str("name").unwrap_or_default());
//! }
//! ```
//!
//! Options are listed in [`config`].

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod reader;
pub mod result;
pub mod types;

// Re-export main types
pub use config::ClientConfig;
pub use error::{Error, ErrorKind, Result};
pub use executor::QueryExecutor;
pub use logging::{init_logging, LogConfig};
pub use reader::RowStream;
pub use result::{ResultMetadata, Row};
pub use types::binding::{BindingValue, Bindings};

// Re-export auth and client types for advanced users
pub use auth::{AuthProvider, Credentials, KeyPairAuthenticator, OAuthToken, PrivateKeySource};
pub use client::{HttpClientConfig, SqlApiClient, SqlApiHttpClient, StatementConfig, WarehouseClient};
