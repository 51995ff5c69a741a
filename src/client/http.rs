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

//! HTTP client implementation for the SQL API.
//!
//! This module provides a low-level HTTP client with:
//! - Connection pooling, shared by every statement and partition fetch
//! - Bearer token and token-type headers on every request
//! - Configurable timeouts
//! - Transparent gzip decoding (partitions after the first arrive compressed)
//! - Lazy reopen after [`SqlApiHttpClient::close`]
//!
//! Requests are sent exactly once; there is no retry loop.

use crate::auth::{AuthProvider, TOKEN_TYPE_HEADER};
use crate::error::{Error, Result};
use crate::types::sql_api::ErrorResponse;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Request, Response, StatusCode};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Whole-request timeout. Longer than the upstream statement timeout so
    /// that a slow statement is reported by the upstream, not cut off here.
    pub read_timeout: Duration,
    /// Maximum number of idle connections per host.
    pub max_connections_per_host: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(90),
            max_connections_per_host: 100,
            user_agent: format!("snowflake-sql-api/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client for the SQL API endpoints.
///
/// The pooled `reqwest::Client` is created on construction, dropped by
/// [`close`](Self::close) and rebuilt on the next request.
#[derive(Debug)]
pub struct SqlApiHttpClient {
    client: RwLock<Option<Client>>,
    config: HttpClientConfig,
    auth_provider: Arc<dyn AuthProvider>,
}

impl SqlApiHttpClient {
    /// Creates a new HTTP client with the given configuration and auth provider.
    pub fn new(config: HttpClientConfig, auth_provider: Arc<dyn AuthProvider>) -> Result<Self> {
        let client = Self::build_client(&config)?;
        Ok(Self {
            client: RwLock::new(Some(client)),
            config,
            auth_provider,
        })
    }

    fn build_client(config: &HttpClientConfig) -> Result<Client> {
        Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .pool_max_idle_per_host(config.max_connections_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Returns the pooled client for building requests, reopening it if the
    /// client was closed.
    pub fn inner(&self) -> Result<Client> {
        {
            let guard = self.client.read().unwrap_or_else(|e| e.into_inner());
            if let Some(client) = guard.as_ref() {
                return Ok(client.clone());
            }
        }

        let mut guard = self.client.write().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        debug!("Reopening HTTP client");
        let client = Self::build_client(&self.config)?;
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Drop the pooled connections. Idempotent.
    pub fn close(&self) {
        let mut guard = self.client.write().unwrap_or_else(|e| e.into_inner());
        if guard.take().is_some() {
            debug!("HTTP client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.client
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Get the authorization header value.
    pub fn auth_header(&self) -> Result<String> {
        self.auth_provider.get_auth_header()
    }

    /// Execute an HTTP request with authentication.
    ///
    /// Any 2xx response (including `202 Accepted`) is returned to the caller.
    /// Other statuses become errors:
    /// - a parseable error body: `Upstream` with the upstream code and message
    /// - otherwise 5xx: `Connectivity`; 4xx: `Upstream`
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        let auth_header = self.auth_header()?;
        let token_type_header = HeaderName::from_bytes(TOKEN_TYPE_HEADER.as_bytes())
            .map_err(|e| Error::configuration(format!("Invalid header name: {}", e)))?;
        let headers = request.headers_mut();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_header)
                .map_err(|e| Error::credential(format!("Invalid authorization header: {}", e)))?,
        );
        headers.insert(
            token_type_header,
            HeaderValue::from_static(self.auth_provider.token_type()),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let method = request.method().clone();
        let url = request.url().clone();
        debug!("Executing {} {}", method, url);

        let client = self.inner()?;
        let response = client.execute(request).await.map_err(|e| {
            warn!("{} {} failed: {}", method, url, e);
            Error::connectivity(format!("HTTP request to {} failed: {}", url, e))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("{} {} returned HTTP {}", method, url, status.as_u16());
        Err(error_from_status(status, &body))
    }
}

/// Classify a non-2xx response.
pub(crate) fn error_from_status(status: StatusCode, body: &str) -> Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        if let Some(message) = parsed.message.filter(|m| !m.is_empty()) {
            let mut err = Error::upstream(message).with_http_status(status.as_u16());
            if let Some(code) = parsed.code {
                err = err.with_code(code);
            }
            if let Some(sql_state) = parsed.sql_state {
                err = err.with_sql_state(sql_state);
            }
            return err;
        }
    }

    let message = format!("HTTP {} - {}", status.as_u16(), body);
    if status.is_server_error() {
        Error::connectivity(message).with_http_status(status.as_u16())
    } else {
        Error::upstream(message).with_http_status(status.as_u16())
    }
}
