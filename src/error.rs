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

//! Error taxonomy for statement execution.
//!
//! Every failure is classified once, at the point where it is detected:
//!
//! | Kind | Raised when | Gateway status |
//! |------|-------------|----------------|
//! | `Credential` | private key missing, unreadable or unparsable | 500 |
//! | `Connectivity` | the API could not be reached | 503 |
//! | `Upstream` | the API answered but reported failure | 422 / upstream status |
//! | `Protocol` | the response shape broke the expected contract | 502 |
//! | `Configuration` | settings are missing or invalid (before any call) | 500 |
//!
//! Nothing in this crate retries. An error is surfaced exactly once and the
//! caller decides what to do with it.

use std::fmt;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Private key missing, unreadable or unparsable. Fatal.
    Credential,
    /// Network-level failure reaching the SQL API. Transient.
    Connectivity,
    /// The SQL API responded but reported failure.
    Upstream,
    /// The response did not match the documented shape. Fatal.
    Protocol,
    /// Invalid or incomplete client settings.
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Credential => "credential",
            ErrorKind::Connectivity => "connectivity",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// A classified execution failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} error{}: {message}", code_suffix(.code))]
pub struct Error {
    kind: ErrorKind,
    code: Option<String>,
    sql_state: Option<String>,
    http_status: Option<u16>,
    message: String,
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            sql_state: None,
            http_status: None,
            message: message.into(),
        }
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Credential, message)
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connectivity, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Attach the upstream error code (e.g. `"390100"`).
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach the upstream SQLSTATE.
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    /// Attach the HTTP status the upstream responded with.
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Upstream error code, passed through verbatim.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    /// Upstream message (or a description of the local failure).
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn upstream_http_status(&self) -> Option<u16> {
        self.http_status
    }

    /// Whether a later identical call might succeed.
    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Connectivity
    }

    /// HTTP status a gateway should answer with for this error.
    pub fn http_status(&self) -> u16 {
        match self.kind {
            ErrorKind::Credential | ErrorKind::Configuration => 500,
            ErrorKind::Connectivity => 503,
            ErrorKind::Protocol => 502,
            ErrorKind::Upstream => match self.http_status {
                Some(status) if (400..500).contains(&status) => status,
                _ => 422,
            },
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default()
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Error::protocol(format!("Failed to decode response: {}", e));
        }
        Error::connectivity(format!("HTTP request failed: {}", e))
    }
}
