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

//! Logging configuration for the SQL API client.
//!
//! Initializes a `tracing-subscriber` with file or stderr output, as plain
//! text or JSON lines.
//!
//! ## Configuration priority
//!
//! 1. `snowflake.log_level` / `LOG_LEVEL` (highest)
//! 2. `RUST_LOG` environment variable
//! 3. Default: `warn`
//!
//! ## Usage
//!
//! ```bash
//! # Via environment variable
//! RUST_LOG=snowflake_sql_api=debug snowflake-sql-api-check
//! ```
//!
//! Or programmatically:
//! ```ignore
//! config.set_option("snowflake.log_level", "debug")?;
//! config.set_option("snowflake.log_file", "/tmp/sql-api.log")?;
//! init_logging(config.log_config());
//! ```

use std::sync::OnceLock;
use tracing_subscriber::{
    fmt::{self, time::SystemTime, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// Log level: "OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE".
    pub level: Option<String>,
    /// Log file path. If unset, logs go to stderr.
    pub file: Option<String>,
    /// Emit JSON lines instead of plain text.
    pub json: bool,
}

fn build_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(format!("snowflake_sql_api={}", level.to_lowercase())),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("snowflake_sql_api=warn")),
    }
}

/// Initialize the tracing subscriber.
///
/// Uses `OnceLock` to ensure this is called at most once per process;
/// subsequent calls are no-ops.
pub fn init_logging(config: &LogConfig) {
    LOGGING_INITIALIZED.get_or_init(|| {
        if let Some(ref level) = config.level {
            if level.eq_ignore_ascii_case("off") {
                return;
            }
        }

        let filter = build_filter(config.level.as_deref());

        let (writer, ansi) = match config.file {
            Some(ref path) => {
                let file = match std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                {
                    Ok(f) => f,
                    Err(e) => {
                        eprintln!(
                            "snowflake-sql-api: failed to open log file {}: {}",
                            path, e
                        );
                        return;
                    }
                };
                (BoxMakeWriter::new(file), false)
            }
            None => (BoxMakeWriter::new(std::io::stderr), true),
        };

        let base = fmt::layer()
            .with_writer(writer)
            .with_target(false)
            .with_ansi(ansi)
            .with_timer(SystemTime);

        let layer: Box<dyn Layer<Registry> + Send + Sync> = if config.json {
            base.json().boxed()
        } else {
            base.boxed()
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()
            .ok();
    });
}
