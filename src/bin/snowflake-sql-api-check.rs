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

//! Connectivity check for the SQL API.
//!
//! Reads `SNOWFLAKE_*` settings from the environment, runs `SELECT 1`, then
//! any `--query` statements, printing each row as a JSON line on stdout.
//!
//! ```sh
//! snowflake-sql-api-check --query "SELECT CURRENT_VERSION()"
//! snowflake-sql-api-check -o snowflake.role=ANALYST -q "SELECT * FROM T LIMIT 5"
//! ```

use clap::Parser;
use futures_util::TryStreamExt;
use snowflake_sql_api::{init_logging, Bindings, ClientConfig, QueryExecutor};
use std::process::ExitCode;
use tracing::info;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "snowflake-sql-api-check")]
#[command(about = "Check SQL API connectivity and optionally run statements")]
struct Args {
    /// Statement to run after the connectivity check. Repeatable.
    #[arg(short, long = "query")]
    queries: Vec<String>,

    /// Extra option as KEY=VALUE, applied over the environment. Repeatable.
    #[arg(short = 'o', long = "option", value_parser = parse_key_value)]
    options: Vec<(String, String)>,

    /// Print only row counts, not rows.
    #[arg(long)]
    count_only: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

async fn run(args: Args) -> snowflake_sql_api::Result<bool> {
    let mut config = ClientConfig::from_env()?;
    for (key, value) in &args.options {
        config.set_option(key, value.as_str())?;
    }
    init_logging(config.log_config());

    let executor = QueryExecutor::from_config(&config)?;
    if !executor.check_connection().await {
        eprintln!("connection check failed");
        return Ok(false);
    }
    info!("Connection check passed");
    eprintln!("connection ok");

    for sql in &args.queries {
        let mut stream = executor.execute_query_streaming(sql, &Bindings::new()).await?;
        let mut count = 0usize;
        while let Some(row) = stream.try_next().await? {
            count += 1;
            if !args.count_only {
                match serde_json::to_string(&row) {
                    Ok(line) => println!("{}", line),
                    Err(e) => eprintln!("failed to render row {}: {}", count, e),
                }
            }
        }
        eprintln!("{} rows from statement {}", count, stream.statement_handle());
    }

    executor.close();
    Ok(true)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {} (HTTP {})", e, e.http_status());
            ExitCode::FAILURE
        }
    }
}
