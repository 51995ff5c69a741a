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

//! Row decoding shared by the inline chunk and every partition.

use crate::error::{Error, Result};
use crate::result::{Columns, ResultMetadata, Row};
use crate::types::sql_api::ColumnInfo;
use serde_json::Value;
use tracing::warn;

/// Lower-case the `rowType` names once for the whole result.
pub fn decode_columns(row_type: &[ColumnInfo]) -> Columns {
    row_type
        .iter()
        .map(|column| column.name.to_lowercase())
        .collect::<Vec<_>>()
        .into()
}

/// Pair each raw value array with the column list.
///
/// A row whose width differs from the column count is a protocol error.
pub fn decode_rows(columns: &Columns, raw_rows: Vec<Vec<Value>>) -> Result<Vec<Row>> {
    raw_rows
        .into_iter()
        .enumerate()
        .map(|(i, values)| {
            if values.len() != columns.len() {
                return Err(Error::protocol(format!(
                    "Row {} has {} values but the result has {} columns",
                    i,
                    values.len(),
                    columns.len()
                )));
            }
            Ok(Row::new(columns.clone(), values))
        })
        .collect()
}

/// Warn when `numRows` promises more rows than the inline chunk holds and no
/// partitions are listed to supply them. Returns whether rows are missing.
pub fn check_missing_partitions(metadata: &ResultMetadata, inline_rows: usize) -> bool {
    let Some(total_rows) = metadata.total_rows else {
        return false;
    };
    if metadata.partitions.is_empty() && total_rows > inline_rows as i64 {
        warn!(
            "Row mismatch: expected {} rows, got {} in the first chunk, but no partitions listed",
            total_rows, inline_rows
        );
        return true;
    }
    false
}
