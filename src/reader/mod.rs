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

//! Result readers for turning statement responses into rows.
//!
//! This module provides:
//! - `decoder`: The single column/row decoding routine used for every chunk
//! - `PartitionFetcher`: Concurrent retrieval of the remaining partitions
//! - `RowStream`: Lazy stream yielding inline rows, then partition rows

pub mod decoder;
pub mod partition;
pub mod stream;

pub use decoder::{check_missing_partitions, decode_columns, decode_rows};
pub use partition::{plan_partitions, resolve_partition_url, PartitionFetcher, PendingPartition};
pub use stream::{RowStream, StreamPhase};
