// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Tabular serialization
//!
//! Tables travel as Arrow [`RecordBatch`]es. A [`TabularEncoding`] turns a batch
//! into the bytes stored in an object and reads those bytes back.

pub mod csv;

pub use self::csv::CsvEncoding;

use arrow::datatypes::SchemaRef;
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::json::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use std::sync::Arc;

use crate::storage::error::StorageResult;

/// Serialization strategy for tables written to and read from storage.
pub trait TabularEncoding: Send + Sync {
    /// Serialize a batch into the full object body.
    fn encode(&self, batch: &RecordBatch) -> StorageResult<Bytes>;

    /// Parse an object body back into a single batch.
    fn decode(&self, data: &[u8]) -> StorageResult<RecordBatch>;

    /// MIME type of the encoded body.
    fn content_type(&self) -> &'static str;
}

/// Build a batch from JSON objects, one object per row.
///
/// Column types are inferred from the values (integers become `Int64`).
pub fn rows_to_batch(rows: &[serde_json::Value]) -> StorageResult<RecordBatch> {
    let schema: SchemaRef = Arc::new(infer_json_schema_from_iterator(
        rows.iter().map(Ok::<_, arrow::error::ArrowError>),
    )?);

    let mut decoder = ReaderBuilder::new(Arc::clone(&schema)).build_decoder()?;
    decoder.serialize(rows)?;

    match decoder.flush()? {
        Some(batch) => Ok(batch),
        None => Ok(RecordBatch::new_empty(schema)),
    }
}
