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

use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use std::io::Cursor;
use std::sync::Arc;

use super::TabularEncoding;
use crate::storage::error::StorageResult;

/// Rows sampled for schema inference when none is configured.
const DEFAULT_INFER_ROWS: usize = 1000;

/// Delimited text with a header row.
///
/// Reading infers the schema from the first `infer_rows` records, so integer
/// columns come back as `Int64`, floats as `Float64` and text as `Utf8`.
#[derive(Debug, Clone)]
pub struct CsvEncoding {
    pub delimiter: u8,
    pub has_header: bool,
    pub infer_rows: usize,
}

impl Default for CsvEncoding {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            infer_rows: DEFAULT_INFER_ROWS,
        }
    }
}

impl CsvEncoding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_infer_rows(mut self, infer_rows: usize) -> Self {
        self.infer_rows = infer_rows.max(1);
        self
    }
}

impl TabularEncoding for CsvEncoding {
    fn encode(&self, batch: &RecordBatch) -> StorageResult<Bytes> {
        let mut writer = WriterBuilder::new()
            .with_header(self.has_header)
            .with_delimiter(self.delimiter)
            .build(Vec::new());
        writer.write(batch)?;
        Ok(Bytes::from(writer.into_inner()))
    }

    fn decode(&self, data: &[u8]) -> StorageResult<RecordBatch> {
        let (schema, _) = Format::default()
            .with_header(self.has_header)
            .with_delimiter(self.delimiter)
            .infer_schema(Cursor::new(data), Some(self.infer_rows))?;
        let schema = Arc::new(schema);

        let reader = ReaderBuilder::new(Arc::clone(&schema))
            .with_header(self.has_header)
            .with_delimiter(self.delimiter)
            .build(Cursor::new(data))?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;

        Ok(concat_batches(&schema, &batches)?)
    }

    fn content_type(&self) -> &'static str {
        if self.delimiter == b'\t' {
            "text/tab-separated-values"
        } else {
            "text/csv"
        }
    }
}
