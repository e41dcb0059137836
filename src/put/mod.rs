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

//! Existence-gated upload
//!
//! [`IdempotentPut`] probes a target and writes only when the backend confirms
//! the target is absent. A failed probe is never read as "absent": it stops the
//! put before any write and surfaces as [`StorageError::ProbeFailed`].
//!
//! Probe and write are two separate requests. With
//! [`PutConsistency::AllowOverwriteRace`] two concurrent callers may both see
//! the target missing and both upload, the last write wins. With
//! [`PutConsistency::RequireConditionalPut`] the write is create-only and the
//! loser of such a race gets [`PutOutcome::AlreadyExists`].

pub mod observer;

pub use observer::{PutEvent, PutObserver, TracingObserver};

use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;

use crate::storage::config::PutConsistency;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::provider::{Probe, StorageProvider, WriteOptions};
use crate::storage::target::StorageTarget;
use crate::tabular::{CsvEncoding, TabularEncoding};
use crate::util::timing::timed;

/// What to upload.
#[derive(Debug, Clone)]
pub enum PutSource {
    /// A ready object body
    Bytes(Bytes),
    /// A local file, read only once the target is known to be absent
    File(PathBuf),
    /// A table, serialized only once the target is known to be absent
    Table(RecordBatch),
}

impl From<Bytes> for PutSource {
    fn from(bytes: Bytes) -> Self {
        PutSource::Bytes(bytes)
    }
}

impl From<RecordBatch> for PutSource {
    fn from(batch: RecordBatch) -> Self {
        PutSource::Table(batch)
    }
}

/// Result of a put that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The target already existed; nothing was written
    AlreadyExists,
    /// The source was written to the target
    Uploaded,
}

/// Probe-then-write upload.
#[derive(Clone)]
pub struct IdempotentPut {
    provider: Arc<dyn StorageProvider>,
    encoding: Arc<dyn TabularEncoding>,
    consistency: PutConsistency,
    observer: Arc<dyn PutObserver>,
}

impl IdempotentPut {
    /// CSV tables, plain writes, events to `tracing`.
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self {
            provider,
            encoding: Arc::new(CsvEncoding::default()),
            consistency: PutConsistency::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_encoding(mut self, encoding: Arc<dyn TabularEncoding>) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_consistency(mut self, consistency: PutConsistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PutObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn consistency(&self) -> PutConsistency {
        self.consistency
    }

    /// Upload `source` to `target` unless the target already exists.
    ///
    /// # Returns
    ///
    /// * `Ok(PutOutcome::AlreadyExists)` - The probe found the target, or a create-only
    ///   write lost to a concurrent writer. No content comparison is made.
    /// * `Ok(PutOutcome::Uploaded)` - The target was absent and exactly one write succeeded
    ///
    /// # Errors
    ///
    /// * `ProbeFailed` - The probe failed (permission, network, ...); nothing was written
    /// * `SerializationError` / `IoError` - The source could not be turned into bytes;
    ///   nothing was written
    /// * `WriteFailed` - The write failed after absence was confirmed; not retried
    pub async fn put(&self, target: &StorageTarget, source: PutSource) -> StorageResult<PutOutcome> {
        self.observer.on_event(target, &PutEvent::ProbeStarted);

        match self.provider.probe(target).await {
            Ok(Probe::Found(meta)) => {
                self.observer
                    .on_event(target, &PutEvent::Found { size: meta.size });
                return Ok(PutOutcome::AlreadyExists);
            }
            Ok(Probe::Missing) => self.observer.on_event(target, &PutEvent::Missing),
            Err(error) => {
                self.observer
                    .on_event(target, &PutEvent::ProbeFailed { error: &error });
                return Err(StorageError::ProbeFailed {
                    target: target.to_string(),
                    source: Box::new(error),
                });
            }
        }

        let (payload, content_type) = self.materialize(source).await?;
        let bytes = payload.len();
        self.observer
            .on_event(target, &PutEvent::Serialized { bytes });

        let create_only = self.consistency == PutConsistency::RequireConditionalPut;
        let options = WriteOptions {
            create_only,
            content_type,
        };
        let (result, elapsed) = timed(self.provider.put_object(target, payload, options)).await;

        match result {
            Ok(()) => {
                self.observer
                    .on_event(target, &PutEvent::Uploaded { bytes, elapsed });
                Ok(PutOutcome::Uploaded)
            }
            Err(error) if create_only && error.is_already_exists() => {
                self.observer.on_event(target, &PutEvent::LostRace);
                Ok(PutOutcome::AlreadyExists)
            }
            Err(error) => {
                self.observer
                    .on_event(target, &PutEvent::WriteFailed { error: &error });
                Err(StorageError::WriteFailed {
                    target: target.to_string(),
                    source: Box::new(error),
                })
            }
        }
    }

    /// Payload bytes, plus a content type when the put serialized a table.
    async fn materialize(
        &self,
        source: PutSource,
    ) -> StorageResult<(Bytes, Option<&'static str>)> {
        match source {
            PutSource::Bytes(bytes) => Ok((bytes, None)),
            PutSource::File(path) => Ok((Bytes::from(tokio::fs::read(&path).await?), None)),
            PutSource::Table(batch) => Ok((
                self.encoding.encode(&batch)?,
                Some(self.encoding.content_type()),
            )),
        }
    }
}
