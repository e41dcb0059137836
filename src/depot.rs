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

//! Caller-facing storage surface.
//!
//! Pass-through operations collapse every failure into a sentinel (`false`,
//! `None`, an empty `Vec`) and log the cause with `tracing::warn!`. Uploads
//! go through [`IdempotentPut`] and keep their typed errors.

use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::put::{IdempotentPut, PutObserver, PutOutcome, PutSource, TracingObserver};
use crate::storage::config::{PutConsistency, StorageConfig};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::factory::StorageProviderFactory;
use crate::storage::provider::{ObjectMetadata, StorageProvider};
use crate::storage::target::StorageTarget;
use crate::tabular::{CsvEncoding, TabularEncoding};
use crate::util::timing::measure_dur_async;

/// Builder for creating a `Depot` instance.
///
/// # Examples
///
/// ```no_run
/// use lake_depot::{Depot, StorageConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let config = StorageConfig::local().with_option("path", "/data");
/// let depot = Depot::builder(config).build().await?;
/// # Ok(())
/// # }
/// ```
pub struct DepotBuilder {
    config: StorageConfig,
    provider: Option<Arc<dyn StorageProvider>>,
    encoding: Option<Arc<dyn TabularEncoding>>,
    observer: Option<Arc<dyn PutObserver>>,
    consistency: Option<PutConsistency>,
}

impl DepotBuilder {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            provider: None,
            encoding: None,
            observer: None,
            consistency: None,
        }
    }

    /// Use an already built provider instead of creating one from the configuration.
    pub fn with_provider(mut self, provider: Arc<dyn StorageProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Serialization used by `write_table` and `read_table`. Defaults to CSV.
    pub fn with_encoding(mut self, encoding: Arc<dyn TabularEncoding>) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Receiver of put events. Defaults to [`TracingObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn PutObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Overrides the `put_consistency` option.
    pub fn with_consistency(mut self, consistency: PutConsistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    /// Builds the `Depot`, creating the storage provider once.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the storage provider
    /// cannot be initialized.
    pub async fn build(self) -> StorageResult<Depot> {
        let consistency = match self.consistency {
            Some(consistency) => consistency,
            None => self.config.put_consistency()?,
        };
        let provider = match self.provider {
            Some(provider) => provider,
            None => StorageProviderFactory::from_config(self.config).await?,
        };
        let encoding = self
            .encoding
            .unwrap_or_else(|| Arc::new(CsvEncoding::default()));
        let observer = self.observer.unwrap_or_else(|| Arc::new(TracingObserver));

        let put = IdempotentPut::new(Arc::clone(&provider))
            .with_encoding(Arc::clone(&encoding))
            .with_consistency(consistency)
            .with_observer(observer);

        Ok(Depot {
            provider,
            encoding,
            put,
        })
    }
}

/// Containers, objects and tables on one storage backend.
///
/// `Depot` is `Send + Sync` and can be shared behind an `Arc`. It does not
/// serialize concurrent calls.
pub struct Depot {
    provider: Arc<dyn StorageProvider>,
    encoding: Arc<dyn TabularEncoding>,
    put: IdempotentPut,
}

impl Depot {
    pub fn builder(config: StorageConfig) -> DepotBuilder {
        DepotBuilder::new(config)
    }

    pub fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    pub fn consistency(&self) -> PutConsistency {
        self.put.consistency()
    }

    /// Check credentials and connectivity with one cheap call.
    pub async fn validate_connection(&self) -> StorageResult<()> {
        self.provider.validate_connection().await
    }

    /// Backend URI of an object, `None` for an invalid container or key.
    pub fn uri_for(&self, container: &str, key: &str) -> Option<String> {
        StorageTarget::new(container, key)
            .ok()
            .map(|target| self.provider.uri_for(&target))
    }

    pub async fn create_container(&self, name: &str) -> bool {
        let result = measure_dur_async(
            "create_container",
            || self.provider.create_container(name),
            None,
        )
        .await;
        sentinel("create_container", name, result.map(|_| true), false)
    }

    /// Create `name`, or `{name}-{YYYYMMDD}` (UTC) when `name` is already taken.
    ///
    /// Returns the name actually created.
    pub async fn create_container_unique(&self, name: &str) -> Option<String> {
        let existing = match self.provider.list_containers().await {
            Ok(existing) => existing,
            Err(e) => {
                warn!("create_container_unique failed for {}: {}", name, e);
                return None;
            }
        };

        let candidate = unique_container_name(name, &existing, Utc::now().date_naive());
        if self.create_container(&candidate).await {
            Some(candidate)
        } else {
            None
        }
    }

    pub async fn delete_container(&self, name: &str) -> bool {
        let result = measure_dur_async(
            "delete_container",
            || self.provider.delete_container(name),
            None,
        )
        .await;
        sentinel("delete_container", name, result.map(|_| true), false)
    }

    pub async fn list_containers(&self) -> Vec<String> {
        let result = measure_dur_async(
            "list_containers",
            || self.provider.list_containers(),
            Some(|names: &Vec<String>| format!("count={}", names.len())),
        )
        .await;
        sentinel("list_containers", "*", result, Vec::new())
    }

    /// Keys of every object in `container`, sorted.
    pub async fn list_objects(&self, container: &str) -> Vec<String> {
        let result = measure_dur_async(
            "list_objects",
            || self.provider.list_objects(container, None),
            Some(|objects: &Vec<ObjectMetadata>| format!("count={}", objects.len())),
        )
        .await
        .map(|objects| objects.into_iter().map(|meta| meta.key).collect());
        sentinel("list_objects", container, result, Vec::new())
    }

    pub async fn object_metadata(&self, container: &str, key: &str) -> Option<ObjectMetadata> {
        let result = match StorageTarget::new(container, key) {
            Ok(target) => self.provider.get_metadata(&target).await.map(Some),
            Err(e) => Err(e),
        };
        sentinel("object_metadata", &subject(container, key), result, None)
    }

    pub async fn read_bytes(&self, container: &str, key: &str) -> Option<Bytes> {
        let result = match StorageTarget::new(container, key) {
            Ok(target) => self.read_target(&target).await.map(Some),
            Err(e) => Err(e),
        };
        sentinel("read_bytes", &subject(container, key), result, None)
    }

    /// Read an object written by `write_table` (or any body the encoding understands).
    pub async fn read_table(&self, container: &str, key: &str) -> Option<RecordBatch> {
        let result = match StorageTarget::new(container, key) {
            Ok(target) => match self.read_target(&target).await {
                Ok(bytes) => self.encoding.decode(&bytes).map(Some),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        sentinel("read_table", &subject(container, key), result, None)
    }

    /// Save an object to a local file, replacing the file if it exists.
    pub async fn download(&self, container: &str, key: &str, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let result = match StorageTarget::new(container, key) {
            Ok(target) => self.download_target(&target, path).await,
            Err(e) => Err(e),
        };
        sentinel("download", &subject(container, key), result.map(|_| true), false)
    }

    /// Copy an object, possibly into another container, replacing the destination.
    pub async fn copy_object(
        &self,
        src_container: &str,
        src_key: &str,
        dst_container: &str,
        dst_key: &str,
    ) -> bool {
        let result = match (
            StorageTarget::new(src_container, src_key),
            StorageTarget::new(dst_container, dst_key),
        ) {
            (Ok(from), Ok(to)) => {
                measure_dur_async("copy_object", || self.provider.copy_object(&from, &to), None)
                    .await
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        sentinel(
            "copy_object",
            &subject(src_container, src_key),
            result.map(|_| true),
            false,
        )
    }

    pub async fn delete_object(&self, container: &str, key: &str) -> bool {
        let result = match StorageTarget::new(container, key) {
            Ok(target) => self.provider.delete_object(&target).await,
            Err(e) => Err(e),
        };
        sentinel(
            "delete_object",
            &subject(container, key),
            result.map(|_| true),
            false,
        )
    }

    /// Upload `source` unless `container/key` already exists.
    ///
    /// # Errors
    ///
    /// `InvalidTarget` for a malformed container or key, otherwise see
    /// [`IdempotentPut::put`].
    pub async fn put(
        &self,
        container: &str,
        key: &str,
        source: PutSource,
    ) -> StorageResult<PutOutcome> {
        let target = StorageTarget::new(container, key)?;
        self.put.put(&target, source).await
    }

    /// Upload a local file unless the target already exists.
    pub async fn upload_file(
        &self,
        container: &str,
        key: &str,
        path: impl AsRef<Path>,
    ) -> StorageResult<PutOutcome> {
        self.put(container, key, PutSource::File(path.as_ref().to_path_buf()))
            .await
    }

    /// Serialize and upload a table unless the target already exists.
    pub async fn write_table(
        &self,
        container: &str,
        key: &str,
        table: RecordBatch,
    ) -> StorageResult<PutOutcome> {
        self.put(container, key, PutSource::Table(table)).await
    }

    async fn read_target(&self, target: &StorageTarget) -> StorageResult<Bytes> {
        measure_dur_async(
            "read_object",
            || self.provider.read_object(target),
            Some(|bytes: &Bytes| format!("size={}", bytes.len())),
        )
        .await
    }

    async fn download_target(&self, target: &StorageTarget, path: &Path) -> StorageResult<()> {
        let bytes = self.read_target(target).await?;
        tokio::fs::write(path, &bytes).await?;
        Ok(())
    }
}

/// `name` if free, otherwise `name` suffixed with `today` as `-YYYYMMDD`.
fn unique_container_name(name: &str, existing: &[String], today: NaiveDate) -> String {
    if existing.iter().any(|c| c == name) {
        format!("{}-{}", name, today.format("%Y%m%d"))
    } else {
        name.to_string()
    }
}

fn subject(container: &str, key: &str) -> String {
    format!("{}/{}", container, key)
}

fn sentinel<T>(operation: &str, subject: &str, result: StorageResult<T>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            log_failure(operation, subject, &e);
            fallback
        }
    }
}

fn log_failure(operation: &str, subject: &str, error: &StorageError) {
    if error.is_not_found() || error.is_container_not_found() {
        warn!("{} | {} not found: {}", operation, subject, error);
    } else {
        warn!("{} | {} failed: {}", operation, subject, error);
    }
}
