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

use super::config::{StorageConfig, StorageType, CLIENT_OPTION_KEYS};
use super::error::{StorageError, StorageResult};
use super::provider::{string_to_path, ObjectMetadata, Probe, StorageProvider, WriteOptions};
use super::s3::S3BucketAdmin;
use super::target::{validate_container_name, StorageTarget};
use crate::util::retry::retry_with_max_retries;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{
    aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory, Attribute, AttributeValue,
    ClientOptions, ObjectMeta, ObjectStore, ObjectStoreExt, PutMode, PutOptions, PutPayload,
    RetryConfig,
};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Where container lifecycle calls go for each storage type.
enum ContainerBackend {
    /// Containers are sub-directories of `root`
    Local { root: PathBuf },
    /// Containers are the entries of the provider's store map
    Memory,
    /// Containers are S3 buckets
    Aws { admin: S3BucketAdmin },
}

/// Storage provider built on `object_store`, with one store per container
pub struct ObjectStoreProvider {
    pub config: StorageConfig,
    pub base_path: String,
    containers: ContainerBackend,
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl ObjectStoreProvider {
    /// Create a new storage provider from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Storage configuration specifying the storage type and options
    ///
    /// # Returns
    ///
    /// A `Result` containing:
    /// * `Ok(ObjectStoreProvider)` - A configured storage provider ready to use
    /// * `Err(StorageError)` - If the storage backend cannot be initialized
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The storage configuration is invalid
    /// * The local root path is missing or not a directory
    /// * The AWS options are inconsistent (half a credential pair, bad endpoint URL)
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        config.put_consistency()?;

        let (containers, base_path) = match config.storage_type {
            StorageType::Local => {
                let root = Self::resolve_local_root(&config)?;
                let base_path = root.to_string_lossy().to_string();
                (ContainerBackend::Local { root }, base_path)
            }
            StorageType::Memory => (ContainerBackend::Memory, "memory://".to_string()),
            StorageType::Aws => {
                let admin = S3BucketAdmin::new(&config)?;
                let base_path = match config.get_option("endpoint") {
                    Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
                    None => "s3://".to_string(),
                };
                (ContainerBackend::Aws { admin }, base_path)
            }
        };

        info!(
            "Initialized storage provider type={} base_path={}",
            config.storage_type_str(),
            base_path
        );

        Ok(Self {
            config,
            base_path,
            containers,
            stores: RwLock::new(HashMap::new()),
        })
    }

    /// Resolve the local root directory.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The 'path' option is missing from configuration
    /// * The path cannot be canonicalized (doesn't exist or permission denied)
    /// * The path is not a directory
    fn resolve_local_root(config: &StorageConfig) -> StorageResult<PathBuf> {
        let path = config.options.get("path").ok_or_else(|| {
            StorageError::ConfigError("Local storage requires 'path' option".to_string())
        })?;

        // Canonicalize the path (handles both relative and absolute paths, resolves symlinks)
        let canonical_path = PathBuf::from(path).canonicalize().map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to resolve path '{}': {} (path must exist)",
                path, e
            ))
        })?;

        if !canonical_path.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "Base path is not a directory: {}",
                canonical_path.display()
            )));
        }

        Ok(canonical_path)
    }

    /// Parse a seconds option, `None` when it is "0"/"disabled", unset or not a number.
    fn seconds_option(config: &StorageConfig, key: &str) -> Option<Option<Duration>> {
        let value = config.options.get(key)?;
        if value == "0" || value == "disabled" {
            return Some(None);
        }
        value
            .parse::<u64>()
            .ok()
            .map(|secs| Some(Duration::from_secs(secs)))
    }

    /// Build connection options from configuration.
    ///
    /// Unparseable values are ignored and the `object_store` defaults apply.
    fn build_connection_options(config: &StorageConfig) -> ClientOptions {
        let mut client_options = ClientOptions::default();
        match Self::seconds_option(config, "timeout") {
            Some(Some(timeout)) => client_options = client_options.with_timeout(timeout),
            Some(None) => client_options = client_options.with_timeout_disabled(),
            None => (),
        }
        match Self::seconds_option(config, "connect_timeout") {
            Some(Some(timeout)) => client_options = client_options.with_connect_timeout(timeout),
            Some(None) => client_options = client_options.with_connect_timeout_disabled(),
            None => (),
        }
        if let Some(Some(idle)) = Self::seconds_option(config, "pool_idle_timeout") {
            client_options = client_options.with_pool_idle_timeout(idle);
        }
        if let Some(max_idle) = config
            .options
            .get("pool_max_idle_per_host")
            .and_then(|s| s.parse::<usize>().ok())
        {
            client_options = client_options.with_pool_max_idle_per_host(max_idle);
        }
        client_options
    }

    /// Build the `object_store` HTTP retry policy from configuration.
    fn build_retry_options(config: &StorageConfig) -> RetryConfig {
        let default_retry_config = RetryConfig::default();
        let max_retries = config
            .options
            .get("max_retries")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(default_retry_config.max_retries);
        let retry_timeout = match Self::seconds_option(config, "retry_timeout") {
            Some(Some(timeout)) => timeout,
            _ => default_retry_config.retry_timeout,
        };
        RetryConfig {
            backoff: Default::default(),
            max_retries,
            retry_timeout,
        }
    }

    /// Build an AWS S3 store scoped to one bucket.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the S3 store cannot be initialized.
    fn build_aws_store(config: &StorageConfig, bucket: &str) -> StorageResult<Box<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(config.region())
            .with_client_options(Self::build_connection_options(config))
            .with_retry(Self::build_retry_options(config));

        for (key, value) in &config.options {
            match key.as_str() {
                "access_key_id" => builder = builder.with_access_key_id(value),
                "secret_access_key" => builder = builder.with_secret_access_key(value),
                "session_token" | "token" => builder = builder.with_token(value),
                "endpoint" => {
                    // Path-style addressing, the bucket is not part of the host
                    builder = builder
                        .with_endpoint(value)
                        .with_virtual_hosted_style_request(false);
                }
                "allow_http" => {
                    if value.to_lowercase() == "true" {
                        builder = builder.with_allow_http(true);
                    }
                }
                "region" => (),
                k if CLIENT_OPTION_KEYS.contains(&k) => (),
                _ => {
                    tracing::warn!("Unknown AWS S3 option: {}", key);
                }
            }
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create S3 store: {}", e)))?;

        Ok(Box::new(store))
    }

    fn read_stores(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn ObjectStore>>> {
        self.stores.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_stores(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn ObjectStore>>> {
        self.stores.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get (or lazily build) the store addressing one container.
    ///
    /// # Errors
    ///
    /// `ContainerNotFound` for local and memory containers that do not exist.
    fn store_for(&self, container: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        validate_container_name(container)?;

        if let ContainerBackend::Local { root } = &self.containers {
            if !root.join(container).is_dir() {
                self.write_stores().remove(container);
                return Err(StorageError::ContainerNotFound(container.to_string()));
            }
        }

        if let Some(store) = self.read_stores().get(container) {
            return Ok(Arc::clone(store));
        }

        let store: Arc<dyn ObjectStore> = match &self.containers {
            ContainerBackend::Local { root } => {
                let store = LocalFileSystem::new_with_prefix(root.join(container)).map_err(|e| {
                    StorageError::ConfigError(format!("Failed to create local store: {}", e))
                })?;
                Arc::new(store)
            }
            ContainerBackend::Memory => {
                return Err(StorageError::ContainerNotFound(container.to_string()))
            }
            ContainerBackend::Aws { .. } => Arc::from(Self::build_aws_store(&self.config, container)?),
        };

        debug!("Opened store for container={}", container);
        Ok(Arc::clone(
            self.write_stores()
                .entry(container.to_string())
                .or_insert(store),
        ))
    }

    /// Object path for a key on this backend.
    ///
    /// The local filesystem store percent-encodes reserved characters (`#`, `%`,
    /// `[`, `|`, ...) when it lists files, so such keys are rejected there instead
    /// of coming back under a different name.
    fn object_path(&self, key: &str) -> StorageResult<ObjectPath> {
        let path = string_to_path(key)?;
        if matches!(self.containers, ContainerBackend::Local { .. })
            && ObjectPath::from(key).as_ref() != key
        {
            return Err(StorageError::InvalidTarget(format!(
                "object key '{}' has characters the local filesystem store cannot list back",
                key
            )));
        }
        Ok(path)
    }

    /// Extra attempts for read-only listings.
    ///
    /// On S3 each HTTP request is already retried by `object_store` and the AWS
    /// SDK, so the listing itself is not repeated there.
    fn list_retries(&self) -> usize {
        match self.containers {
            ContainerBackend::Aws { .. } => 0,
            _ => self.config.list_retries(),
        }
    }

    /// Retry wrapper for read-only operations that may fail due to transient faults.
    async fn retry_operation<F, Fut, T>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> StorageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        retry_with_max_retries(self.list_retries(), operation_name, operation).await
    }

    /// Fill in the target on errors that `object_store` reports by key only.
    fn object_error(err: object_store::Error, target: &StorageTarget) -> StorageError {
        match StorageError::from(err) {
            StorageError::NotFound { .. } => StorageError::NotFound {
                container: target.container().to_string(),
                key: target.key().to_string(),
            },
            StorageError::AlreadyExists(_) => StorageError::AlreadyExists(target.to_string()),
            other => other,
        }
    }

    fn to_metadata(container: &str, meta: ObjectMeta) -> ObjectMetadata {
        ObjectMetadata {
            container: container.to_string(),
            key: meta.location.to_string(),
            size: meta.size,
            last_modified: Some(meta.last_modified),
            e_tag: meta.e_tag,
            version: meta.version,
        }
    }
}

#[async_trait]
impl StorageProvider for ObjectStoreProvider {
    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn validate_connection(&self) -> StorageResult<()> {
        match &self.containers {
            ContainerBackend::Local { root } => {
                if root.is_dir() {
                    Ok(())
                } else {
                    Err(StorageError::ConnectionError(format!(
                        "Base path is not accessible: {}",
                        root.display()
                    )))
                }
            }
            ContainerBackend::Memory => Ok(()),
            ContainerBackend::Aws { admin } => {
                admin.list_buckets().await.map_err(|e| {
                    if e.is_access_denied() {
                        e
                    } else {
                        StorageError::ConnectionError(e.to_string())
                    }
                })?;
                Ok(())
            }
        }
    }

    async fn create_container(&self, container: &str) -> StorageResult<()> {
        validate_container_name(container)?;

        match &self.containers {
            ContainerBackend::Local { root } => {
                let dir = root.join(container);
                if dir.exists() {
                    return Err(StorageError::ContainerAlreadyExists(container.to_string()));
                }
                tokio::fs::create_dir(&dir).await?;
            }
            ContainerBackend::Memory => {
                let mut stores = self.write_stores();
                if stores.contains_key(container) {
                    return Err(StorageError::ContainerAlreadyExists(container.to_string()));
                }
                stores.insert(container.to_string(), Arc::new(InMemory::new()));
            }
            ContainerBackend::Aws { admin } => admin.create_bucket(container).await?,
        }

        info!("Created container={}", container);
        Ok(())
    }

    async fn delete_container(&self, container: &str) -> StorageResult<()> {
        match &self.containers {
            ContainerBackend::Local { root } => {
                if !self.list_objects(container, None).await?.is_empty() {
                    return Err(StorageError::ContainerNotEmpty(container.to_string()));
                }
                tokio::fs::remove_dir_all(root.join(container)).await?;
            }
            ContainerBackend::Memory => {
                if !self.list_objects(container, None).await?.is_empty() {
                    return Err(StorageError::ContainerNotEmpty(container.to_string()));
                }
            }
            ContainerBackend::Aws { admin } => admin.delete_bucket(container).await?,
        }

        self.write_stores().remove(container);
        info!("Deleted container={}", container);
        Ok(())
    }

    async fn list_containers(&self) -> StorageResult<Vec<String>> {
        match &self.containers {
            ContainerBackend::Local { root } => {
                let mut names = Vec::new();
                let mut entries = tokio::fs::read_dir(root).await?;
                while let Some(entry) = entries.next_entry().await? {
                    if entry.file_type().await?.is_dir() {
                        names.push(entry.file_name().to_string_lossy().to_string());
                    }
                }
                names.sort();
                Ok(names)
            }
            ContainerBackend::Memory => {
                let mut names: Vec<String> = self.read_stores().keys().cloned().collect();
                names.sort();
                Ok(names)
            }
            ContainerBackend::Aws { admin } => {
                self.retry_operation("list_containers", || admin.list_buckets())
                    .await
            }
        }
    }

    async fn probe(&self, target: &StorageTarget) -> StorageResult<Probe> {
        let store = self.store_for(target.container())?;
        match store.head(&self.object_path(target.key())?).await {
            Ok(meta) => Ok(Probe::Found(Self::to_metadata(target.container(), meta))),
            Err(object_store::Error::NotFound { .. }) => Ok(Probe::Missing),
            Err(e) => Err(Self::object_error(e, target)),
        }
    }

    async fn put_object(
        &self,
        target: &StorageTarget,
        payload: Bytes,
        options: WriteOptions,
    ) -> StorageResult<()> {
        let store = self.store_for(target.container())?;
        let path = self.object_path(target.key())?;
        let size = payload.len();

        let mut put_options = PutOptions::default();
        if options.create_only {
            put_options.mode = PutMode::Create;
        }
        // LocalFileSystem rejects writes carrying attributes
        if let Some(content_type) = options.content_type {
            if !matches!(self.containers, ContainerBackend::Local { .. }) {
                put_options
                    .attributes
                    .insert(Attribute::ContentType, AttributeValue::from(content_type));
            }
        }

        store
            .put_opts(&path, PutPayload::from(payload), put_options)
            .await
            .map_err(|e| Self::object_error(e, target))?;

        info!(
            "Put key={} container={} size={} create_only={}",
            target.key(),
            target.container(),
            size,
            options.create_only
        );
        Ok(())
    }

    async fn read_object(&self, target: &StorageTarget) -> StorageResult<Bytes> {
        let store = self.store_for(target.container())?;
        let path = self.object_path(target.key())?;
        let result = store
            .get(&path)
            .await
            .map_err(|e| Self::object_error(e, target))?;
        result
            .bytes()
            .await
            .map_err(|e| Self::object_error(e, target))
    }

    async fn delete_object(&self, target: &StorageTarget) -> StorageResult<()> {
        let store = self.store_for(target.container())?;
        match store.delete(&self.object_path(target.key())?).await {
            Ok(()) => {
                info!("Deleted key={} container={}", target.key(), target.container());
                Ok(())
            }
            // Deleting an absent key is a no-op, as on S3
            Err(object_store::Error::NotFound { .. }) => {
                debug!(
                    "Delete of absent key={} container={}",
                    target.key(),
                    target.container()
                );
                Ok(())
            }
            Err(e) => Err(Self::object_error(e, target)),
        }
    }

    async fn copy_object(&self, from: &StorageTarget, to: &StorageTarget) -> StorageResult<()> {
        if from.container() == to.container() {
            let store = self.store_for(from.container())?;
            store
                .copy(&self.object_path(from.key())?, &self.object_path(to.key())?)
                .await
                .map_err(|e| Self::object_error(e, from))?;
        } else if let ContainerBackend::Aws { admin } = &self.containers {
            admin.copy_object(from, to).await?;
        } else {
            let destination = self.store_for(to.container())?;
            let to_path = self.object_path(to.key())?;
            let bytes = self.read_object(from).await?;
            destination
                .put(&to_path, PutPayload::from(bytes))
                .await
                .map_err(|e| Self::object_error(e, to))?;
        }

        info!("Copied from={} to={}", from, to);
        Ok(())
    }

    async fn list_objects(
        &self,
        container: &str,
        prefix: Option<&str>,
    ) -> StorageResult<Vec<ObjectMetadata>> {
        let store = self.store_for(container)?;
        let prefix_path = match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => Some(self.object_path(prefix)?),
            None => None,
        };

        let mut objects = self
            .retry_operation(&format!("list_objects({})", container), || async {
                let mut objects = Vec::new();
                let mut stream = store.list(prefix_path.as_ref());

                while let Some(meta) = stream.next().await {
                    objects.push(Self::to_metadata(container, meta?));
                }

                Ok(objects)
            })
            .await?;
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        debug!(
            "Listed count={} objects in container={}",
            objects.len(),
            container
        );
        Ok(objects)
    }

    fn uri_for(&self, target: &StorageTarget) -> String {
        match &self.containers {
            ContainerBackend::Local { root } => {
                // file:// URIs use forward slashes and three slashes before the path,
                // also for Windows paths which canonicalize() prefixes with \\?\
                let path = root
                    .join(target.container())
                    .join(target.key())
                    .to_string_lossy()
                    .replace('\\', "/");
                let path = path.strip_prefix("//?/").unwrap_or(&path);
                format!("file:///{}", path.trim_start_matches('/'))
            }
            ContainerBackend::Memory => format!("memory://{}", target),
            ContainerBackend::Aws { .. } => {
                if self.base_path == "s3://" {
                    format!("s3://{}", target)
                } else {
                    format!("{}/{}", self.base_path, target)
                }
            }
        }
    }
}

impl Debug for ObjectStoreProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StorageProvider(type=object_store, storage_type={}, options={:?})",
            self.config.storage_type_str(),
            self.config.clean_options()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn target(container: &str, key: &str) -> StorageTarget {
        StorageTarget::new(container, key).unwrap()
    }

    async fn memory_provider_with(containers: &[&str]) -> ObjectStoreProvider {
        let provider = ObjectStoreProvider::new(StorageConfig::memory())
            .await
            .unwrap();
        for container in containers {
            provider.create_container(container).await.unwrap();
        }
        provider
    }

    async fn local_provider(temp_dir: &TempDir) -> ObjectStoreProvider {
        let config = StorageConfig::local().with_option("path", temp_dir.path().to_str().unwrap());
        ObjectStoreProvider::new(config).await.unwrap()
    }

    #[test]
    fn test_build_connection_options_variants() {
        let configs = [
            StorageConfig::local(),
            StorageConfig::local()
                .with_option("timeout", "60")
                .with_option("connect_timeout", "10"),
            StorageConfig::local()
                .with_option("timeout", "disabled")
                .with_option("connect_timeout", "0"),
            StorageConfig::local()
                .with_option("timeout", "invalid")
                .with_option("pool_max_idle_per_host", "not_a_number"),
        ];
        for config in &configs {
            // Must not panic on any of these
            let _options = ObjectStoreProvider::build_connection_options(config);
        }
    }

    #[test]
    fn test_seconds_option() {
        let config = StorageConfig::local()
            .with_option("a", "30")
            .with_option("b", "disabled")
            .with_option("c", "soon");

        assert_eq!(
            ObjectStoreProvider::seconds_option(&config, "a"),
            Some(Some(Duration::from_secs(30)))
        );
        assert_eq!(ObjectStoreProvider::seconds_option(&config, "b"), Some(None));
        assert_eq!(ObjectStoreProvider::seconds_option(&config, "c"), None);
        assert_eq!(ObjectStoreProvider::seconds_option(&config, "d"), None);
    }

    #[test]
    fn test_build_retry_options_custom() {
        let config = StorageConfig::local()
            .with_option("max_retries", "5")
            .with_option("retry_timeout", "300");

        let retry_config = ObjectStoreProvider::build_retry_options(&config);
        assert_eq!(retry_config.max_retries, 5);
        assert_eq!(retry_config.retry_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_build_retry_options_invalid_values() {
        let config = StorageConfig::local()
            .with_option("max_retries", "invalid")
            .with_option("retry_timeout", "not_a_number");

        let retry_config = ObjectStoreProvider::build_retry_options(&config);
        assert_eq!(
            retry_config.max_retries,
            RetryConfig::default().max_retries
        );
    }

    #[test]
    fn test_build_aws_store() {
        let config = StorageConfig::aws()
            .with_option("region", "us-east-1")
            .with_option("access_key_id", "AKIDEXAMPLE")
            .with_option("secret_access_key", "secret")
            .with_option("endpoint", "http://localhost:9000")
            .with_option("allow_http", "true");

        assert!(ObjectStoreProvider::build_aws_store(&config, "docs").is_ok());
    }

    #[tokio::test]
    async fn test_new_local_provider_missing_path() {
        let provider = ObjectStoreProvider::new(StorageConfig::local()).await;
        match provider {
            Err(StorageError::ConfigError(msg)) => assert!(msg.contains("path")),
            _ => panic!("Expected ConfigError for missing path"),
        }
    }

    #[tokio::test]
    async fn test_new_local_provider_invalid_path() {
        let config = StorageConfig::local().with_option("path", "/nonexistent/invalid/path");
        match ObjectStoreProvider::new(config).await {
            Err(StorageError::ConfigError(msg)) => assert!(msg.contains("Failed to resolve path")),
            _ => panic!("Expected ConfigError"),
        }
    }

    #[tokio::test]
    async fn test_new_local_provider_file_not_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test_file.txt");
        fs::write(&file_path, "test content").unwrap();

        let config = StorageConfig::local().with_option("path", file_path.to_str().unwrap());
        match ObjectStoreProvider::new(config).await {
            Err(StorageError::ConfigError(msg)) => assert!(msg.contains("not a directory")),
            _ => panic!("Expected ConfigError for file instead of directory"),
        }
    }

    #[tokio::test]
    async fn test_new_rejects_bad_put_consistency() {
        let config = StorageConfig::memory().with_option("put_consistency", "maybe");
        assert!(ObjectStoreProvider::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_new_aws_provider_is_lazy() {
        let config = StorageConfig::aws()
            .with_option("region", "eu-west-1")
            .with_option("access_key_id", "AKIDEXAMPLE")
            .with_option("secret_access_key", "secret");
        let provider = ObjectStoreProvider::new(config).await.unwrap();

        assert_eq!(provider.base_path(), "s3://");
        assert_eq!(
            provider.uri_for(&target("docs", "a.csv")),
            "s3://docs/a.csv"
        );
    }

    #[tokio::test]
    async fn test_aws_uri_with_endpoint() {
        let config = StorageConfig::aws().with_option("endpoint", "http://localhost:9000/");
        let provider = ObjectStoreProvider::new(config).await.unwrap();

        assert_eq!(
            provider.uri_for(&target("docs", "a.csv")),
            "http://localhost:9000/docs/a.csv"
        );
    }

    #[tokio::test]
    async fn test_local_container_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let provider = local_provider(&temp_dir).await;

        provider.create_container("beta").await.unwrap();
        provider.create_container("alpha").await.unwrap();
        fs::write(temp_dir.path().join("stray.txt"), "not a container").unwrap();

        assert_eq!(
            provider.list_containers().await.unwrap(),
            vec!["alpha".to_string(), "beta".to_string()]
        );

        let duplicate = provider.create_container("alpha").await;
        assert!(matches!(
            duplicate,
            Err(StorageError::ContainerAlreadyExists(_))
        ));

        provider.delete_container("alpha").await.unwrap();
        assert!(!temp_dir.path().join("alpha").exists());
        assert_eq!(provider.list_containers().await.unwrap(), vec!["beta"]);
    }

    #[tokio::test]
    async fn test_local_delete_non_empty_container() {
        let temp_dir = TempDir::new().unwrap();
        let provider = local_provider(&temp_dir).await;
        provider.create_container("docs").await.unwrap();
        provider
            .put_object(&target("docs", "a.csv"), Bytes::from("x\n1\n"), WriteOptions::default())
            .await
            .unwrap();

        let result = provider.delete_container("docs").await;
        assert!(matches!(result, Err(StorageError::ContainerNotEmpty(_))));
        assert!(temp_dir.path().join("docs").is_dir());
    }

    #[tokio::test]
    async fn test_local_delete_missing_container() {
        let temp_dir = TempDir::new().unwrap();
        let provider = local_provider(&temp_dir).await;

        let result = provider.delete_container("ghost").await;
        assert!(matches!(result, Err(StorageError::ContainerNotFound(_))));
    }

    #[tokio::test]
    async fn test_local_put_read_probe() {
        let temp_dir = TempDir::new().unwrap();
        let provider = local_provider(&temp_dir).await;
        provider.create_container("docs").await.unwrap();
        let t = target("docs", "reports/a.csv");

        assert_eq!(provider.probe(&t).await.unwrap(), Probe::Missing);

        provider
            .put_object(&t, Bytes::from_static(b"Hello, World!"), WriteOptions::default())
            .await
            .unwrap();

        assert!(temp_dir.path().join("docs/reports/a.csv").is_file());
        match provider.probe(&t).await.unwrap() {
            Probe::Found(meta) => {
                assert_eq!(meta.container, "docs");
                assert_eq!(meta.key, "reports/a.csv");
                assert_eq!(meta.size, 13);
                assert!(meta.last_modified.is_some());
            }
            Probe::Missing => panic!("Expected object to be found"),
        }
        assert_eq!(
            provider.read_object(&t).await.unwrap(),
            Bytes::from_static(b"Hello, World!")
        );
    }

    #[tokio::test]
    async fn test_probe_missing_container_is_error() {
        let provider = memory_provider_with(&[]).await;

        let result = provider.probe(&target("ghost", "a.csv")).await;
        match result {
            Err(StorageError::ContainerNotFound(name)) => assert_eq!(name, "ghost"),
            other => panic!("Expected ContainerNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_missing_object() {
        let provider = memory_provider_with(&["docs"]).await;

        let err = provider
            .read_object(&target("docs", "nope.csv"))
            .await
            .unwrap_err();
        match err {
            StorageError::NotFound { container, key } => {
                assert_eq!(container, "docs");
                assert_eq!(key, "nope.csv");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_only_put_on_existing_object() {
        let provider = memory_provider_with(&["docs"]).await;
        let t = target("docs", "a.csv");

        provider
            .put_object(&t, Bytes::from_static(b"first"), WriteOptions::exclusive())
            .await
            .unwrap();
        let err = provider
            .put_object(&t, Bytes::from_static(b"second"), WriteOptions::exclusive())
            .await
            .unwrap_err();

        assert!(err.is_already_exists());
        assert_eq!(
            provider.read_object(&t).await.unwrap(),
            Bytes::from_static(b"first")
        );
    }

    #[tokio::test]
    async fn test_plain_put_overwrites() {
        let provider = memory_provider_with(&["docs"]).await;
        let t = target("docs", "a.csv");

        provider
            .put_object(&t, Bytes::from_static(b"first"), WriteOptions::default())
            .await
            .unwrap();
        provider
            .put_object(&t, Bytes::from_static(b"second"), WriteOptions::default())
            .await
            .unwrap();

        assert_eq!(
            provider.read_object(&t).await.unwrap(),
            Bytes::from_static(b"second")
        );
    }

    #[tokio::test]
    async fn test_listed_keys_address_their_objects() {
        let provider = memory_provider_with(&["docs"]).await;
        let keys = ["report#1.csv", "50%.csv", "q[1]|~draft.csv", "2024/a b.csv"];
        for key in keys {
            provider
                .put_object(
                    &target("docs", key),
                    Bytes::from(key.to_string()),
                    WriteOptions::default(),
                )
                .await
                .unwrap();
        }
        assert!(StorageTarget::new("docs", "a//b.csv").is_err());

        let listed: Vec<String> = provider
            .list_objects("docs", None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        let mut expected: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        expected.sort();
        assert_eq!(listed, expected);

        for key in &listed {
            let t = target("docs", key);
            assert_eq!(provider.read_object(&t).await.unwrap(), Bytes::from(key.clone()));
            provider.delete_object(&t).await.unwrap();
        }
        assert!(provider.list_objects("docs", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_rejects_keys_it_cannot_list_back() {
        let temp_dir = TempDir::new().unwrap();
        let provider = local_provider(&temp_dir).await;
        provider.create_container("docs").await.unwrap();

        let result = provider
            .put_object(
                &target("docs", "report#1.csv"),
                Bytes::from_static(b"x"),
                WriteOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(StorageError::InvalidTarget(_))));
        assert!(provider.list_objects("docs", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_content_type_is_stored() {
        let provider = memory_provider_with(&["docs"]).await;
        let t = target("docs", "a.csv");
        provider
            .put_object(
                &t,
                Bytes::from_static(b"x\n1\n"),
                WriteOptions::default().with_content_type("text/csv"),
            )
            .await
            .unwrap();

        let store = provider.store_for("docs").unwrap();
        let result = store.get(&string_to_path("a.csv").unwrap()).await.unwrap();
        assert_eq!(
            result.attributes.get(&Attribute::ContentType),
            Some(&AttributeValue::from("text/csv"))
        );
    }

    #[tokio::test]
    async fn test_local_write_ignores_content_type() {
        let temp_dir = TempDir::new().unwrap();
        let provider = local_provider(&temp_dir).await;
        provider.create_container("docs").await.unwrap();

        provider
            .put_object(
                &target("docs", "a.csv"),
                Bytes::from_static(b"x\n1\n"),
                WriteOptions::exclusive().with_content_type("text/csv"),
            )
            .await
            .unwrap();

        assert!(temp_dir.path().join("docs/a.csv").is_file());
    }

    #[tokio::test]
    async fn test_list_retries_per_backend() {
        let memory = memory_provider_with(&[]).await;
        assert_eq!(memory.list_retries(), 3);

        let config = StorageConfig::memory().with_option("list_retries", "1");
        let tuned = ObjectStoreProvider::new(config).await.unwrap();
        assert_eq!(tuned.list_retries(), 1);

        // object_store and the SDK retry each S3 request themselves
        let aws = ObjectStoreProvider::new(StorageConfig::aws()).await.unwrap();
        assert_eq!(aws.list_retries(), 0);
    }

    #[tokio::test]
    async fn test_list_objects_empty_container() {
        let provider = memory_provider_with(&["empty"]).await;
        let objects = provider.list_objects("empty", None).await.unwrap();
        assert!(objects.is_empty());
    }

    #[tokio::test]
    async fn test_list_objects_with_prefix() {
        let provider = memory_provider_with(&["docs"]).await;
        for key in ["2024/b.csv", "2024/a.csv", "2025/c.csv"] {
            provider
                .put_object(&target("docs", key), Bytes::from_static(b"x"), WriteOptions::default())
                .await
                .unwrap();
        }

        let all: Vec<String> = provider
            .list_objects("docs", None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(all, vec!["2024/a.csv", "2024/b.csv", "2025/c.csv"]);

        let filtered = provider.list_objects("docs", Some("2024")).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|m| m.key.starts_with("2024/")));
    }

    #[tokio::test]
    async fn test_delete_object_idempotent() {
        let provider = memory_provider_with(&["docs"]).await;
        let t = target("docs", "a.csv");
        provider
            .put_object(&t, Bytes::from_static(b"x"), WriteOptions::default())
            .await
            .unwrap();

        provider.delete_object(&t).await.unwrap();
        assert_eq!(provider.probe(&t).await.unwrap(), Probe::Missing);
        provider.delete_object(&t).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_delete_absent_object() {
        let temp_dir = TempDir::new().unwrap();
        let provider = local_provider(&temp_dir).await;
        provider.create_container("docs").await.unwrap();

        assert!(provider
            .delete_object(&target("docs", "never-written.csv"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_copy_within_container() {
        let provider = memory_provider_with(&["docs"]).await;
        let from = target("docs", "a.csv");
        let to = target("docs", "backup/a.csv");
        provider
            .put_object(&from, Bytes::from_static(b"payload"), WriteOptions::default())
            .await
            .unwrap();

        provider.copy_object(&from, &to).await.unwrap();

        assert_eq!(
            provider.read_object(&to).await.unwrap(),
            Bytes::from_static(b"payload")
        );
        assert!(provider.probe(&from).await.unwrap().is_found());
    }

    #[tokio::test]
    async fn test_copy_across_containers_local() {
        let temp_dir = TempDir::new().unwrap();
        let provider = local_provider(&temp_dir).await;
        provider.create_container("src").await.unwrap();
        provider.create_container("dst").await.unwrap();
        let from = target("src", "a.csv");
        let to = target("dst", "copies/a.csv");
        provider
            .put_object(&from, Bytes::from_static(b"payload"), WriteOptions::default())
            .await
            .unwrap();

        provider.copy_object(&from, &to).await.unwrap();

        assert_eq!(
            fs::read(temp_dir.path().join("dst/copies/a.csv")).unwrap(),
            b"payload"
        );
    }

    #[tokio::test]
    async fn test_copy_into_missing_container() {
        let provider = memory_provider_with(&["src"]).await;
        let from = target("src", "a.csv");
        provider
            .put_object(&from, Bytes::from_static(b"payload"), WriteOptions::default())
            .await
            .unwrap();

        let result = provider.copy_object(&from, &target("ghost", "a.csv")).await;
        assert!(matches!(result, Err(StorageError::ContainerNotFound(_))));
    }

    #[tokio::test]
    async fn test_memory_delete_container() {
        let provider = memory_provider_with(&["docs", "tmp"]).await;
        provider
            .put_object(&target("docs", "a.csv"), Bytes::from_static(b"x"), WriteOptions::default())
            .await
            .unwrap();

        assert!(matches!(
            provider.delete_container("docs").await,
            Err(StorageError::ContainerNotEmpty(_))
        ));
        provider.delete_container("tmp").await.unwrap();
        assert_eq!(provider.list_containers().await.unwrap(), vec!["docs"]);
        assert!(matches!(
            provider.delete_container("tmp").await,
            Err(StorageError::ContainerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_container_removed_outside_provider() {
        let temp_dir = TempDir::new().unwrap();
        let provider = local_provider(&temp_dir).await;
        provider.create_container("docs").await.unwrap();
        provider.list_objects("docs", None).await.unwrap();

        fs::remove_dir_all(temp_dir.path().join("docs")).unwrap();

        assert!(matches!(
            provider.list_objects("docs", None).await,
            Err(StorageError::ContainerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_container_name() {
        let provider = memory_provider_with(&[]).await;
        assert!(matches!(
            provider.create_container("a/b").await,
            Err(StorageError::InvalidTarget(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_connection() {
        let temp_dir = TempDir::new().unwrap();
        let provider = local_provider(&temp_dir).await;
        assert!(provider.validate_connection().await.is_ok());

        let memory = memory_provider_with(&[]).await;
        assert!(memory.validate_connection().await.is_ok());
    }

    #[tokio::test]
    async fn test_uri_for_local() {
        let temp_dir = TempDir::new().unwrap();
        let provider = local_provider(&temp_dir).await;

        let uri = provider.uri_for(&target("docs", "test/file.txt"));
        assert!(uri.starts_with("file:///"), "got: {}", uri);
        assert!(uri.ends_with("docs/test/file.txt"), "got: {}", uri);
        assert!(!uri.contains('\\'));
        assert!(!uri[7..].contains("//"), "got: {}", uri);
    }

    #[tokio::test]
    async fn test_uri_for_memory() {
        let provider = memory_provider_with(&[]).await;
        assert_eq!(
            provider.uri_for(&target("docs", "a.csv")),
            "memory://docs/a.csv"
        );
    }

    #[tokio::test]
    async fn test_provider_debug_format() {
        let provider = memory_provider_with(&[]).await;
        let debug_str = format!("{:?}", provider);
        assert!(debug_str.contains("StorageProvider"));
        assert!(debug_str.contains("memory"));
    }
}
