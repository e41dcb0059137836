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

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use serde::Serialize;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use super::error::{StorageError, StorageResult};
use super::target::StorageTarget;

/// Metadata about an object in storage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectMetadata {
    /// Container holding the object
    pub container: String,

    /// Object key within the container
    pub key: String,

    /// Object size in bytes
    pub size: u64,

    /// Last modified timestamp (if available)
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,

    /// Entity tag reported by the backend
    pub e_tag: Option<String>,

    /// Version identifier, for versioned containers
    pub version: Option<String>,
}

/// Result of an existence probe.
///
/// Probe failures are carried as `Err(StorageError)` next to this type and are
/// never folded into [`Probe::Missing`].
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    /// The object exists
    Found(ObjectMetadata),
    /// The backend confirmed the object is absent
    Missing,
}

impl Probe {
    pub fn is_found(&self) -> bool {
        matches!(self, Probe::Found(_))
    }
}

/// How a write treats an existing object and what it records alongside the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Ask the backend to fail with `AlreadyExists` instead of overwriting
    pub create_only: bool,

    /// MIME type stored with the object, on backends that keep attributes
    pub content_type: Option<&'static str>,
}

impl WriteOptions {
    /// A create-only write without attributes.
    pub fn exclusive() -> Self {
        Self {
            create_only: true,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }
}

/// Generic trait for object storage backends
///
/// This trait provides a unified interface over container administration and
/// object operations, so the existence-gated upload and the pass-through
/// operations can run against any backend (AWS S3, local filesystem, memory)
/// or a test double.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Get the base path/prefix for this storage provider.
    ///
    /// # Returns
    ///
    /// A string slice containing the root directory or URL scheme prefix.
    fn base_path(&self) -> &str;

    /// Validate the connection to the storage provider.
    ///
    /// This performs a cheap read to ensure credentials and connectivity work.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Credentials are invalid or expired
    /// * Network connectivity issues occur
    /// * The local root directory is not accessible
    async fn validate_connection(&self) -> StorageResult<()>;

    /// Create a container.
    ///
    /// # Errors
    ///
    /// * `ContainerAlreadyExists` - A container with that name exists
    /// * `AccessDenied` - The credentials may not create containers
    async fn create_container(&self, container: &str) -> StorageResult<()>;

    /// Delete an empty container.
    ///
    /// # Errors
    ///
    /// * `ContainerNotFound` - No container with that name exists
    /// * `ContainerNotEmpty` - The container still holds objects
    async fn delete_container(&self, container: &str) -> StorageResult<()>;

    /// List container names, sorted.
    async fn list_containers(&self) -> StorageResult<Vec<String>>;

    /// Probe a target without transferring its content.
    ///
    /// # Returns
    ///
    /// * `Ok(Probe::Found(_))` - The object exists
    /// * `Ok(Probe::Missing)` - The backend reported "not found"
    /// * `Err(StorageError)` - Any other failure (permission denied, transient fault, ...)
    async fn probe(&self, target: &StorageTarget) -> StorageResult<Probe>;

    /// Write the full payload to a target.
    ///
    /// # Arguments
    ///
    /// * `target` - Destination container and key
    /// * `payload` - The complete object body
    /// * `options` - Create-only mode and content type
    async fn put_object(
        &self,
        target: &StorageTarget,
        payload: Bytes,
        options: WriteOptions,
    ) -> StorageResult<()>;

    /// Read the full content of an object.
    async fn read_object(&self, target: &StorageTarget) -> StorageResult<Bytes>;

    /// Delete an object.
    async fn delete_object(&self, target: &StorageTarget) -> StorageResult<()>;

    /// Copy an object, possibly across containers, overwriting the destination.
    async fn copy_object(&self, from: &StorageTarget, to: &StorageTarget) -> StorageResult<()>;

    /// List all objects in a container, optionally restricted to a key prefix.
    ///
    /// An empty container yields an empty vector.
    async fn list_objects(
        &self,
        container: &str,
        prefix: Option<&str>,
    ) -> StorageResult<Vec<ObjectMetadata>>;

    /// Get metadata for a specific object.
    ///
    /// # Errors
    ///
    /// `NotFound` when the probe reports the object missing, otherwise the probe's error.
    async fn get_metadata(&self, target: &StorageTarget) -> StorageResult<ObjectMetadata> {
        match self.probe(target).await? {
            Probe::Found(meta) => Ok(meta),
            Probe::Missing => Err(StorageError::NotFound {
                container: target.container().to_string(),
                key: target.key().to_string(),
            }),
        }
    }

    /// Get a full provider-specific URI for a target (e.g., "s3://bucket/key", "file:///root/bucket/key").
    fn uri_for(&self, target: &StorageTarget) -> String;
}

impl Debug for dyn StorageProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "StorageProvider(base_path={})", self.base_path())
    }
}

/// Convert a key into an ObjectPath that stores it literally.
///
/// Keys that `object_store` would rewrite (empty segments, `.`/`..` segments,
/// leading or trailing `/`, control characters) are rejected, so a key read
/// back from a listing always addresses the same object.
pub(crate) fn string_to_path(s: &str) -> StorageResult<ObjectPath> {
    let path = ObjectPath::parse(s)
        .map_err(|e| StorageError::InvalidTarget(format!("invalid object key '{}': {}", s, e)))?;
    if path.as_ref() != s {
        return Err(StorageError::InvalidTarget(format!(
            "object key '{}' would be stored as '{}'",
            s, path
        )));
    }
    Ok(path)
}
