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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use super::error::{StorageError, StorageResult};

/// Option keys consumed by the connection and retry layers rather than by a backend builder.
pub(crate) const CLIENT_OPTION_KEYS: [&str; 8] = [
    "timeout",
    "connect_timeout",
    "max_retries",
    "list_retries",
    "retry_timeout",
    "pool_idle_timeout",
    "pool_max_idle_per_host",
    "put_consistency",
];

const DEFAULT_LIST_RETRIES: usize = 3;

/// Storage provider type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Local filesystem storage, one directory per container
    Local,
    /// AWS S3 (or an S3-compatible endpoint)
    Aws,
    /// In-process storage, lost when the provider is dropped
    Memory,
}

impl FromStr for StorageType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "file" => Ok(StorageType::Local),
            "aws" | "s3" => Ok(StorageType::Aws),
            "memory" | "mem" => Ok(StorageType::Memory),
            _ => Err(StorageError::ConfigError(format!(
                "Unknown storage type: {}",
                s
            ))),
        }
    }
}

/// How the existence-gated upload behaves when another writer races it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PutConsistency {
    /// Probe, then plain write. Two concurrent callers may both upload; the last write wins.
    #[default]
    AllowOverwriteRace,
    /// Probe, then a create-only write. A concurrent creation makes the write
    /// fail with "already exists", which is reported as `AlreadyExists`.
    RequireConditionalPut,
}

impl FromStr for PutConsistency {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "allow_overwrite_race" => Ok(PutConsistency::AllowOverwriteRace),
            "require_conditional_put" => Ok(PutConsistency::RequireConditionalPut),
            _ => Err(StorageError::ConfigError(format!(
                "Unknown put_consistency: {}",
                s
            ))),
        }
    }
}

/// Configuration for storage providers
///
/// Provider-specific options live in a string map and are applied to the
/// backend builders when the provider is created.
///
/// # Examples
///
/// ## Local filesystem
/// ```
/// use lake_depot::storage::StorageConfig;
///
/// let config = StorageConfig::local()
///     .with_option("path", "/tmp/depot");
/// ```
///
/// ## AWS S3
/// ```
/// use lake_depot::storage::StorageConfig;
///
/// let config = StorageConfig::aws()
///     .with_option("region", "eu-west-1")
///     .with_option("access_key_id", "ACCESS_KEY")
///     .with_option("secret_access_key", "SECRET_ACCESS_KEY")
///     .with_option("put_consistency", "require_conditional_put");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage provider type
    #[serde(rename = "type")]
    pub storage_type: StorageType,

    /// Provider-specific configuration options
    ///
    /// AWS S3:
    /// - region: AWS region (defaults to "us-east-1")
    /// - access_key_id: AWS access key ID
    /// - secret_access_key: AWS secret access key
    /// - session_token: AWS session token (for temporary credentials)
    /// - endpoint: Custom endpoint URL (for S3-compatible services)
    /// - allow_http: "true" to allow HTTP connections
    ///
    /// Local:
    /// - path: Root directory; each container is a sub-directory
    ///
    /// All types:
    /// - timeout, connect_timeout, pool_idle_timeout: seconds, "0" or "disabled" turns them off
    /// - max_retries, retry_timeout: HTTP retry policy of the S3 client
    /// - list_retries: extra attempts for local and memory listings on transient faults
    /// - put_consistency: "allow_overwrite_race" (default) or "require_conditional_put"
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl StorageConfig {
    /// Create a new storage configuration with default options.
    pub fn new(storage_type: StorageType) -> Self {
        Self {
            storage_type,
            options: Self::default_options(),
        }
    }

    /// Create a configuration from a storage type name ("local", "aws"/"s3", "memory").
    pub fn parse(storage_type: &str) -> StorageResult<Self> {
        Ok(Self::new(storage_type.parse()?))
    }

    /// Load a configuration from JSON, e.g. `{"type":"aws","options":{"region":"us-east-1"}}`.
    ///
    /// Options missing from the document fall back to [`StorageConfig::default_options`].
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let parsed: StorageConfig = serde_json::from_str(json)
            .map_err(|e| StorageError::ConfigError(format!("Invalid storage config: {}", e)))?;
        Ok(Self::new(parsed.storage_type).with_options(parsed.options))
    }

    pub fn local() -> Self {
        Self::new(StorageType::Local)
    }

    pub fn aws() -> Self {
        Self::new(StorageType::Aws)
    }

    pub fn memory() -> Self {
        Self::new(StorageType::Memory)
    }

    /// Get default options for all storage types.
    ///
    /// # Returns
    ///
    /// A HashMap containing default timeout, retry, and connection pool settings.
    pub fn default_options() -> HashMap<String, String> {
        [
            ("timeout", "1200"),
            ("connect_timeout", "30"),
            ("max_retries", "20"),
            ("retry_timeout", "1200"),
            ("pool_idle_timeout", "15"),
            ("pool_max_idle_per_host", "5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// Add a configuration option (for method chaining).
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Add multiple configuration options (for method chaining).
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }

    /// The configured region, "us-east-1" when unset.
    pub fn region(&self) -> &str {
        self.get_option("region")
            .map(String::as_str)
            .unwrap_or("us-east-1")
    }

    /// The configured [`PutConsistency`], defaulting to `AllowOverwriteRace`.
    pub fn put_consistency(&self) -> StorageResult<PutConsistency> {
        match self.get_option("put_consistency") {
            Some(value) => value.parse(),
            None => Ok(PutConsistency::default()),
        }
    }

    /// Extra attempts for a listing that failed with a transient fault (defaults to 3).
    ///
    /// Separate from `max_retries`, which the S3 client applies to every request.
    pub fn list_retries(&self) -> usize {
        self.get_option("list_retries")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_LIST_RETRIES)
    }

    pub fn storage_type_str(&self) -> &str {
        match self.storage_type {
            StorageType::Local => "local",
            StorageType::Aws => "aws",
            StorageType::Memory => "memory",
        }
    }

    /// Options without the connection, retry and put tuning keys.
    pub fn clean_options(&self) -> HashMap<String, String> {
        self.options
            .iter()
            .filter(|(k, _)| !CLIENT_OPTION_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
