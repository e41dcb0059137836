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

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Object not found: {container}/{key}")]
    NotFound { container: String, key: String },

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Container already exists: {0}")]
    ContainerAlreadyExists(String),

    #[error("Container is not empty: {0}")]
    ContainerNotEmpty(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Transient backend fault: {0}")]
    Transient(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Existence probe failed for {target}: {source}")]
    ProbeFailed {
        target: String,
        #[source]
        source: Box<StorageError>,
    },

    #[error("Write failed for {target}: {source}")]
    WriteFailed {
        target: String,
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    /// The innermost error, looking through `ProbeFailed` and `WriteFailed`.
    pub fn root(&self) -> &StorageError {
        match self {
            StorageError::ProbeFailed { source, .. } | StorageError::WriteFailed { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    /// The object is absent. A missing container is not an absent object, see
    /// [`StorageError::is_container_not_found`].
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), StorageError::NotFound { .. })
    }

    /// The container addressed by the call does not exist.
    pub fn is_container_not_found(&self) -> bool {
        matches!(self.root(), StorageError::ContainerNotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(
            self.root(),
            StorageError::AlreadyExists(_) | StorageError::ContainerAlreadyExists(_)
        )
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self.root(), StorageError::AccessDenied(_))
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self.root() {
            StorageError::Transient(_) => true,
            StorageError::IoError(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

/// Classify a backend message the way connection-level faults show up in
/// client error chains.
pub(crate) fn looks_transient(message: &str) -> bool {
    message.contains("ConnectionReset")
        || message.contains("BrokenPipe")
        || message.contains("Interrupted")
        || message.contains("TimedOut")
        || message.contains("timed out")
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            // Stores are scoped to one container, so the path is the key alone
            object_store::Error::NotFound { path, .. } => StorageError::NotFound {
                container: String::new(),
                key: path,
            },
            object_store::Error::AlreadyExists { path, .. }
            | object_store::Error::Precondition { path, .. } => StorageError::AlreadyExists(path),
            object_store::Error::PermissionDenied { path, source } => {
                StorageError::AccessDenied(format!("{}: {}", path, source))
            }
            object_store::Error::Unauthenticated { path, source } => {
                StorageError::AccessDenied(format!("{}: {}", path, source))
            }
            object_store::Error::InvalidPath { source } => {
                StorageError::InvalidTarget(source.to_string())
            }
            other => {
                let message = format!("{:?}", other);
                if looks_transient(&message) {
                    StorageError::Transient(other.to_string())
                } else {
                    StorageError::Backend(other.to_string())
                }
            }
        }
    }
}

impl From<arrow::error::ArrowError> for StorageError {
    fn from(err: arrow::error::ArrowError) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
