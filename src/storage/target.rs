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

use std::fmt::{Display, Formatter, Result as FmtResult};

use super::error::{StorageError, StorageResult};
use super::provider::string_to_path;

/// A logical storage location: one object key inside one container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageTarget {
    container: String,
    key: String,
}

impl StorageTarget {
    /// Build a target, rejecting empty names, containers containing `/` and keys
    /// that would not be stored byte for byte (empty segments, leading or trailing `/`).
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> StorageResult<Self> {
        let container = container.into();
        let key = key.into();

        validate_container_name(&container)?;
        if key.is_empty() {
            return Err(StorageError::InvalidTarget(format!(
                "object key must not be empty (container={})",
                container
            )));
        }
        string_to_path(&key)?;

        Ok(Self { container, key })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Display for StorageTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.container, self.key)
    }
}

/// Container names are a single path segment.
pub(crate) fn validate_container_name(container: &str) -> StorageResult<()> {
    if container.is_empty() {
        return Err(StorageError::InvalidTarget(
            "container name must not be empty".to_string(),
        ));
    }
    if container.contains('/') || container.contains('\\') || container == "." || container == ".."
    {
        return Err(StorageError::InvalidTarget(format!(
            "container name must be a single path segment: {}",
            container
        )));
    }
    Ok(())
}
