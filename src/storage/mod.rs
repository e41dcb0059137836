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

//! Object storage abstraction layer
//!
//! This module provides a unified interface over containers and objects for
//! AWS S3, the local filesystem and an in-process store.
//!
//! Objects are addressed through the `object_store` crate, one store per
//! container. Bucket lifecycle on S3 goes through `aws-sdk-s3`.

pub mod config;
pub mod error;
pub mod factory;
pub mod object_store;
pub mod provider;
pub mod s3;
pub mod target;

// Public exports
pub use config::{PutConsistency, StorageConfig, StorageType};
pub use error::{StorageError, StorageResult};
pub use factory::StorageProviderFactory;
pub use provider::{ObjectMetadata, Probe, StorageProvider};
pub use target::StorageTarget;
