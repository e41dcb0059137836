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

//! # Lake Depot
//!
//! A Rust library for keeping files and tables in object storage without
//! uploading the same object twice.
//!
//! Lake Depot wraps AWS S3 (or an S3-compatible endpoint), a local directory tree
//! or an in-process store behind one surface: containers, objects, Arrow tables
//! stored as delimited text, and an upload that first checks whether its target
//! already exists.
//!
//! ## Features
//!
//! - **Containers**: create (optionally with a dated fallback name), delete, list
//! - **Objects**: upload, download, copy across containers, delete, list, metadata
//! - **Tables**: `RecordBatch` written as CSV through a pluggable [`TabularEncoding`]
//! - **Existence-gated upload**: probe first, write only when absent; a failed probe
//!   is an error, never "absent"
//! - **Observability**: put decisions go to a [`PutObserver`], `tracing` by default
//!
//! ## Quick Start
//!
//! ### Local Filesystem Example
//!
//! ```rust,no_run
//! use lake_depot::{rows_to_batch, Depot, PutOutcome, StorageConfig};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = StorageConfig::local().with_option("path", "./depot");
//! let depot = Depot::builder(config).build().await?;
//!
//! depot.create_container("docs").await;
//! let rows = rows_to_batch(&[json!({"x": 1}), json!({"x": 2})])?;
//!
//! match depot.write_table("docs", "a.csv", rows).await? {
//!     PutOutcome::Uploaded => println!("written"),
//!     PutOutcome::AlreadyExists => println!("kept existing object"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### AWS S3 Example
//!
//! ```rust,no_run
//! use lake_depot::{Depot, StorageConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = StorageConfig::aws()
//!     .with_option("region", "eu-west-1")
//!     .with_option("access_key_id", "ACCESS_KEY")
//!     .with_option("secret_access_key", "SECRET_KEY")
//!     .with_option("put_consistency", "require_conditional_put");
//!
//! let depot = Depot::builder(config).build().await?;
//! depot.upload_file("my-bucket", "reports/q1.pdf", "./q1.pdf").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`depot`] - Caller-facing operations
//! - [`put`] - Existence-gated upload and its observer
//! - [`storage`] - Storage abstraction layer
//! - [`tabular`] - Table serialization
//! - [`util`] - Utility functions and helpers

pub mod depot;
pub mod put;
pub mod storage;
pub mod tabular;
pub mod util;

// Re-export commonly used types
pub use depot::{Depot, DepotBuilder};
pub use put::{IdempotentPut, PutEvent, PutObserver, PutOutcome, PutSource, TracingObserver};
pub use storage::{
    ObjectMetadata, Probe, PutConsistency, StorageConfig, StorageError, StorageProvider,
    StorageResult, StorageTarget,
};
pub use tabular::{rows_to_batch, CsvEncoding, TabularEncoding};
