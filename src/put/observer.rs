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

//! Observability sink for the existence-gated upload.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::storage::error::StorageError;
use crate::storage::target::StorageTarget;

/// A decision point reached by [`IdempotentPut::put`](super::IdempotentPut::put).
#[derive(Debug)]
pub enum PutEvent<'a> {
    /// The existence probe is about to be sent
    ProbeStarted,
    /// The target exists; nothing will be written
    Found { size: u64 },
    /// The backend confirmed the target is absent
    Missing,
    /// The probe failed for a reason other than "not found"
    ProbeFailed { error: &'a StorageError },
    /// The source was turned into the object body
    Serialized { bytes: usize },
    /// The write succeeded
    Uploaded { bytes: usize, elapsed: Duration },
    /// A create-only write found the target already created by another writer
    LostRace,
    /// The write failed after absence was confirmed
    WriteFailed { error: &'a StorageError },
}

impl PutEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            PutEvent::ProbeStarted => "probe_started",
            PutEvent::Found { .. } => "found",
            PutEvent::Missing => "missing",
            PutEvent::ProbeFailed { .. } => "probe_failed",
            PutEvent::Serialized { .. } => "serialized",
            PutEvent::Uploaded { .. } => "uploaded",
            PutEvent::LostRace => "lost_race",
            PutEvent::WriteFailed { .. } => "write_failed",
        }
    }
}

/// Receives put events. Implementations must not block.
pub trait PutObserver: Send + Sync {
    fn on_event(&self, target: &StorageTarget, event: &PutEvent<'_>);
}

/// Default observer, forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PutObserver for TracingObserver {
    fn on_event(&self, target: &StorageTarget, event: &PutEvent<'_>) {
        let (container, key) = (target.container(), target.key());
        match event {
            PutEvent::ProbeStarted => {
                debug!("Probing key={} container={}", key, container)
            }
            PutEvent::Found { size } => info!(
                "Skipping upload, object exists key={} container={} size={}",
                key, container, size
            ),
            PutEvent::Missing => debug!("Object absent key={} container={}", key, container),
            PutEvent::ProbeFailed { error } => warn!(
                "Existence probe failed key={} container={}: {}",
                key, container, error
            ),
            PutEvent::Serialized { bytes } => debug!(
                "Serialized key={} container={} size={}",
                key, container, bytes
            ),
            PutEvent::Uploaded { bytes, elapsed } => info!(
                "Uploaded key={} container={} size={} took={}",
                key,
                container,
                bytes,
                elapsed.as_millis()
            ),
            PutEvent::LostRace => info!(
                "Object created concurrently key={} container={}",
                key, container
            ),
            PutEvent::WriteFailed { error } => warn!(
                "Upload failed key={} container={}: {}",
                key, container, error
            ),
        }
    }
}
