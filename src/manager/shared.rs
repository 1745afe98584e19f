/*!
 * Shared Resources
 * Named host resources made available to regions
 */

use crate::core::{EnclaveError, EnclaveResult};
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Name of the shared monotonic clock cell
pub const CLOCK_MONOTONIC: &str = "clock_monotonic";
/// Name of the shared realtime clock cell
pub const CLOCK_REALTIME: &str = "clock_realtime";

/// Namespace a shared resource name lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedNameKind {
    Address,
    Filename,
    MemBlock,
}

/// Key of a shared resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SharedName {
    pub kind: SharedNameKind,
    pub name: String,
}

impl SharedName {
    pub fn address(name: impl Into<String>) -> Self {
        Self {
            kind: SharedNameKind::Address,
            name: name.into(),
        }
    }

    pub fn filename(name: impl Into<String>) -> Self {
        Self {
            kind: SharedNameKind::Filename,
            name: name.into(),
        }
    }

    pub fn mem_block(name: impl Into<String>) -> Self {
        Self {
            kind: SharedNameKind::MemBlock,
            name: name.into(),
        }
    }
}

impl fmt::Display for SharedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.name)
    }
}

type SharedResource = Arc<dyn Any + Send + Sync>;

/// Table of resources shared with regions
///
/// Unmanaged resources are owned elsewhere; the table only hands out
/// additional references.
#[derive(Default)]
pub struct SharedResourceManager {
    resources: DashMap<SharedName, SharedResource, RandomState>,
}

impl SharedResourceManager {
    pub fn new() -> Self {
        Self {
            resources: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Register a resource under `name`; names are never silently replaced
    pub fn register_unmanaged<T>(&self, name: SharedName, resource: Arc<T>) -> EnclaveResult<()>
    where
        T: Any + Send + Sync,
    {
        use dashmap::mapref::entry::Entry;
        match self.resources.entry(name) {
            Entry::Occupied(entry) => Err(EnclaveError::AlreadyExists(format!(
                "Shared resource already registered: {}",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(resource);
                Ok(())
            }
        }
    }

    /// Typed reference to a registered resource
    pub fn acquire<T>(&self, name: &SharedName) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let resource = self.resources.get(name).map(|entry| Arc::clone(entry.value()))?;
        resource.downcast::<T>().ok()
    }

    pub fn release(&self, name: &SharedName) -> bool {
        self.resources.remove(name).is_some()
    }

    pub fn contains(&self, name: &SharedName) -> bool {
        self.resources.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
