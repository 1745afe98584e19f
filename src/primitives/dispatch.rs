/*!
 * Exit-Call Dispatch Table
 * Host handlers a region may call back into during a boundary call
 */

use super::extent::ParameterStack;
use crate::core::{EnclaveError, EnclaveResult, Selector};
use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, info};
use std::sync::Arc;

/// Exit-call handler function type
pub type ExitHandlerFn =
    Arc<dyn Fn(&mut ParameterStack<'_>) -> EnclaveResult<()> + Send + Sync>;

/// Selector → handler table owned by one enclave client
#[derive(Clone, Default)]
pub struct ExitCallTable {
    handlers: Arc<DashMap<Selector, ExitHandlerFn, RandomState>>,
}

impl ExitCallTable {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    /// Register a handler for `selector`
    pub fn register<F>(&self, selector: Selector, handler: F) -> EnclaveResult<()>
    where
        F: Fn(&mut ParameterStack<'_>) -> EnclaveResult<()> + Send + Sync + 'static,
    {
        use dashmap::mapref::entry::Entry;

        match self.handlers.entry(selector) {
            Entry::Occupied(_) => Err(EnclaveError::AlreadyExists(format!(
                "Exit handler already registered for selector {}",
                selector
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(handler));
                info!("Registered exit handler for selector {}", selector);
                Ok(())
            }
        }
    }

    /// Invoke the handler registered for `selector`
    pub fn invoke(&self, selector: Selector, params: &mut ParameterStack<'_>) -> EnclaveResult<()> {
        // Clone out of the shard so a handler may register further handlers
        let handler = self
            .handlers
            .get(&selector)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                EnclaveError::InvalidArgument(format!(
                    "No exit handler registered for selector {}",
                    selector
                ))
            })?;

        debug!("Dispatching exit call {}", selector);
        handler(params)
    }

    pub fn unregister(&self, selector: Selector) -> bool {
        self.handlers.remove(&selector).is_some()
    }

    pub fn contains(&self, selector: Selector) -> bool {
        self.handlers.contains_key(&selector)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
