/*!
 * Global Manager
 * Process-wide EnclaveManager slot
 */

use super::manager::EnclaveManager;
use crate::config::ManagerOptions;
use crate::core::{EnclaveError, EnclaveResult};
use crate::primitives::NativeDriver;
use parking_lot::{const_mutex, Mutex};
use std::sync::Arc;
use tracing::info;

struct GlobalSlot {
    options: Option<ManagerOptions>,
    driver: Option<Arc<dyn NativeDriver>>,
    instance: Option<Arc<EnclaveManager>>,
}

static SLOT: Mutex<GlobalSlot> = const_mutex(GlobalSlot {
    options: None,
    driver: None,
    instance: None,
});

fn already_instantiated() -> EnclaveError {
    EnclaveError::FailedPrecondition(
        "The enclave manager has already been instantiated".into(),
    )
}

/// Store the options the process-wide manager is built with
///
/// May be called repeatedly until `instance()` first succeeds; the last
/// options win.
pub fn configure(options: ManagerOptions) -> EnclaveResult<()> {
    let mut slot = SLOT.lock();
    if slot.instance.is_some() {
        return Err(already_instantiated());
    }
    slot.options = Some(options);
    Ok(())
}

/// Native driver handed to the process-wide manager
pub fn install_native_driver(driver: Arc<dyn NativeDriver>) -> EnclaveResult<()> {
    let mut slot = SLOT.lock();
    if slot.instance.is_some() {
        return Err(already_instantiated());
    }
    slot.driver = Some(driver);
    Ok(())
}

/// Process-wide manager, built on first use
pub fn instance() -> EnclaveResult<Arc<EnclaveManager>> {
    let mut slot = SLOT.lock();
    if let Some(instance) = &slot.instance {
        return Ok(Arc::clone(instance));
    }

    let options = slot.options.clone().ok_or_else(|| {
        EnclaveError::FailedPrecondition(
            "configure() must be called before instance()".into(),
        )
    })?;

    let mut builder = EnclaveManager::builder().with_options(options);
    if let Some(driver) = &slot.driver {
        builder = builder.with_driver(Arc::clone(driver));
    }
    let manager = builder.build().map_err(|e| match e {
        EnclaveError::ResourceExhausted(_) => e,
        other => EnclaveError::ResourceExhausted(format!(
            "Failed to construct the enclave manager: {}",
            other
        )),
    })?;

    let manager = Arc::new(manager);
    slot.instance = Some(Arc::clone(&manager));
    info!("Process-wide enclave manager created");
    Ok(manager)
}

/// Whether `instance()` has already built the manager
pub fn is_instantiated() -> bool {
    SLOT.lock().instance.is_some()
}
