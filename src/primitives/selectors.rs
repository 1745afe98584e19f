/*!
 * Entry Selectors
 * Operation codes dispatched on inside the region
 */

use crate::core::Selector;

/// Selectors below this value are reserved for the host runtime
pub const SELECTOR_USER: Selector = 128;

/// Initialize the region with a serialized `EnclaveConfig`
pub const SELECTOR_INIT: Selector = SELECTOR_USER + 1;

/// Run one round with a serialized `EnclaveInput`
pub const SELECTOR_RUN: Selector = SELECTOR_USER + 2;

/// Finalize the region with a serialized `EnclaveFinal`
pub const SELECTOR_FINI: Selector = SELECTOR_USER + 3;

/// Deliver a serialized `EnclaveSignal`
pub const SELECTOR_HANDLE_SIGNAL: Selector = SELECTOR_USER + 4;
