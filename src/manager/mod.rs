/*!
 * Manager Module
 * Enclave registry, lifecycle orchestration and shared resources
 */

mod builder;
pub mod global;
#[allow(clippy::module_inception)]
mod manager;
mod shared;
mod tables;

// Re-export public API
pub use builder::EnclaveManagerBuilder;
pub use manager::EnclaveManager;
pub use shared::{SharedName, SharedNameKind, SharedResourceManager, CLOCK_MONOTONIC, CLOCK_REALTIME};
