/*!
 * Client Module
 * Enclave clients and the loaders that produce them
 */

mod generic;
mod loader;
mod traits;

// Re-export public API
pub use generic::GenericEnclaveClient;
pub use loader::{
    load_from_config, ConfiguredLoader, EmbeddedEnclaveLoader, EnclaveLoader, FileEnclaveLoader,
};
pub use traits::{ClientState, EnclaveClient};
