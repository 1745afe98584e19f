/*!
 * Enclave Host Library
 * Hosts isolated regions and carries calls and signals across the boundary
 */

pub mod client;
pub mod clock;
pub mod config;
pub mod core;
pub mod manager;
pub mod monitoring;
pub mod primitives;
pub mod signals;

// Re-exports
pub use client::{
    ClientState, EmbeddedEnclaveLoader, EnclaveClient, EnclaveLoader, FileEnclaveLoader,
    GenericEnclaveClient,
};
pub use config::{
    EnclaveConfig, EnclaveFinal, EnclaveInput, EnclaveLoadConfig, EnclaveOutput, HostConfig,
    ManagerOptions,
};
pub use crate::core::{ClientId, EnclaveError, EnclaveResult};
pub use manager::{EnclaveManager, SharedName, SharedResourceManager};
pub use monitoring::init_tracing;
pub use primitives::{NativeDriver, NativeStatus, SimulatedDriver};
pub use signals::{install_host_handler, EnclaveSignal, SignalDispatcher};
