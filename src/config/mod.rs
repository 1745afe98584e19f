/*!
 * Configuration Module
 * Manager options, generic enclave configuration and load descriptions
 */

pub mod enclave;
pub mod load;
pub mod options;

pub use enclave::{
    EnclaveConfig, EnclaveFinal, EnclaveInput, EnclaveOutput, EnvironmentVariable, LoggingLevel,
};
pub use load::{
    BackendConfig, EnclaveLoadConfig, EnclaveSource, ForkConfig, NativeLoadConfig,
    NATIVE_BACKEND_TAG,
};
pub use options::{ConfigServerConnectionAttributes, HostConfig, ManagerOptions};
