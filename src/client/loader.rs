/*!
 * Enclave Loaders
 * Sources of load configurations and backend selection
 */

use super::generic::GenericEnclaveClient;
use super::traits::EnclaveClient;
use crate::config::{BackendConfig, EnclaveConfig, EnclaveLoadConfig, EnclaveSource, NativeLoadConfig};
use crate::core::{Address, EnclaveError, EnclaveResult, Size};
use crate::primitives::{EmbeddedBackend, ExitCallTable, FileBackend, NativeDriver};
use std::path::PathBuf;
use std::sync::Arc;

/// Describes how to load one enclave
///
/// Loaders whose configuration names a backend are materialized by the
/// manager. A loader without a backend record must create its client itself
/// by overriding `load_enclave`.
pub trait EnclaveLoader: Send + Sync {
    fn load_config(&self) -> EnclaveLoadConfig;

    fn load_enclave(
        &self,
        _name: &str,
        _base_address: Address,
        _enclave_size: Size,
        _config: &EnclaveConfig,
    ) -> EnclaveResult<Arc<dyn EnclaveClient>> {
        Err(EnclaveError::InvalidArgument(
            "Enclave backend not supported".into(),
        ))
    }
}

/// Loads an enclave image from a file
#[derive(Debug, Clone)]
pub struct FileEnclaveLoader {
    pub path: PathBuf,
    pub debug: bool,
}

impl FileEnclaveLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl EnclaveLoader for FileEnclaveLoader {
    fn load_config(&self) -> EnclaveLoadConfig {
        EnclaveLoadConfig::native(NativeLoadConfig::file(self.path.clone()).with_debug(self.debug))
    }
}

/// Loads an enclave image from a section of the running binary
#[derive(Debug, Clone)]
pub struct EmbeddedEnclaveLoader {
    pub section_name: String,
    pub debug: bool,
}

impl EmbeddedEnclaveLoader {
    pub fn new(section_name: impl Into<String>) -> Self {
        Self {
            section_name: section_name.into(),
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl EnclaveLoader for EmbeddedEnclaveLoader {
    fn load_config(&self) -> EnclaveLoadConfig {
        EnclaveLoadConfig::native(
            NativeLoadConfig::embedded(self.section_name.clone()).with_debug(self.debug),
        )
    }
}

/// Loader wrapping a fixed load configuration
#[derive(Debug, Clone)]
pub struct ConfiguredLoader(pub EnclaveLoadConfig);

impl EnclaveLoader for ConfiguredLoader {
    fn load_config(&self) -> EnclaveLoadConfig {
        self.0.clone()
    }
}

/// Materialize a client from a resolved load configuration
///
/// `config` is the fully defaulted enclave configuration; its `enable_fork`
/// flag reaches the native creation parameters.
pub fn load_from_config(
    load_config: &EnclaveLoadConfig,
    config: &EnclaveConfig,
    driver: Option<&Arc<dyn NativeDriver>>,
) -> EnclaveResult<Arc<dyn EnclaveClient>> {
    let native = match &load_config.backend {
        Some(BackendConfig::Native(native)) => native,
        None => {
            return Err(EnclaveError::InvalidArgument(
                "Enclave backend not supported".into(),
            ))
        }
    };

    let driver = driver.ok_or_else(|| {
        EnclaveError::FailedPrecondition(format!(
            "No native driver installed for backend {}",
            load_config.backend.as_ref().map(|b| b.tag()).unwrap_or_default()
        ))
    })?;

    let (base_address, enclave_size) = native.placement();
    let exit_calls = ExitCallTable::new();

    let primitive = match &native.source {
        Some(EnclaveSource::File { path }) => FileBackend::new(Arc::clone(driver)).load(
            &load_config.name,
            base_address,
            path,
            enclave_size,
            config,
            native.debug,
            exit_calls,
        )?,
        Some(EnclaveSource::Embedded { section_name }) => EmbeddedBackend::new(Arc::clone(driver))
            .load(
                &load_config.name,
                base_address,
                section_name,
                enclave_size,
                config,
                native.debug,
                exit_calls,
            )?,
        None => {
            return Err(EnclaveError::InvalidArgument(
                "Enclave source not set".into(),
            ))
        }
    };

    Ok(GenericEnclaveClient::create(primitive))
}
