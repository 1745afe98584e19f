/*!
 * Load Configuration
 * Describes where an enclave image comes from and how to place it
 */

use super::enclave::EnclaveConfig;
use crate::core::{Address, EnclaveError, EnclaveResult, Size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Backend tag of the native region backend
pub const NATIVE_BACKEND_TAG: &str = "native";

/// Placement used to re-create a region in a forked child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkConfig {
    pub base_address: Address,
    pub enclave_size: Size,
}

/// Where the enclave image lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnclaveSource {
    /// Signed image on disk
    File { path: PathBuf },
    /// Named ELF section inside the running binary
    Embedded { section_name: String },
}

/// Backend record for natively created regions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeLoadConfig {
    #[serde(default)]
    pub source: Option<EnclaveSource>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub fork_config: Option<ForkConfig>,
}

impl NativeLoadConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(EnclaveSource::File { path: path.into() }),
            ..Default::default()
        }
    }

    pub fn embedded(section_name: impl Into<String>) -> Self {
        Self {
            source: Some(EnclaveSource::Embedded {
                section_name: section_name.into(),
            }),
            ..Default::default()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_fork_config(mut self, fork_config: ForkConfig) -> Self {
        self.fork_config = Some(fork_config);
        self
    }

    /// Base address and size the region must be created at (null/0 if free)
    pub fn placement(&self) -> (Address, Size) {
        self.fork_config
            .map(|fork| (fork.base_address, fork.enclave_size))
            .unwrap_or((0, 0))
    }
}

/// Backend-specific part of a load configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BackendConfig {
    Native(NativeLoadConfig),
}

impl BackendConfig {
    pub fn tag(&self) -> &'static str {
        match self {
            BackendConfig::Native(_) => NATIVE_BACKEND_TAG,
        }
    }
}

/// Full description of one enclave load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveLoadConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: Option<EnclaveConfig>,
    #[serde(default)]
    pub backend: Option<BackendConfig>,
}

impl EnclaveLoadConfig {
    pub fn native(native: NativeLoadConfig) -> Self {
        Self {
            backend: Some(BackendConfig::Native(native)),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_config(mut self, config: EnclaveConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn native_config(&self) -> Option<&NativeLoadConfig> {
        match &self.backend {
            Some(BackendConfig::Native(native)) => Some(native),
            None => None,
        }
    }

    pub fn native_config_mut(&mut self) -> Option<&mut NativeLoadConfig> {
        match &mut self.backend {
            Some(BackendConfig::Native(native)) => Some(native),
            None => None,
        }
    }

    /// Fork placement, if this load re-creates a region in a forked child
    pub fn fork_config(&self) -> Option<ForkConfig> {
        self.native_config().and_then(|native| native.fork_config)
    }

    /// Read a list of load configurations from a JSON file
    pub fn list_from_json_file(path: &Path) -> EnclaveResult<Vec<EnclaveLoadConfig>> {
        let bytes = std::fs::read(path).map_err(|e| {
            EnclaveError::NotFound(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
