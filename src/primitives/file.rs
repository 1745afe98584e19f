/*!
 * File-Image Backend
 * Creates regions from signed images on disk
 */

use super::client::PrimitiveClient;
use super::dispatch::ExitCallTable;
use super::native::{CreateParams, LaunchToken, NativeDriver};
use super::retry::RetryPolicy;
use crate::config::EnclaveConfig;
use crate::core::{Address, EnclaveError, EnclaveResult, Size};
use log::info;
use std::path::Path;
use std::sync::Arc;

/// Loads regions from a file path
#[derive(Clone)]
pub struct FileBackend {
    driver: Arc<dyn NativeDriver>,
    retry: RetryPolicy,
}

impl FileBackend {
    pub fn new(driver: Arc<dyn NativeDriver>) -> Self {
        Self {
            driver,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create a region from `enclave_path`
    ///
    /// `base_address`/`enclave_size` pin the region to a fixed placement when
    /// re-creating it in a forked child; zero leaves placement to the driver.
    #[allow(clippy::too_many_arguments)]
    pub fn load(
        &self,
        enclave_name: &str,
        base_address: Address,
        enclave_path: &Path,
        enclave_size: Size,
        config: &EnclaveConfig,
        debug: bool,
        exit_calls: ExitCallTable,
    ) -> EnclaveResult<PrimitiveClient> {
        let params = CreateParams {
            base_address,
            enclave_size,
            enable_fork: config.enable_fork,
            debug,
        };

        let mut token = LaunchToken::default();
        let region = self
            .retry
            .run(|_| self.driver.create_from_file(enclave_path, &params, &mut token))
            .map_err(|status| EnclaveError::boundary(status, "Failed to create an enclave"))?;

        info!(
            "Created enclave {} from {} (id {}, base 0x{:x})",
            enclave_name,
            enclave_path.display(),
            region.id,
            region.base_address
        );

        Ok(PrimitiveClient::new(
            enclave_name,
            Arc::clone(&self.driver),
            region.id,
            region.base_address,
            token,
            exit_calls,
        ))
    }
}
