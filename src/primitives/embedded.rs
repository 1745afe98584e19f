/*!
 * Embedded-Section Backend
 * Creates regions from an image stored in a section of the running binary
 */

use super::client::PrimitiveClient;
use super::dispatch::ExitCallTable;
use super::native::{CreateParams, LaunchToken, NativeDriver};
use super::reservation::AddressReservation;
use super::retry::RetryPolicy;
use crate::config::EnclaveConfig;
use crate::core::{Address, EnclaveError, EnclaveResult, Size};
use goblin::elf::Elf;
use log::{debug, info};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Binary image of the calling process
pub const CALLING_PROCESS_BINARY_FILE: &str = "/proc/self/exe";

/// Contents of one ELF section, borrowed from the loaded binary
pub struct SectionImage {
    binary: Vec<u8>,
    range: Range<usize>,
}

impl SectionImage {
    /// Locate `section_name` in the ELF file at `binary_path`
    pub fn read(binary_path: &Path, section_name: &str) -> EnclaveResult<Self> {
        let binary = std::fs::read(binary_path).map_err(|e| {
            EnclaveError::NotFound(format!("Cannot read {}: {}", binary_path.display(), e))
        })?;

        let range = {
            let elf = Elf::parse(&binary).map_err(|e| {
                EnclaveError::InvalidArgument(format!(
                    "{} is not a valid ELF file: {}",
                    binary_path.display(),
                    e
                ))
            })?;

            let header = elf
                .section_headers
                .iter()
                .find(|sh| elf.shdr_strtab.get_at(sh.sh_name) == Some(section_name))
                .ok_or_else(|| {
                    EnclaveError::NotFound(format!("No section named {}", section_name))
                })?;

            header
                .file_range()
                .filter(|range| range.end <= binary.len())
                .ok_or_else(|| {
                    EnclaveError::InvalidArgument(format!(
                        "Section {} has no file contents",
                        section_name
                    ))
                })?
        };

        Ok(Self { binary, range })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.binary[self.range.clone()]
    }
}

/// Loads regions from a named section of the running binary
#[derive(Clone)]
pub struct EmbeddedBackend {
    driver: Arc<dyn NativeDriver>,
    retry: RetryPolicy,
    binary_path: PathBuf,
}

impl EmbeddedBackend {
    pub fn new(driver: Arc<dyn NativeDriver>) -> Self {
        Self {
            driver,
            retry: RetryPolicy::default(),
            binary_path: PathBuf::from(CALLING_PROCESS_BINARY_FILE),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Read sections from another ELF file instead of the running binary
    pub fn with_binary_path(mut self, binary_path: impl Into<PathBuf>) -> Self {
        self.binary_path = binary_path.into();
        self
    }

    /// Create a region from the section `section_name`
    ///
    /// With a fixed placement the target range is reserved while the binary
    /// is read, so the file buffer cannot land inside it, and released right
    /// before creation.
    #[allow(clippy::too_many_arguments)]
    pub fn load(
        &self,
        enclave_name: &str,
        base_address: Address,
        section_name: &str,
        enclave_size: Size,
        config: &EnclaveConfig,
        debug: bool,
        exit_calls: ExitCallTable,
    ) -> EnclaveResult<PrimitiveClient> {
        let reservation = if base_address != 0 && enclave_size > 0 {
            Some(AddressReservation::reserve(base_address, enclave_size)?)
        } else {
            None
        };

        let image = SectionImage::read(&self.binary_path, section_name)?;
        debug!(
            "Found section {} ({} bytes) for enclave {}",
            section_name,
            image.as_slice().len(),
            enclave_name
        );

        if let Some(reservation) = reservation {
            reservation.release()?;
        }

        let params = CreateParams {
            base_address,
            enclave_size,
            enable_fork: config.enable_fork,
            debug,
        };

        let region = self
            .retry
            .run(|_| self.driver.create_from_buffer(image.as_slice(), &params))
            .map_err(|status| EnclaveError::boundary(status, "Failed to create an enclave"))?;

        info!(
            "Created enclave {} from section {} (id {}, base 0x{:x})",
            enclave_name, section_name, region.id, region.base_address
        );

        Ok(PrimitiveClient::new(
            enclave_name,
            Arc::clone(&self.driver),
            region.id,
            region.base_address,
            LaunchToken::default(),
            exit_calls,
        ))
    }
}
