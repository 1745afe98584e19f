/*!
 * Native Driver Interface
 * Capability through which regions are created, entered and destroyed
 */

use super::bridge::MarshalRecord;
use super::dispatch::ExitCallTable;
use crate::core::{Address, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Identifier the native subsystem assigns to a created region
pub type EnclaveId = u64;

/// Size of a native launch token
pub const LAUNCH_TOKEN_SIZE: usize = 1024;

/// Status code domain of the native subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "code", rename_all = "snake_case")]
pub enum NativeStatus {
    Success,
    /// Creation was interrupted and may be retried
    CreateInterrupted,
    Failure(u32),
}

/// Native code reported for an interrupted creation
pub const CREATE_INTERRUPTED_CODE: u32 = 0x0000_2002;

impl NativeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, NativeStatus::Success)
    }

    pub fn code(&self) -> u32 {
        match self {
            NativeStatus::Success => 0,
            NativeStatus::CreateInterrupted => CREATE_INTERRUPTED_CODE,
            NativeStatus::Failure(code) => *code,
        }
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeStatus::Success => write!(f, "success"),
            NativeStatus::CreateInterrupted => write!(f, "create interrupted (0x{:04x})", self.code()),
            NativeStatus::Failure(code) => write!(f, "native status 0x{:04x}", code),
        }
    }
}

/// Launch token returned (and possibly refreshed) by file-image creation
#[derive(Clone, PartialEq, Eq)]
pub struct LaunchToken(Box<[u8; LAUNCH_TOKEN_SIZE]>);

impl LaunchToken {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.0[..]
    }
}

impl Default for LaunchToken {
    fn default() -> Self {
        LaunchToken(Box::new([0u8; LAUNCH_TOKEN_SIZE]))
    }
}

impl fmt::Debug for LaunchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = self.0.iter().filter(|b| **b != 0).count();
        write!(f, "LaunchToken({} non-zero bytes)", set)
    }
}

/// Parameters of one native creation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreateParams {
    /// Requested base address, 0 to let the subsystem choose
    pub base_address: Address,
    /// Requested size, 0 to derive from the image
    pub enclave_size: Size,
    pub enable_fork: bool,
    pub debug: bool,
}

/// A region the native subsystem created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedRegion {
    pub id: EnclaveId,
    pub base_address: Address,
}

/// Native enclave subsystem
///
/// Creation, entry and destruction of regions are opaque operations with a
/// status outcome. `ecall` is the single fixed entry point: the region
/// dispatches internally on the record's selector and may call back into the
/// host through `exit_calls` while it runs.
pub trait NativeDriver: Send + Sync {
    /// Create a region from an image on disk
    fn create_from_file(
        &self,
        path: &Path,
        params: &CreateParams,
        token: &mut LaunchToken,
    ) -> Result<CreatedRegion, NativeStatus>;

    /// Create a region from an image already in memory
    fn create_from_buffer(
        &self,
        image: &[u8],
        params: &CreateParams,
    ) -> Result<CreatedRegion, NativeStatus>;

    /// Release a region
    fn destroy(&self, id: EnclaveId) -> NativeStatus;

    /// Transfer control into a region
    fn ecall(
        &self,
        id: EnclaveId,
        exit_calls: &ExitCallTable,
        record: &mut MarshalRecord<'_, '_>,
    ) -> NativeStatus;

    /// Size of a created region
    fn enclave_size(&self, id: EnclaveId) -> Size;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(NativeStatus::Success.code(), 0);
        assert_eq!(NativeStatus::CreateInterrupted.code(), CREATE_INTERRUPTED_CODE);
        assert_eq!(NativeStatus::Failure(0x3001).code(), 0x3001);
        assert!(NativeStatus::Success.is_success());
        assert!(!NativeStatus::CreateInterrupted.is_success());
    }

    #[test]
    fn test_launch_token_starts_zeroed() {
        let token = LaunchToken::default();
        assert_eq!(token.as_bytes().len(), LAUNCH_TOKEN_SIZE);
        assert!(token.as_bytes().iter().all(|b| *b == 0));
    }
}
