/*!
 * Address Reservation
 * Holds a virtual address range with an inaccessible mapping
 */

use crate::core::{Address, EnclaveError, EnclaveResult, Size};
use log::{debug, error};
use nix::sys::mman::{mmap_anonymous, munmap, MapFlags, ProtFlags};
use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::ptr::NonNull;

/// RAII reservation of `[base, base + len)`
///
/// Keeps other allocations from landing in a range a region must later be
/// created at. Call `release` to hand the range back and observe failures;
/// dropping an unreleased reservation unmaps it and logs any error.
#[derive(Debug)]
pub struct AddressReservation {
    addr: NonNull<c_void>,
    len: NonZeroUsize,
    active: bool,
}

impl AddressReservation {
    /// Map `[base, base + len)` with no access rights
    ///
    /// Fails if the kernel places the mapping anywhere other than `base`.
    pub fn reserve(base: Address, len: Size) -> EnclaveResult<Self> {
        let (hint, length) = match (NonZeroUsize::new(base), NonZeroUsize::new(len)) {
            (Some(hint), Some(length)) => (hint, length),
            _ => {
                return Err(EnclaveError::InvalidArgument(
                    "Reservation needs a nonzero base address and size".into(),
                ))
            }
        };

        // SAFETY: a fresh PROT_NONE mapping without MAP_FIXED never replaces
        // existing mappings.
        let mapped = unsafe {
            mmap_anonymous(
                Some(hint),
                length,
                ProtFlags::PROT_NONE,
                MapFlags::MAP_SHARED | MapFlags::MAP_ANONYMOUS,
            )
        }
        .map_err(|e| EnclaveError::Internal(format!("Failed to reserve enclave memory: {}", e)))?;

        if mapped.as_ptr() as Address != base {
            // SAFETY: `mapped` was returned by the mmap above with `length`.
            let _ = unsafe { munmap(mapped, length.get()) };
            return Err(EnclaveError::Internal(format!(
                "Failed to reserve enclave memory at 0x{:x}",
                base
            )));
        }

        debug!("Reserved 0x{:x}..0x{:x}", base, base + len);
        Ok(Self {
            addr: mapped,
            len: length,
            active: true,
        })
    }

    pub fn base(&self) -> Address {
        self.addr.as_ptr() as Address
    }

    pub fn len(&self) -> Size {
        self.len.get()
    }

    /// Unmap the range so the region can be created there
    pub fn release(mut self) -> EnclaveResult<()> {
        self.active = false;
        self.unmap()
            .map_err(|e| EnclaveError::Internal(format!("Failed to release enclave memory: {}", e)))
    }

    fn unmap(&self) -> nix::Result<()> {
        // SAFETY: the range was mapped by `reserve` and is only unmapped once.
        unsafe { munmap(self.addr, self.len.get()) }
    }
}

impl Drop for AddressReservation {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.unmap() {
                error!("Failed to release reservation at 0x{:x}: {}", self.base(), e);
            }
        }
    }
}

// SAFETY: the reservation is an address range, never dereferenced.
unsafe impl Send for AddressReservation {}
