/*!
 * Signal Mask Guard
 * Blocks every signal on the current thread for the guard's lifetime
 */

use crate::core::{EnclaveError, EnclaveResult};
use log::warn;
use nix::sys::signal::{pthread_sigmask, SigSet, SigmaskHow};

/// RAII guard that blocks all signals and restores the previous mask on drop
///
/// Taken around every access to the signal registry so a handler running on
/// this thread cannot observe the map mid-update or wait on a lock the
/// thread already holds.
#[must_use = "signals are unblocked as soon as the guard is dropped"]
pub struct SignalMaskGuard {
    previous: SigSet,
}

impl SignalMaskGuard {
    pub fn block_all() -> EnclaveResult<Self> {
        let mut previous = SigSet::empty();
        pthread_sigmask(
            SigmaskHow::SIG_SETMASK,
            Some(&SigSet::all()),
            Some(&mut previous),
        )
        .map_err(|e| EnclaveError::Internal(format!("Failed to block signals: {}", e)))?;
        Ok(Self { previous })
    }

    /// Mask that will be restored
    pub fn previous(&self) -> &SigSet {
        &self.previous
    }
}

impl Drop for SignalMaskGuard {
    fn drop(&mut self) {
        if let Err(e) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None) {
            warn!("Failed to restore signal mask: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;

    fn current_mask() -> SigSet {
        let mut mask = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, None, Some(&mut mask)).unwrap();
        mask
    }

    #[test]
    fn test_guard_blocks_and_restores() {
        let before = current_mask().contains(Signal::SIGUSR2);
        {
            let _guard = SignalMaskGuard::block_all().unwrap();
            assert!(current_mask().contains(Signal::SIGUSR2));
        }
        assert_eq!(current_mask().contains(Signal::SIGUSR2), before);
    }
}
