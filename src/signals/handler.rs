/*!
 * Host Signal Handler
 * OS-level trampoline into the process-wide dispatcher
 */

use super::dispatcher::SignalDispatcher;
use crate::core::{EnclaveError, EnclaveResult, SignalNumber};
use nix::libc;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::error;

extern "C" fn host_signal_trampoline(
    signum: libc::c_int,
    info: *mut libc::siginfo_t,
    context: *mut libc::c_void,
) {
    // SAFETY: the kernel passes valid pointers for SA_SIGINFO handlers
    let Some(info) = (unsafe { info.as_ref() }) else {
        return;
    };
    let context = unsafe { (context as *const libc::ucontext_t).as_ref() };

    if let Err(e) = SignalDispatcher::global().enter_enclave_and_handle_signal(signum, info, context) {
        error!(signum, error = %e, "Failed to deliver signal into enclave");
    }
}

/// Install the `SA_SIGINFO` trampoline for `signum`
///
/// Signals caught by the trampoline are routed through
/// `SignalDispatcher::global()`.
pub fn install_host_handler(signum: SignalNumber) -> EnclaveResult<()> {
    let sig = Signal::try_from(signum)
        .map_err(|e| EnclaveError::InvalidArgument(format!("Invalid signal {}: {}", signum, e)))?;
    let action = SigAction::new(
        SigHandler::SigAction(host_signal_trampoline),
        SaFlags::SA_SIGINFO,
        SigSet::empty(),
    );
    // SAFETY: the trampoline only touches the dispatcher
    unsafe { sigaction(sig, &action) }.map_err(|e| {
        EnclaveError::InvalidArgument(format!("Failed to install handler for {}: {}", signum, e))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncatchable_signal_is_rejected() {
        let err = install_host_handler(libc::SIGKILL).unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn test_out_of_range_signal_is_rejected() {
        assert!(install_host_handler(4096).is_err());
    }
}
