/*!
 * Signal Types
 * Signal record delivered into a region
 */

use crate::core::types::SignalNumber;
use nix::libc;
use serde::{Deserialize, Serialize};

/// Number of general-purpose registers captured from the machine context
pub const GREG_COUNT: usize = 23;

/// Signal as seen by the region: number, origin code and interrupted registers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveSignal {
    pub signum: SignalNumber,
    pub code: i32,
    pub gregs: [u64; GREG_COUNT],
}

impl EnclaveSignal {
    pub fn new(signum: SignalNumber) -> Self {
        Self {
            signum,
            code: 0,
            gregs: [0; GREG_COUNT],
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Build from the arguments of an `SA_SIGINFO` handler
    pub fn from_native(
        signum: SignalNumber,
        info: &libc::siginfo_t,
        context: Option<&libc::ucontext_t>,
    ) -> Self {
        let mut signal = Self::new(signum).with_code(info.si_code);
        if let Some(context) = context {
            signal.gregs = capture_gregs(context);
        }
        signal
    }
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
fn capture_gregs(context: &libc::ucontext_t) -> [u64; GREG_COUNT] {
    let mut gregs = [0u64; GREG_COUNT];
    for (dst, src) in gregs.iter_mut().zip(context.uc_mcontext.gregs.iter()) {
        *dst = *src as u64;
    }
    gregs
}

// Register layout is only known for x86_64 Linux
#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
fn capture_gregs(_context: &libc::ucontext_t) -> [u64; GREG_COUNT] {
    [0; GREG_COUNT]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bincode;

    #[test]
    fn test_new_signal_has_no_context() {
        let signal = EnclaveSignal::new(libc::SIGUSR1).with_code(-6);
        assert_eq!(signal.signum, libc::SIGUSR1);
        assert_eq!(signal.code, -6);
        assert!(signal.gregs.iter().all(|r| *r == 0));
    }

    #[test]
    fn test_from_native_copies_code() {
        // SAFETY: siginfo_t is plain data; all-zero is a valid value
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        info.si_code = 3;
        let signal = EnclaveSignal::from_native(libc::SIGSEGV, &info, None);
        assert_eq!(signal.signum, libc::SIGSEGV);
        assert_eq!(signal.code, 3);
    }

    #[test]
    fn test_signal_crosses_boundary_encoding() {
        let mut signal = EnclaveSignal::new(11);
        signal.gregs[16] = 0xdead_beef;
        let bytes = bincode::to_vec(&signal).unwrap();
        let decoded: EnclaveSignal = bincode::from_slice(&bytes).unwrap();
        assert_eq!(decoded, signal);
    }
}
