/*!
 * Signal Dispatcher
 * Routes OS signals to the enclave client that registered for them
 */

use super::mask::SignalMaskGuard;
use super::types::EnclaveSignal;
use crate::client::EnclaveClient;
use crate::core::{ClientId, EnclaveError, EnclaveResult, SignalNumber};
use nix::libc;
use nix::sys::signal::{signal, SigHandler, Signal};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, warn};

static GLOBAL_DISPATCHER: OnceLock<Arc<SignalDispatcher>> = OnceLock::new();

/// One signal registration; the dispatcher never keeps a client alive
struct Registration {
    owner: ClientId,
    client: Weak<dyn EnclaveClient>,
}

/// Signal number to owning client registry
///
/// At most one client owns a signal. The registry lock is only ever taken
/// with all signals blocked on the calling thread.
pub struct SignalDispatcher {
    registry: Mutex<HashMap<SignalNumber, Registration>>,
}

impl SignalDispatcher {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide dispatcher used by the OS handler trampoline
    pub fn global() -> Arc<SignalDispatcher> {
        Arc::clone(GLOBAL_DISPATCHER.get_or_init(|| Arc::new(SignalDispatcher::new())))
    }

    /// Route `signum` to `client`, returning the previous owner if it is still alive
    pub fn register_signal(
        &self,
        signum: SignalNumber,
        client: &Arc<dyn EnclaveClient>,
    ) -> EnclaveResult<Option<Arc<dyn EnclaveClient>>> {
        let registration = Registration {
            owner: client.id(),
            client: Arc::downgrade(client),
        };

        let previous = self.with_registry(|registry| registry.insert(signum, registration))?;

        debug!(signum, enclave = client.name(), "Registered signal");
        Ok(previous.and_then(|registration| registration.client.upgrade()))
    }

    /// Remove every registration owned by `client` and restore `SIG_DFL`
    ///
    /// Keeps sweeping past individual failures and reports them together.
    pub fn deregister_all_signals_for_client(&self, client: &dyn EnclaveClient) -> EnclaveResult<()> {
        let owner = client.id();

        let failures = self.with_registry(|registry| {
            let owned: Vec<SignalNumber> = registry
                .iter()
                .filter(|(_, registration)| registration.owner == owner)
                .map(|(signum, _)| *signum)
                .collect();

            let mut failures = Vec::new();
            for signum in owned {
                registry.remove(&signum);
                if let Err(e) = restore_default(signum) {
                    failures.push(e);
                }
            }
            failures
        })?;

        if failures.is_empty() {
            Ok(())
        } else {
            warn!(enclave = client.name(), failures = failures.len(), "Signal deregistration incomplete");
            Err(EnclaveError::InvalidArgument(failures.join("; ")))
        }
    }

    /// Current owner of `signum`, if any
    pub fn owner(&self, signum: SignalNumber) -> EnclaveResult<Option<Arc<dyn EnclaveClient>>> {
        self.with_registry(|registry| {
            registry
                .get(&signum)
                .and_then(|registration| registration.client.upgrade())
        })
    }

    /// Signals currently routed to `client`
    pub fn signals_for_client(&self, client: ClientId) -> EnclaveResult<Vec<SignalNumber>> {
        let mut signals = self.with_registry(|registry| {
            registry
                .iter()
                .filter(|(_, registration)| registration.owner == client)
                .map(|(signum, _)| *signum)
                .collect::<Vec<_>>()
        })?;
        signals.sort_unstable();
        Ok(signals)
    }

    /// Forward a signal caught by an `SA_SIGINFO` handler into its owner
    pub fn enter_enclave_and_handle_signal(
        &self,
        signum: SignalNumber,
        info: &libc::siginfo_t,
        context: Option<&libc::ucontext_t>,
    ) -> EnclaveResult<()> {
        self.deliver(&EnclaveSignal::from_native(signum, info, context))
    }

    /// Forward an already captured signal into its owner
    pub fn deliver(&self, signal: &EnclaveSignal) -> EnclaveResult<()> {
        // Lock released and mask restored before entering the region
        let client = self.owner(signal.signum)?.ok_or_else(|| {
            EnclaveError::InvalidArgument(format!(
                "No enclave has registered signal: {}",
                signal.signum
            ))
        })?;
        client.enter_and_handle_signal(signal)
    }

    /// Run `f` on the registry with every signal blocked on this thread
    ///
    /// The OS handler takes the same lock, so it must never interrupt a
    /// thread that already holds it.
    fn with_registry<R>(
        &self,
        f: impl FnOnce(&mut HashMap<SignalNumber, Registration>) -> R,
    ) -> EnclaveResult<R> {
        let _mask = SignalMaskGuard::block_all()?;
        let mut registry = self.registry.lock();
        Ok(f(&mut registry))
    }
}

impl Default for SignalDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn restore_default(signum: SignalNumber) -> Result<(), String> {
    let sig = Signal::try_from(signum).map_err(|e| format!("Invalid signal {}: {}", signum, e))?;
    // SAFETY: SIG_DFL installs no Rust code as a handler
    unsafe { signal(sig, SigHandler::SigDfl) }
        .map(|_| ())
        .map_err(|e| format!("Failed to deregister signal {}: {}", signum, e))
}
