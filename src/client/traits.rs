/*!
 * Enclave Client Traits
 * Lifecycle abstraction over one loaded enclave
 */

use crate::config::{EnclaveConfig, EnclaveFinal, EnclaveInput, EnclaveOutput};
use crate::core::{Address, ClientId, EnclaveResult, Size};
use crate::primitives::ExitCallTable;
use crate::signals::EnclaveSignal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an enclave client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ClientState {
    /// Region created, not yet initialized
    Loaded = 0,
    /// Running; accepts calls and signals
    Initialized = 1,
    /// Native resources released; never re-entered
    Destroyed = 2,
}

impl ClientState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => ClientState::Loaded,
            1 => ClientState::Initialized,
            _ => ClientState::Destroyed,
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClientState::Loaded => "loaded",
            ClientState::Initialized => "initialized",
            ClientState::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Host-side handle over one enclave
///
/// Every `enter_*` method performs one boundary call. Implementations must
/// not hold locks across a call: a signal delivered to the calling thread
/// re-enters the client through `enter_and_handle_signal`.
pub trait EnclaveClient: Send + Sync {
    fn id(&self) -> ClientId;

    fn name(&self) -> &str;

    fn state(&self) -> ClientState;

    /// Base address of the region, 0 if the backend has no fixed placement
    fn base_address(&self) -> Address {
        0
    }

    /// Size of the region, 0 if unknown
    fn enclave_size(&self) -> Size {
        0
    }

    /// Host handlers the region can call back into, if the backend has any
    fn exit_calls(&self) -> Option<&ExitCallTable> {
        None
    }

    fn enter_and_initialize(&self, config: &EnclaveConfig) -> EnclaveResult<()>;

    fn enter_and_run(&self, input: &EnclaveInput) -> EnclaveResult<EnclaveOutput>;

    fn enter_and_finalize(&self, final_input: &EnclaveFinal) -> EnclaveResult<()>;

    fn enter_and_handle_signal(&self, signal: &EnclaveSignal) -> EnclaveResult<()>;

    /// Release the region's native resources
    fn destroy_enclave(&self) -> EnclaveResult<()>;
}

impl fmt::Debug for dyn EnclaveClient + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnclaveClient")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
