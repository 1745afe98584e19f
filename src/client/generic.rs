/*!
 * Generic Enclave Client
 * Lifecycle state machine over a primitive client
 */

use super::traits::{ClientState, EnclaveClient};
use crate::config::{EnclaveConfig, EnclaveFinal, EnclaveInput, EnclaveOutput};
use crate::core::bincode;
use crate::core::{Address, ClientId, EnclaveError, EnclaveResult, Size};
use crate::primitives::{ExitCallTable, PrimitiveClient};
use crate::signals::EnclaveSignal;
use log::debug;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Enclave client backed by a natively created region
pub struct GenericEnclaveClient {
    id: ClientId,
    primitive: PrimitiveClient,
    state: AtomicU8,
}

impl GenericEnclaveClient {
    pub fn create(primitive: PrimitiveClient) -> Arc<Self> {
        Arc::new(Self {
            id: ClientId::next(),
            primitive,
            state: AtomicU8::new(ClientState::Loaded as u8),
        })
    }

    pub fn primitive(&self) -> &PrimitiveClient {
        &self.primitive
    }

    fn require(&self, expected: ClientState, operation: &str) -> EnclaveResult<()> {
        let state = self.state();
        if state != expected {
            return Err(EnclaveError::FailedPrecondition(format!(
                "Cannot {} enclave {} in state {}",
                operation,
                self.name(),
                state
            )));
        }
        Ok(())
    }

    fn set_state(&self, state: ClientState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

impl EnclaveClient for GenericEnclaveClient {
    fn id(&self) -> ClientId {
        self.id
    }

    fn name(&self) -> &str {
        self.primitive.name()
    }

    fn state(&self) -> ClientState {
        ClientState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn base_address(&self) -> Address {
        self.primitive.base_address()
    }

    fn enclave_size(&self) -> Size {
        self.primitive.enclave_size()
    }

    fn exit_calls(&self) -> Option<&ExitCallTable> {
        Some(self.primitive.exit_calls())
    }

    fn enter_and_initialize(&self, config: &EnclaveConfig) -> EnclaveResult<()> {
        self.require(ClientState::Loaded, "initialize")?;
        let input = bincode::to_vec(config)?;
        let output = self.primitive.initialize(self.name(), &input)?;
        debug!(
            "Enclave {} initialized ({} bytes of output)",
            self.name(),
            output.len()
        );
        self.set_state(ClientState::Initialized);
        Ok(())
    }

    fn enter_and_run(&self, input: &EnclaveInput) -> EnclaveResult<EnclaveOutput> {
        self.require(ClientState::Initialized, "run")?;
        let bytes = bincode::to_vec(input)?;
        let output = self.primitive.run(&bytes)?;
        Ok(bincode::from_slice_or_default(&output)?)
    }

    fn enter_and_finalize(&self, final_input: &EnclaveFinal) -> EnclaveResult<()> {
        self.require(ClientState::Initialized, "finalize")?;
        let bytes = bincode::to_vec(final_input)?;
        self.primitive.finalize(&bytes)?;
        Ok(())
    }

    fn enter_and_handle_signal(&self, signal: &EnclaveSignal) -> EnclaveResult<()> {
        self.require(ClientState::Initialized, "deliver a signal to")?;
        let bytes = bincode::to_vec(signal)?;
        self.primitive.deliver_signal(&bytes)
    }

    fn destroy_enclave(&self) -> EnclaveResult<()> {
        let previous = ClientState::from_u8(
            self.state
                .swap(ClientState::Destroyed as u8, Ordering::SeqCst),
        );
        if previous == ClientState::Destroyed {
            return Err(EnclaveError::FailedPrecondition(format!(
                "Enclave {} is already destroyed",
                self.name()
            )));
        }
        self.primitive.destroy()
    }
}
