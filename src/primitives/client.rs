/*!
 * Primitive Client
 * Native handle over one created region
 */

use super::bridge::TrustedCallBridge;
use super::dispatch::ExitCallTable;
use super::extent::ParameterStack;
use super::native::{EnclaveId, LaunchToken, NativeDriver, NativeStatus};
use super::selectors::{SELECTOR_FINI, SELECTOR_HANDLE_SIGNAL, SELECTOR_INIT, SELECTOR_RUN};
use crate::core::{Address, EnclaveError, EnclaveResult, Selector, Size};
use log::info;
use std::sync::Arc;

/// Handle over one native region
///
/// Owns the boundary-call bridge and the exit-call table the region calls
/// back into. Dropping the handle does not release the region; `destroy`
/// does, so a handle inherited across fork can be discarded safely.
pub struct PrimitiveClient {
    name: String,
    id: EnclaveId,
    size: Size,
    base_address: Address,
    token: LaunchToken,
    exit_calls: ExitCallTable,
    bridge: TrustedCallBridge,
    driver: Arc<dyn NativeDriver>,
}

impl PrimitiveClient {
    pub(crate) fn new(
        name: &str,
        driver: Arc<dyn NativeDriver>,
        id: EnclaveId,
        base_address: Address,
        token: LaunchToken,
        exit_calls: ExitCallTable,
    ) -> Self {
        let size = driver.enclave_size(id);
        let bridge = TrustedCallBridge::new(Arc::clone(&driver), id, exit_calls.clone());
        Self {
            name: name.to_string(),
            id,
            size,
            base_address,
            token,
            exit_calls,
            bridge,
            driver,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enclave_id(&self) -> EnclaveId {
        self.id
    }

    pub fn enclave_size(&self) -> Size {
        self.size
    }

    pub fn base_address(&self) -> Address {
        self.base_address
    }

    pub fn launch_token(&self) -> &LaunchToken {
        &self.token
    }

    pub fn exit_calls(&self) -> &ExitCallTable {
        &self.exit_calls
    }

    /// Raw boundary call with a caller-built parameter stack
    pub fn enclave_call(&self, selector: Selector, params: &mut ParameterStack<'_>) -> EnclaveResult<()> {
        self.bridge.call(selector, params)
    }

    /// Initialize the region with its name and a serialized configuration
    pub fn initialize(&self, enclave_name: &str, input: &[u8]) -> EnclaveResult<Vec<u8>> {
        let mut params = ParameterStack::new();
        params.push_by_reference(enclave_name.as_bytes());
        params.push_by_reference(input);
        self.call_with_output(SELECTOR_INIT, &mut params)
    }

    pub fn run(&self, input: &[u8]) -> EnclaveResult<Vec<u8>> {
        let mut params = ParameterStack::new();
        params.push_by_reference(input);
        self.call_with_output(SELECTOR_RUN, &mut params)
    }

    pub fn finalize(&self, input: &[u8]) -> EnclaveResult<Vec<u8>> {
        let mut params = ParameterStack::new();
        params.push_by_reference(input);
        self.call_with_output(SELECTOR_FINI, &mut params)
    }

    pub fn deliver_signal(&self, signal: &[u8]) -> EnclaveResult<()> {
        let mut params = ParameterStack::new();
        params.push_by_reference(signal);
        self.bridge.call(SELECTOR_HANDLE_SIGNAL, &mut params)
    }

    /// Release the region; a failure is reported, never retried
    pub fn destroy(&self) -> EnclaveResult<()> {
        let status = self.driver.destroy(self.id);
        if status != NativeStatus::Success {
            return Err(EnclaveError::boundary(status, "Failed to destroy enclave"));
        }
        info!("Destroyed enclave {} (id {})", self.name, self.id);
        Ok(())
    }

    fn call_with_output(&self, selector: Selector, params: &mut ParameterStack<'_>) -> EnclaveResult<Vec<u8>> {
        self.bridge.call(selector, params)?;
        // An untouched output slot means the region produced no output
        Ok(params.take_output().unwrap_or_default())
    }
}
