/*!
 * Trusted-Call Bridge
 * Marshals a selector and parameter stack across the trust boundary
 */

use super::dispatch::ExitCallTable;
use super::extent::ParameterStack;
use super::native::{EnclaveId, NativeDriver, NativeStatus};
use crate::core::{EnclaveError, EnclaveResult, Selector};
use log::{debug, warn};
use std::sync::Arc;

/// Marshalling record handed to the native entry point
///
/// The region writes its own return code into `retval`; it is meaningful only
/// when the transfer itself reports success.
#[derive(Debug)]
pub struct MarshalRecord<'s, 'a> {
    pub retval: i32,
    pub selector: Selector,
    pub params: &'s mut ParameterStack<'a>,
}

/// Boundary-call channel into one region
#[derive(Clone)]
pub struct TrustedCallBridge {
    driver: Arc<dyn NativeDriver>,
    id: EnclaveId,
    exit_calls: ExitCallTable,
}

impl TrustedCallBridge {
    pub fn new(driver: Arc<dyn NativeDriver>, id: EnclaveId, exit_calls: ExitCallTable) -> Self {
        Self {
            driver,
            id,
            exit_calls,
        }
    }

    pub fn enclave_id(&self) -> EnclaveId {
        self.id
    }

    /// Perform exactly one synchronous transfer into the region
    ///
    /// A failed transfer is a `Boundary` error carrying the native status; a
    /// successful transfer with a nonzero in-region return code is an
    /// `EnclaveInternal` error.
    pub fn call(&self, selector: Selector, params: &mut ParameterStack<'_>) -> EnclaveResult<()> {
        let mut record = MarshalRecord {
            retval: 0,
            selector,
            params,
        };

        debug!("Entering enclave {} with selector {}", self.id, selector);
        let status = self.driver.ecall(self.id, &self.exit_calls, &mut record);

        if status != NativeStatus::Success {
            warn!(
                "Transfer into enclave {} failed for selector {}: {}",
                self.id, selector, status
            );
            return Err(EnclaveError::boundary(
                status,
                "Call to primitives ecall endpoint failed",
            ));
        }
        if record.retval != 0 {
            return Err(EnclaveError::EnclaveInternal(format!(
                "Enclave call failed inside enclave (selector {}, code {})",
                selector, record.retval
            )));
        }
        Ok(())
    }
}
