/*!
 * Simulated Driver
 * In-process native driver hosting regions as ordinary Rust programs
 *
 * Images are registered by content; creating a region from a file or buffer
 * with matching bytes instantiates the registered program. Creation outcomes
 * can be scripted to exercise retry and failure paths.
 */

use super::bridge::MarshalRecord;
use super::dispatch::ExitCallTable;
use super::extent::ParameterStack;
use super::native::{
    CreateParams, CreatedRegion, EnclaveId, LaunchToken, NativeDriver, NativeStatus,
};
use super::selectors::{SELECTOR_FINI, SELECTOR_HANDLE_SIGNAL, SELECTOR_INIT, SELECTOR_RUN};
use crate::core::{Address, Selector, Size};
use log::debug;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Image bytes match no registered program
pub const STATUS_INVALID_ENCLAVE: u32 = 0x2001;
/// Enclave id does not name a live region
pub const STATUS_INVALID_ENCLAVE_ID: u32 = 0x2003;
/// Image file could not be read
pub const STATUS_ENCLAVE_FILE_ACCESS: u32 = 0x200f;

const PAGE_SIZE: usize = 4096;
const SIMULATED_BASE: Address = 0x7e00_0000_0000;
const SIMULATED_STRIDE: Address = 0x0010_0000_0000;

/// Code running inside a simulated region
pub trait RegionProgram: Send + Sync {
    /// Handle one entry; the return value is the in-region return code
    fn dispatch(&self, selector: Selector, params: &mut ParameterStack<'_>, exits: &ExitCallTable) -> i32;
}

/// Closure-backed program
pub struct FnProgram<F>(F);

impl<F> RegionProgram for FnProgram<F>
where
    F: Fn(Selector, &mut ParameterStack<'_>, &ExitCallTable) -> i32 + Send + Sync,
{
    fn dispatch(&self, selector: Selector, params: &mut ParameterStack<'_>, exits: &ExitCallTable) -> i32 {
        (self.0)(selector, params, exits)
    }
}

/// Wrap a closure as a region program
pub fn program_fn<F>(f: F) -> Arc<dyn RegionProgram>
where
    F: Fn(Selector, &mut ParameterStack<'_>, &ExitCallTable) -> i32 + Send + Sync + 'static,
{
    Arc::new(FnProgram(f))
}

/// Program that accepts every lifecycle call and echoes Run payloads
///
/// Records the selectors it was entered with and the raw bytes of every
/// delivered signal.
#[derive(Default)]
pub struct EchoProgram {
    calls: Mutex<Vec<Selector>>,
    signals: Mutex<Vec<Vec<u8>>>,
    config: Mutex<Option<Vec<u8>>>,
}

impl EchoProgram {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Selector> {
        self.calls.lock().clone()
    }

    pub fn signals(&self) -> Vec<Vec<u8>> {
        self.signals.lock().clone()
    }

    /// Serialized configuration received by Initialize
    pub fn config(&self) -> Option<Vec<u8>> {
        self.config.lock().clone()
    }
}

impl RegionProgram for EchoProgram {
    fn dispatch(&self, selector: Selector, params: &mut ParameterStack<'_>, _exits: &ExitCallTable) -> i32 {
        self.calls.lock().push(selector);
        match selector {
            SELECTOR_INIT => {
                let config = params.pop().map(|e| e.into_vec()).unwrap_or_default();
                let name = params.pop().map(|e| e.into_vec()).unwrap_or_default();
                *self.config.lock() = Some(config);
                params.write_output(name);
                0
            }
            SELECTOR_RUN => {
                // Input and output records share one layout
                let input = params.pop().map(|e| e.into_vec()).unwrap_or_default();
                params.write_output(input);
                0
            }
            SELECTOR_FINI => {
                params.clear();
                0
            }
            SELECTOR_HANDLE_SIGNAL => {
                let signal = params.pop().map(|e| e.into_vec()).unwrap_or_default();
                self.signals.lock().push(signal);
                0
            }
            _ => 1,
        }
    }
}

struct SimulatedRegion {
    program: Arc<dyn RegionProgram>,
    size: Size,
}

/// In-process `NativeDriver`
pub struct SimulatedDriver {
    images: RwLock<Vec<(Vec<u8>, Arc<dyn RegionProgram>)>>,
    regions: Mutex<HashMap<EnclaveId, SimulatedRegion>>,
    next_id: AtomicU64,
    create_script: Mutex<VecDeque<NativeStatus>>,
    create_attempts: AtomicU32,
    create_params: Mutex<Vec<CreateParams>>,
    ecall_status: Mutex<Option<NativeStatus>>,
    destroy_status: Mutex<Option<NativeStatus>>,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self {
            images: RwLock::new(Vec::new()),
            regions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            create_script: Mutex::new(VecDeque::new()),
            create_attempts: AtomicU32::new(0),
            create_params: Mutex::new(Vec::new()),
            ecall_status: Mutex::new(None),
            destroy_status: Mutex::new(None),
        }
    }
}

impl SimulatedDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Associate image bytes with the program regions created from them run
    pub fn register_image(&self, image: impl Into<Vec<u8>>, program: Arc<dyn RegionProgram>) {
        self.images.write().push((image.into(), program));
    }

    /// Queue outcomes for the next creation attempts
    ///
    /// Each attempt consumes one queued status; `Success` lets the attempt
    /// proceed normally. An empty queue means every attempt proceeds.
    pub fn script_create_outcomes<I>(&self, outcomes: I)
    where
        I: IntoIterator<Item = NativeStatus>,
    {
        self.create_script.lock().extend(outcomes);
    }

    /// Make every transfer report `status` (None restores normal entry)
    pub fn fail_ecalls_with(&self, status: Option<NativeStatus>) {
        *self.ecall_status.lock() = status;
    }

    /// Make every destroy report `status` (None restores normal teardown)
    pub fn fail_destroy_with(&self, status: Option<NativeStatus>) {
        *self.destroy_status.lock() = status;
    }

    pub fn create_attempts(&self) -> u32 {
        self.create_attempts.load(Ordering::SeqCst)
    }

    /// Parameters of every creation attempt so far
    pub fn create_params(&self) -> Vec<CreateParams> {
        self.create_params.lock().clone()
    }

    pub fn live_regions(&self) -> usize {
        self.regions.lock().len()
    }

    pub fn is_live(&self, id: EnclaveId) -> bool {
        self.regions.lock().contains_key(&id)
    }

    fn create(&self, image: &[u8], params: &CreateParams) -> Result<CreatedRegion, NativeStatus> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);
        self.create_params.lock().push(*params);

        if let Some(status) = self.create_script.lock().pop_front() {
            if status != NativeStatus::Success {
                return Err(status);
            }
        }

        let program = self
            .images
            .read()
            .iter()
            .find(|(bytes, _)| bytes.as_slice() == image)
            .map(|(_, program)| Arc::clone(program))
            .ok_or(NativeStatus::Failure(STATUS_INVALID_ENCLAVE))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let base_address = if params.base_address != 0 {
            params.base_address
        } else {
            SIMULATED_BASE + (id as Address) * SIMULATED_STRIDE
        };
        let size = if params.enclave_size != 0 {
            params.enclave_size
        } else {
            image.len().max(1).div_ceil(PAGE_SIZE) * PAGE_SIZE
        };

        self.regions
            .lock()
            .insert(id, SimulatedRegion { program, size });
        debug!("Simulated region {} created at 0x{:x}", id, base_address);

        Ok(CreatedRegion { id, base_address })
    }
}

impl NativeDriver for SimulatedDriver {
    fn create_from_file(
        &self,
        path: &Path,
        params: &CreateParams,
        token: &mut LaunchToken,
    ) -> Result<CreatedRegion, NativeStatus> {
        let image =
            std::fs::read(path).map_err(|_| NativeStatus::Failure(STATUS_ENCLAVE_FILE_ACCESS))?;
        let region = self.create(&image, params)?;
        token.as_mut_bytes()[..8].copy_from_slice(&region.id.to_le_bytes());
        Ok(region)
    }

    fn create_from_buffer(
        &self,
        image: &[u8],
        params: &CreateParams,
    ) -> Result<CreatedRegion, NativeStatus> {
        self.create(image, params)
    }

    fn destroy(&self, id: EnclaveId) -> NativeStatus {
        if let Some(status) = *self.destroy_status.lock() {
            return status;
        }
        match self.regions.lock().remove(&id) {
            Some(_) => NativeStatus::Success,
            None => NativeStatus::Failure(STATUS_INVALID_ENCLAVE_ID),
        }
    }

    fn ecall(
        &self,
        id: EnclaveId,
        exit_calls: &ExitCallTable,
        record: &mut MarshalRecord<'_, '_>,
    ) -> NativeStatus {
        if let Some(status) = *self.ecall_status.lock() {
            return status;
        }

        // Release the region table before running region code
        let program = match self.regions.lock().get(&id) {
            Some(region) => Arc::clone(&region.program),
            None => return NativeStatus::Failure(STATUS_INVALID_ENCLAVE_ID),
        };

        record.retval = program.dispatch(record.selector, record.params, exit_calls);
        NativeStatus::Success
    }

    fn enclave_size(&self, id: EnclaveId) -> Size {
        self.regions.lock().get(&id).map(|r| r.size).unwrap_or(0)
    }
}
