/*!
 * Primitives Module
 * Native region creation, the trusted-call bridge and backend loaders
 */

pub mod bridge;
pub mod client;
pub mod dispatch;
pub mod embedded;
pub mod extent;
pub mod file;
pub mod native;
pub mod reservation;
pub mod retry;
pub mod selectors;
pub mod simulated;

// Re-export public API
pub use bridge::{MarshalRecord, TrustedCallBridge};
pub use client::PrimitiveClient;
pub use dispatch::{ExitCallTable, ExitHandlerFn};
pub use embedded::{EmbeddedBackend, SectionImage, CALLING_PROCESS_BINARY_FILE};
pub use extent::{Extent, ParameterStack};
pub use file::FileBackend;
pub use native::{
    CreateParams, CreatedRegion, EnclaveId, LaunchToken, NativeDriver, NativeStatus,
    LAUNCH_TOKEN_SIZE,
};
pub use reservation::AddressReservation;
pub use retry::{RetryPolicy, MAX_CREATE_RETRIES};
pub use simulated::{program_fn, EchoProgram, RegionProgram, SimulatedDriver};
