/*!
 * Signals Module
 * Routing of OS signals into enclaves
 */

mod dispatcher;
mod handler;
mod mask;
pub mod types;

// Re-export public API
pub use dispatcher::SignalDispatcher;
pub use handler::install_host_handler;
pub use mask::SignalMaskGuard;
pub use types::{EnclaveSignal, GREG_COUNT};
