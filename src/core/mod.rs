/*!
 * Core Module
 * Fundamental types, identifiers, serialization and error handling
 */

pub mod bincode;
pub mod errors;
pub mod id;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use id::ClientId;
pub use types::*;
