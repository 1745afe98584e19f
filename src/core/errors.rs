/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::primitives::NativeStatus;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for enclave host operations
pub type EnclaveResult<T> = Result<T, EnclaveError>;

/// Unified enclave host error with miette diagnostics
///
/// Variants map onto the failure domains a caller must tell apart: ordering
/// mistakes, bad arguments, name conflicts, resource exhaustion, failures of
/// the boundary transfer itself, and failures reported by code running inside
/// the region.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum EnclaveError {
    #[error("Failed precondition: {0}")]
    #[diagnostic(
        code(enclave::failed_precondition),
        help("The operation was called out of order. Configure the manager before requesting an instance.")
    )]
    FailedPrecondition(String),

    #[error("Invalid argument: {0}")]
    #[diagnostic(
        code(enclave::invalid_argument),
        help("Check the load configuration, backend record, or signal number.")
    )]
    InvalidArgument(String),

    #[error("Already exists: {0}")]
    #[diagnostic(
        code(enclave::already_exists),
        help("An enclave with this name is already loaded. Destroy it first or choose another name.")
    )]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    #[diagnostic(code(enclave::not_found))]
    NotFound(String),

    #[error("Resource exhausted: {0}")]
    #[diagnostic(
        code(enclave::resource_exhausted),
        help("The host could not allocate the resources needed for this operation.")
    )]
    ResourceExhausted(String),

    #[error("Boundary call failed ({status}): {message}")]
    #[diagnostic(
        code(enclave::boundary),
        help("The native enclave subsystem rejected the transfer. Inspect the native status code.")
    )]
    Boundary { status: NativeStatus, message: String },

    #[error("Enclave internal error: {0}")]
    #[diagnostic(
        code(enclave::internal_logic),
        help("The transfer succeeded but code inside the enclave reported a failure.")
    )]
    EnclaveInternal(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(enclave::internal_error))]
    Internal(String),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(enclave::serialization))]
    Serialization(String),
}

impl EnclaveError {
    /// Build a boundary error from a native status
    pub fn boundary(status: NativeStatus, message: impl Into<String>) -> Self {
        EnclaveError::Boundary {
            status,
            message: message.into(),
        }
    }

    /// Short, stable name of the error domain (used in structured logs)
    pub fn kind(&self) -> &'static str {
        match self {
            EnclaveError::FailedPrecondition(_) => "failed_precondition",
            EnclaveError::InvalidArgument(_) => "invalid_argument",
            EnclaveError::AlreadyExists(_) => "already_exists",
            EnclaveError::NotFound(_) => "not_found",
            EnclaveError::ResourceExhausted(_) => "resource_exhausted",
            EnclaveError::Boundary { .. } => "boundary",
            EnclaveError::EnclaveInternal(_) => "enclave_internal",
            EnclaveError::Internal(_) => "internal",
            EnclaveError::Serialization(_) => "serialization",
        }
    }
}

impl From<crate::core::bincode::BincodeError> for EnclaveError {
    fn from(err: crate::core::bincode::BincodeError) -> Self {
        EnclaveError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for EnclaveError {
    fn from(err: serde_json::Error) -> Self {
        EnclaveError::Serialization(err.to_string())
    }
}
