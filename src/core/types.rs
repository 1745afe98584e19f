/*!
 * Core Types
 * Common types used across the enclave host
 */

/// Virtual address of an enclave region
pub type Address = usize;

/// Size type for enclave regions
pub type Size = usize;

/// Operation code selecting the in-region handler of a boundary call
pub type Selector = u64;

/// OS signal number
pub type SignalNumber = i32;

/// Clock value in nanoseconds
pub type Nanoseconds = i64;
