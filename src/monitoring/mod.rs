/*!
 * Monitoring
 * Structured tracing for the enclave host
 */

mod tracer;

pub use tracer::{init_tracing, LifecycleSpan};
