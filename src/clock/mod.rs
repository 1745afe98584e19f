/*!
 * Clock Module
 * Timestamps published to regions as shared state
 */

mod service;

pub use service::{ClockService, ClockState, CLOCK_PERIOD};
