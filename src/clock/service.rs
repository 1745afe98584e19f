/*!
 * Clock Service
 *
 * Background thread publishing monotonic and realtime timestamps into
 * shared atomics, so code inside a region can read the time without a
 * boundary call.
 */

use crate::core::{EnclaveError, EnclaveResult, Nanoseconds};
use log::{info, warn};
use nix::time::{clock_gettime, ClockId};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Interval between two published timestamps
pub const CLOCK_PERIOD: Duration = Duration::from_micros(70);

const CLOCK_THREAD_NAME: &str = "enclave-clock";

/// Most recently published timestamps
#[derive(Debug, Default)]
pub struct ClockState {
    monotonic: Arc<AtomicI64>,
    realtime: Arc<AtomicI64>,
}

impl ClockState {
    pub fn monotonic(&self) -> Nanoseconds {
        self.monotonic.load(Ordering::Acquire)
    }

    pub fn realtime(&self) -> Nanoseconds {
        self.realtime.load(Ordering::Acquire)
    }

    /// Shared cell holding the monotonic timestamp
    pub fn monotonic_cell(&self) -> Arc<AtomicI64> {
        Arc::clone(&self.monotonic)
    }

    /// Shared cell holding the realtime timestamp
    pub fn realtime_cell(&self) -> Arc<AtomicI64> {
        Arc::clone(&self.realtime)
    }

    /// Read both clocks and publish them
    pub fn tick(&self) -> EnclaveResult<()> {
        self.monotonic
            .store(read_clock(ClockId::CLOCK_MONOTONIC)?, Ordering::Release);
        self.realtime
            .store(read_clock(ClockId::CLOCK_REALTIME)?, Ordering::Release);
        Ok(())
    }
}

fn read_clock(clock: ClockId) -> EnclaveResult<Nanoseconds> {
    let now = clock_gettime(clock)
        .map_err(|e| EnclaveError::Internal(format!("clock_gettime({:?}) failed: {}", clock, e)))?;
    Ok(now.tv_sec() as i64 * 1_000_000_000 + now.tv_nsec() as i64)
}

/// Handle to the clock thread
///
/// Dropping the handle stops and joins the thread. The thread also exits on
/// its own once every owner of the clock state is gone.
pub struct ClockService {
    state: Arc<ClockState>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ClockService {
    pub fn start() -> EnclaveResult<Self> {
        Self::start_with_period(CLOCK_PERIOD)
    }

    /// Publish one timestamp synchronously, then spawn the clock thread
    pub fn start_with_period(period: Duration) -> EnclaveResult<Self> {
        let state = Arc::new(ClockState::default());
        state.tick()?;

        let stop = Arc::new(AtomicBool::new(false));
        let weak = Arc::downgrade(&state);
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name(CLOCK_THREAD_NAME.into())
            .spawn(move || run_clock_loop(weak, thread_stop, period))
            .map_err(|e| {
                EnclaveError::ResourceExhausted(format!("Failed to spawn clock thread: {}", e))
            })?;

        info!("Clock service started with a {:?} period", period);

        Ok(Self {
            state,
            stop,
            handle: Some(handle),
        })
    }

    pub fn state(&self) -> &Arc<ClockState> {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for ClockService {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Clock thread panicked");
            }
        }
    }
}

fn run_clock_loop(state: Weak<ClockState>, stop: Arc<AtomicBool>, period: Duration) {
    let mut next_tick = Instant::now() + period;
    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        }
        let Some(state) = state.upgrade() else {
            break;
        };
        if let Err(e) = state.tick() {
            warn!("Clock tick failed: {}", e);
        }
        next_tick = next_deadline(next_tick, period, Instant::now());
    }
}

/// Next tick on the fixed grid anchored at `previous`
///
/// Slots already in the past are skipped rather than replayed in a burst.
fn next_deadline(previous: Instant, period: Duration, now: Instant) -> Instant {
    let next = previous + period;
    if next > now || period.is_zero() {
        return next;
    }
    let behind = now.duration_since(next).as_nanos();
    let skipped = behind / period.as_nanos() + 1;
    next + period * skipped as u32
}
