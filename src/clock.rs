//! Periodic sample clock.
//!
//! Runs on its own thread and plays the part of a hardware timer whose
//! time-out triggers a conversion: at every firing it performs one
//! conversion and stages the result in the [`Handoff`]. It does nothing
//! else, and never waits on the tick loop.
//!
//! The period is derived the way a timer load register would be: the
//! reference clock divided by the requested rate, truncated to whole
//! reference ticks. The actual rate is therefore slightly above the
//! requested one, and is left that way.

use std::{
    hint,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    adc::Adc,
    error::{Error, Result},
    handoff::Handoff,
};

/// Reference clock the timer period is derived from, in Hz.
pub const SYSTEM_CLOCK_HZ: u32 = 80_000_000;

/// Remaining wait below which the clock spins instead of sleeping.
const SPIN_THRESHOLD: Duration = Duration::from_micros(200);

/// Returns the timer load value for `rate_hz`, in reference clock ticks.
#[must_use]
pub fn timer_load(rate_hz: u32) -> u32 {
    SYSTEM_CLOCK_HZ / rate_hz.max(1)
}

/// Returns the firing period for `rate_hz`.
#[must_use]
pub fn timer_period(rate_hz: u32) -> Duration {
    let load = u64::from(timer_load(rate_hz));
    Duration::from_nanos(load * 1_000_000_000 / u64::from(SYSTEM_CLOCK_HZ))
}

/// Handle to a running sample clock thread.
#[derive(Debug)]
pub struct SampleClock {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<u64>>>,
}

impl SampleClock {
    /// Starts firing at `rate_hz`, converting from `adc` into `handoff`.
    ///
    /// The handoff is closed when the source runs dry, fails, or the clock
    /// is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if `rate_hz` is zero or the thread cannot be spawned.
    pub fn spawn<A>(rate_hz: u32, mut adc: A, handoff: Arc<Handoff>) -> Result<Self>
    where
        A: Adc + Send + 'static,
    {
        if rate_hz == 0 {
            return Err(Error::invalid_argument("sample clock rate must be non-zero"));
        }

        let period = timer_period(rate_hz);
        let stop = Arc::new(AtomicBool::new(false));

        debug!(
            "starting sample clock at {rate_hz} Hz (load {}, period {period:?})",
            timer_load(rate_hz)
        );

        let thread = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("sample-clock".to_string())
                .spawn(move || {
                    let result = fire(period, &mut adc, &handoff, &stop);
                    handoff.close();
                    result
                })?
        };

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Asks the clock to stop after its current firing.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Waits for the clock thread to finish and returns how many values it
    /// staged.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the source, or `Error::Internal` if
    /// the clock thread panicked.
    pub fn join(mut self) -> Result<u64> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| Error::internal("sample clock thread panicked"))?,
            None => Ok(0),
        }
    }
}

impl Drop for SampleClock {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.stop();
            if let Ok(Err(e)) = thread.join() {
                error!("sample clock stopped: {e}");
            }
        }
    }
}

/// Clock thread body: fires until stopped or the source runs dry.
fn fire<A>(period: Duration, adc: &mut A, handoff: &Handoff, stop: &AtomicBool) -> Result<u64>
where
    A: Adc,
{
    let mut firings = 0;
    let mut deadline = Instant::now();

    while !stop.load(Ordering::Acquire) {
        deadline += period;
        wait_until(deadline);

        match adc.convert()? {
            Some(raw) => {
                handoff.write(raw);
                firings += 1;
            }
            None => {
                debug!("input exhausted after {firings} samples");
                break;
            }
        }
    }

    Ok(firings)
}

/// Sleeps most of the way to `deadline`, then spins for the remainder.
fn wait_until(deadline: Instant) {
    let now = Instant::now();
    if deadline <= now {
        return;
    }

    let remaining = deadline - now;
    if remaining > SPIN_THRESHOLD {
        thread::sleep(remaining - SPIN_THRESHOLD);
    }
    while Instant::now() < deadline {
        hint::spin_loop();
    }
}
