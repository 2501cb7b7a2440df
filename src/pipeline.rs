//! The per-tick echo pipeline.
//!
//! Every acquired sample goes through the same fixed sequence:
//! 1. Read the raw value staged in the [`Handoff`]
//! 2. Write it, masked to 12 bits, at the live position
//! 3. Sum the echo taps
//! 4. Blend the live sample with the echo
//! 5. Frame the result and send it to the [`Dac`], waiting for completion
//! 6. Advance the tap positions
//! 7. Acknowledge the handoff, lowering its ready flag
//!
//! The order matters. The echo taps read slots written on earlier ticks,
//! which is what delays them, and the rotation must not move before the
//! tick's reads and writes are done. Acknowledging last means a value
//! staged while the tick runs is dropped, not queued.
//!
//! [`Pipeline::run`] is idle while it waits on the handoff and processing
//! while a tick runs. Ticks never overlap.

use std::hint;

use crate::{
    config::Config,
    dac::{self, Dac},
    echo::EchoMixer,
    error::Result,
    handoff::{Acquisition, Handoff},
    mix::Mix,
    ringbuf::SampleBuffer,
    sample::{self, Sample},
    taps::TapSet,
};

/// Where [`Pipeline::run`] is in its cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum State {
    /// Waiting for the next sample.
    Idle,

    /// Running a tick on the raw value read from the handoff.
    Processing(u32),
}

/// Multi-tap echo processor.
///
/// Owns the delay buffer and the tap rotation. Everything is allocated on
/// construction; ticks do not allocate.
#[derive(Debug, Clone)]
pub struct Pipeline {
    buffer: SampleBuffer,
    taps: TapSet,
    echo: EchoMixer,
    mix: Mix,
    ticks: u64,
}

impl Pipeline {
    /// Builds a pipeline from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let pipeline = Self::with_geometry(config.tap_spacing(), config.taps, config.mix()?);

        debug!(
            "{} echoes every {} ms ({} samples), buffer of {} samples, mix {}",
            config.taps - 1,
            config.delay_ms,
            pipeline.taps.tap_spacing(),
            pipeline.buffer.capacity(),
            pipeline.mix
        );

        Ok(pipeline)
    }

    /// Builds a pipeline of `tap_count` positions spaced `tap_spacing`
    /// samples apart.
    ///
    /// # Panics
    ///
    /// Panics if `tap_count` is less than 2 or `tap_spacing` is zero.
    #[must_use]
    pub fn with_geometry(tap_spacing: usize, tap_count: usize, mix: Mix) -> Self {
        Self {
            buffer: SampleBuffer::new(tap_spacing * tap_count),
            taps: TapSet::new(tap_spacing, tap_count),
            echo: EchoMixer::new(tap_count),
            mix,
            ticks: 0,
        }
    }

    /// Processes one raw acquisition value and dispatches the result.
    ///
    /// Runs steps 2 through 6; the handoff is left to the caller. Returns the
    /// sample that was sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails. The rotation still advances, so
    /// the pipeline stays consistent.
    pub fn tick<D>(&mut self, raw: u32, sink: &mut D) -> Result<Sample>
    where
        D: Dac + ?Sized,
    {
        let live = sample::from_raw(raw);
        self.buffer.write(self.taps.live(), live);

        let echo = self.echo.compute(&self.buffer, &self.taps);
        let output = self.mix.blend(self.buffer.read(self.taps.live()), echo);
        trace!("tick {}: live {live} echo {echo} out {output}", self.ticks);

        let sent = sink.send(dac::frame(output));

        self.taps.advance(self.buffer.top_address());
        self.ticks += 1;

        sent.map(|()| output)
    }

    /// Runs a tick for every value staged in `handoff` until it closes.
    ///
    /// Busy-waits while no value is staged, and acknowledges each value only
    /// once its tick is done. Returns the number of ticks run.
    ///
    /// # Errors
    ///
    /// Returns the first sink error. The failed tick is still acknowledged.
    pub fn run<D>(&mut self, handoff: &Handoff, sink: &mut D) -> Result<u64>
    where
        D: Dac + ?Sized,
    {
        let start = self.ticks;
        let mut state = State::Idle;

        loop {
            state = match state {
                State::Idle => match handoff.peek() {
                    Acquisition::Ready(raw) => State::Processing(raw),
                    Acquisition::Pending => {
                        hint::spin_loop();
                        State::Idle
                    }
                    Acquisition::Closed => break,
                },
                State::Processing(raw) => {
                    let ticked = self.tick(raw, sink);
                    handoff.acknowledge();
                    ticked?;
                    State::Idle
                }
            };
        }

        let ticks = self.ticks - start;
        debug!("handoff closed after {ticks} ticks");
        Ok(ticks)
    }

    /// Clears the delay buffer and restores the initial tap rotation.
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.taps.reset();
    }

    /// Total ticks run since construction.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The current tap rotation.
    #[must_use]
    pub fn taps(&self) -> &TapSet {
        &self.taps
    }

    /// The delay buffer.
    #[must_use]
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// The live/echo balance.
    #[must_use]
    pub fn mix(&self) -> Mix {
        self.mix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dac::NullDac,
        error::{Error, ErrorKind},
    };

    struct FailingDac;

    /// Stages a new value in the handoff on its first send, then closes it.
    struct StagingDac<'a> {
        handoff: &'a Handoff,
        raw: Option<u32>,
    }

    impl Dac for StagingDac<'_> {
        fn send(&mut self, _word: u16) -> Result<()> {
            if let Some(raw) = self.raw.take() {
                self.handoff.write(raw);
                self.handoff.close();
            }
            Ok(())
        }
    }

    impl Dac for FailingDac {
        fn send(&mut self, _word: u16) -> Result<()> {
            Err(Error::new(ErrorKind::Unavailable, "converter busy"))
        }
    }

    #[test]
    fn live_sample_is_written_before_blending() {
        let mut pipeline = Pipeline::with_geometry(4, 3, Mix::LIVE);
        let mut words: Vec<u16> = Vec::new();
        assert_eq!(pipeline.tick(1234, &mut words).unwrap(), 1234);
        assert_eq!(words, vec![0x4000 | 1234]);
    }

    #[test]
    fn wide_acquisition_values_are_masked() {
        let mut pipeline = Pipeline::with_geometry(4, 3, Mix::LIVE);
        assert_eq!(pipeline.tick(0xDEAD_BABC, &mut NullDac).unwrap(), 0x0ABC);
        assert_eq!(pipeline.buffer().read(0), 0x0ABC);
    }

    #[test]
    fn tick_advances_rotation() {
        let mut pipeline = Pipeline::with_geometry(4, 3, Mix::default());
        pipeline.tick(1, &mut NullDac).unwrap();
        assert_eq!(pipeline.taps().positions(), &[1, 4, 8]);
        assert_eq!(pipeline.ticks(), 1);
    }

    #[test]
    fn sink_failure_keeps_rotation_consistent() {
        let mut pipeline = Pipeline::with_geometry(4, 3, Mix::default());
        assert!(pipeline.tick(1, &mut FailingDac).is_err());
        assert_eq!(pipeline.taps().positions(), &[1, 4, 8]);
    }

    #[test]
    fn run_acknowledges_failed_tick() {
        let mut pipeline = Pipeline::with_geometry(4, 3, Mix::default());
        let handoff = Handoff::new();
        handoff.write(1);

        assert!(pipeline.run(&handoff, &mut FailingDac).is_err());
        assert!(!handoff.is_ready());
    }

    #[test]
    fn run_drains_handoff_until_closed() {
        let mut pipeline = Pipeline::with_geometry(4, 3, Mix::LIVE);
        let handoff = Handoff::new();
        handoff.write(5);
        handoff.close();

        let mut words: Vec<u16> = Vec::new();
        assert_eq!(pipeline.run(&handoff, &mut words).unwrap(), 1);
        assert_eq!(words, vec![0x4005]);
        assert!(!handoff.is_ready());
    }

    #[test]
    fn value_staged_during_tick_is_dropped() {
        let mut pipeline = Pipeline::with_geometry(4, 3, Mix::LIVE);
        let handoff = Handoff::new();
        handoff.write(5);

        let mut sink = StagingDac {
            handoff: &handoff,
            raw: Some(999),
        };
        assert_eq!(pipeline.run(&handoff, &mut sink).unwrap(), 1);
        assert_eq!(handoff.peek(), Acquisition::Closed);
        assert_eq!(pipeline.ticks(), 1);
    }

    #[test]
    fn reset_restores_silence() {
        let mut pipeline = Pipeline::with_geometry(4, 3, Mix::ECHO);
        for _ in 0..20 {
            pipeline.tick(4095, &mut NullDac).unwrap();
        }
        pipeline.reset();
        assert_eq!(pipeline.taps(), &TapSet::new(4, 3));
        assert_eq!(pipeline.tick(4095, &mut NullDac).unwrap(), 0);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = Config {
            mix: 42,
            ..Config::default()
        };
        assert!(Pipeline::new(&config).is_err());
    }
}
