//! Decay-weighted echo summation.
//!
//! Each echo tap `n` contributes `sample * n / taps`, with the division
//! floored per tap. Taps further ahead of the live position hold more recent
//! samples, so the weighting favors recent echoes and lets older ones decay.
//!
//! The raw sum grows with the number of taps. A fixed normalization table,
//! tuned by ear rather than derived, scales it back into 12 bits:
//!
//! | taps | multiplier |
//! |------|------------|
//! | 4    | 0.6        |
//! | 5    | 0.5        |
//! | 6    | 0.4        |
//! | 7    | 0.3        |
//! | 8    | 0.28       |
//! | 9    | 0.25       |
//! | 10   | 0.22       |
//! | else | 1.0        |

use crate::{
    ringbuf::SampleBuffer,
    sample::{SAMPLE_MAX, Sample},
    taps::TapSet,
};

/// Denominator of the normalization percentages.
const PERCENT: u64 = 100;

/// Returns the normalization multiplier for `tap_count`, in percent.
///
/// Tap counts without a table entry, including the default of 3, are not
/// scaled.
#[must_use]
pub const fn normalization(tap_count: usize) -> u64 {
    match tap_count {
        4 => 60,
        5 => 50,
        6 => 40,
        7 => 30,
        8 => 28,
        9 => 25,
        10 => 22,
        _ => PERCENT,
    }
}

/// Sums the echo taps of a [`SampleBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoMixer {
    /// Number of positions in the tap set, live included
    tap_count: u64,

    /// Normalization multiplier in percent
    normalization: u64,
}

impl EchoMixer {
    /// Creates a mixer for a tap set of `tap_count` positions.
    ///
    /// # Panics
    ///
    /// Panics if `tap_count` is less than 2.
    #[must_use]
    pub fn new(tap_count: usize) -> Self {
        assert!(tap_count >= 2, "need at least one echo tap");
        let count = u64::try_from(tap_count).unwrap_or(u64::MAX);
        Self {
            tap_count: count,
            normalization: normalization(tap_count),
        }
    }

    /// Computes the normalized echo at the current tap rotation.
    ///
    /// Reads every echo tap once; the live position is left to the blender.
    /// The sum is accumulated in 64 bits and saturates, so any tap count the
    /// buffer can hold is safe.
    #[inline]
    #[must_use]
    pub fn compute(&self, buffer: &SampleBuffer, taps: &TapSet) -> Sample {
        let sum = taps.echoes().fold(0u64, |sum, (n, position)| {
            let weight = u64::try_from(n).unwrap_or(u64::MAX);
            let sample = u64::from(buffer.read(position));
            sum.saturating_add(sample.saturating_mul(weight) / self.tap_count)
        });
        let normalized = sum.saturating_mul(self.normalization) / PERCENT;

        // Tap counts without a normalization entry can exceed 12 bits; the
        // output framing confines the value again.
        #[allow(clippy::cast_possible_truncation)]
        let echo = normalized.min(u64::from(u16::MAX)) as Sample;
        echo
    }

    /// Largest echo a full-scale input can produce with this tap count,
    /// before saturation to 16 bits.
    #[must_use]
    pub fn ceiling(&self) -> u64 {
        let sum = (1..self.tap_count)
            .map(|n| u64::from(SAMPLE_MAX) * n / self.tap_count)
            .fold(0u64, u64::saturating_add);
        sum.saturating_mul(self.normalization) / PERCENT
    }

    /// Normalization multiplier in percent.
    #[must_use]
    pub fn normalization(&self) -> u64 {
        self.normalization
    }
}
