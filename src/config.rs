//! Effect configuration.
//!
//! All parameters are fixed for the lifetime of a [`Pipeline`](crate::pipeline::Pipeline):
//! they are read once, validated once, and sized into the delay buffer at
//! startup. Defaults follow the reference tuning: two echoes 25 ms apart at
//! 16 kHz, mixed 4:6 in favor of the echo, with the sample clock requested
//! at 13 kHz.
//!
//! # Example
//!
//! ```toml
//! taps = 4
//! delay_ms = 100
//! sample_rate_khz = 16
//! mix = 5
//! clock_hz = 13000
//! ```

use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    mix::Mix,
};

/// Largest tap count with a normalization entry.
pub const MAX_NORMALIZED_TAPS: usize = 10;

/// Upper bound on the delay buffer, in samples.
pub const MAX_CAPACITY: usize = 1 << 24;

/// Fixed parameters of the echo effect and its sample clock.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of tap positions, the live position included. The effect
    /// produces `taps - 1` echoes.
    pub taps: usize,

    /// Delay between consecutive echoes, in milliseconds.
    pub delay_ms: u32,

    /// Nominal sample rate in kHz, used to turn the delay into samples.
    pub sample_rate_khz: u32,

    /// Balance of live signal against echo, from 0 (echo only) to 10 (live
    /// only).
    pub mix: u8,

    /// Rate requested from the sample clock, in Hz.
    pub clock_hz: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            taps: 3,
            delay_ms: 25,
            sample_rate_khz: 16,
            mix: 4,
            clock_hz: 13_000,
        }
    }
}

impl Config {
    /// Reads a configuration from a TOML file. Missing keys take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this configuration.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&contents)?;
        debug!("loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the TOML is malformed or contains
    /// unknown keys.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Checks the parameters against the ranges the effect is defined for.
    ///
    /// Tap counts above [`MAX_NORMALIZED_TAPS`] are accepted with a warning:
    /// their echo is not normalized and may clip at the output.
    ///
    /// # Errors
    ///
    /// * `Error::InvalidArgument` - fewer than two taps, a zero delay, a
    ///   zero sample rate or a zero clock rate
    /// * `Error::OutOfRange` - mix above 10 or a delay buffer larger than
    ///   [`MAX_CAPACITY`]
    pub fn validate(&self) -> Result<()> {
        if self.taps < 2 {
            return Err(Error::invalid_argument(format!(
                "taps must be at least 2, got {}",
                self.taps
            )));
        }
        if self.delay_ms == 0 || self.sample_rate_khz == 0 {
            return Err(Error::invalid_argument(format!(
                "delay of {} ms at {} kHz spans no samples",
                self.delay_ms, self.sample_rate_khz
            )));
        }
        if self.clock_hz == 0 {
            return Err(Error::invalid_argument("clock rate must be non-zero"));
        }

        Mix::new(self.mix)?;

        let capacity = self
            .checked_capacity()
            .filter(|&capacity| capacity <= MAX_CAPACITY)
            .ok_or_else(|| {
                Error::out_of_range(format!(
                    "{} taps of {} ms at {} kHz exceed {MAX_CAPACITY} samples",
                    self.taps, self.delay_ms, self.sample_rate_khz
                ))
            })?;

        if self.taps > MAX_NORMALIZED_TAPS {
            warn!(
                "{} taps have no normalization entry; echoes may clip",
                self.taps
            );
        }

        trace!("validated {:?}: {capacity} samples", self);
        Ok(())
    }

    /// Distance between consecutive taps, in samples.
    #[must_use]
    pub fn tap_spacing(&self) -> usize {
        self.sample_rate_khz as usize * self.delay_ms as usize
    }

    /// Size of the delay buffer, in samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.taps * self.tap_spacing()
    }

    /// Highest valid buffer position.
    #[must_use]
    pub fn top_address(&self) -> usize {
        self.capacity().saturating_sub(1)
    }

    /// Nominal sample rate in Hz.
    #[must_use]
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_khz.saturating_mul(1000)
    }

    /// The mix ratio.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfRange` if `mix` exceeds 10.
    pub fn mix(&self) -> Result<Mix> {
        Mix::new(self.mix)
    }

    fn checked_capacity(&self) -> Option<usize> {
        (self.sample_rate_khz as usize)
            .checked_mul(self.delay_ms as usize)?
            .checked_mul(self.taps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_derive_reference_geometry() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.tap_spacing(), 400);
        assert_eq!(config.capacity(), 1200);
        assert_eq!(config.top_address(), 1199);
        assert_eq!(config.sample_rate_hz(), 16_000);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml("taps = 5\nmix = 7\n").unwrap();
        assert_eq!(config.taps, 5);
        assert_eq!(config.mix, 7);
        assert_eq!(config.delay_ms, 25);
        assert_eq!(config.clock_hz, 13_000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml("feedback = 3\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn too_few_taps_are_rejected() {
        let config = Config {
            taps: 1,
            ..Config::default()
        };
        assert_eq!(config.validate().unwrap_err().kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn mix_above_ten_is_rejected() {
        let config = Config {
            mix: 11,
            ..Config::default()
        };
        assert_eq!(config.validate().unwrap_err().kind, ErrorKind::OutOfRange);
    }

    #[test]
    fn zero_delay_is_rejected() {
        let config = Config {
            delay_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.validate().unwrap_err().kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn oversized_buffer_is_rejected() {
        let config = Config {
            taps: 10,
            delay_ms: u32::MAX,
            ..Config::default()
        };
        assert_eq!(config.validate().unwrap_err().kind, ErrorKind::OutOfRange);
    }

    #[test]
    fn unnormalized_tap_counts_are_accepted() {
        let config = Config {
            taps: 12,
            ..Config::default()
        };
        config.validate().unwrap();
    }
}
