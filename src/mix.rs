//! Live/echo blending.

use std::fmt;

use crate::{
    error::{Error, Result},
    sample::Sample,
};

/// Balance between the live signal and the echo, in tenths.
///
/// `Mix::LIVE` passes only the live signal, `Mix::ECHO` only the echo.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Mix(u8);

impl Mix {
    /// Number of steps between pure echo and pure live signal.
    pub const SCALE: u8 = 10;

    /// Pure echo.
    pub const ECHO: Self = Self(0);

    /// Pure live signal.
    pub const LIVE: Self = Self(Self::SCALE);

    /// Creates a mix ratio from a value in `0..=10`.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfRange` if `live` exceeds [`Mix::SCALE`].
    pub fn new(live: u8) -> Result<Self> {
        if live > Self::SCALE {
            return Err(Error::out_of_range(format!(
                "mix {live} exceeds {}",
                Self::SCALE
            )));
        }
        Ok(Self(live))
    }

    /// Weight of the live signal, in tenths.
    #[must_use]
    pub fn live(self) -> u8 {
        self.0
    }

    /// Weight of the echo, in tenths.
    #[must_use]
    pub fn echo(self) -> u8 {
        Self::SCALE - self.0
    }

    /// Blends `live` and `echo`, flooring each weighted term separately.
    #[inline]
    #[must_use]
    pub fn blend(self, live: Sample, echo: Sample) -> Sample {
        let scale = u32::from(Self::SCALE);
        let blended = u32::from(self.live()) * u32::from(live) / scale
            + u32::from(self.echo()) * u32::from(echo) / scale;

        // A convex combination never exceeds the larger of its inputs.
        #[allow(clippy::cast_possible_truncation)]
        let sample = blended as Sample;
        sample
    }
}

impl Default for Mix {
    fn default() -> Self {
        Self(4)
    }
}

impl fmt::Display for Mix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::SCALE)
    }
}

impl TryFrom<u8> for Mix {
    type Error = Error;

    fn try_from(live: u8) -> Result<Self> {
        Self::new(live)
    }
}
