//! 12-bit sample representation.
//!
//! Samples are unsigned offset-binary values with 12 significant bits, carried
//! in a `u16`. Mid-scale (`0x800`) is silence. Acquisition registers may be
//! wider; anything above bit 11 is discarded on the way in.

/// One instant of the signal, confined to the low [`SAMPLE_BITS`] bits.
pub type Sample = u16;

/// Number of significant bits in a [`Sample`].
pub const SAMPLE_BITS: u32 = 12;

/// Mask selecting the significant bits of a [`Sample`].
pub const SAMPLE_MASK: u16 = (1 << SAMPLE_BITS) - 1;

/// Largest representable sample value.
pub const SAMPLE_MAX: Sample = SAMPLE_MASK;

/// Offset-binary value representing silence.
pub const SAMPLE_MIDPOINT: Sample = 1 << (SAMPLE_BITS - 1);

/// Truncates a raw acquisition value to a [`Sample`].
#[inline]
#[must_use]
pub fn from_raw(raw: u32) -> Sample {
    // The mask leaves at most 12 bits, so the narrowing cast is lossless.
    #[allow(clippy::cast_possible_truncation)]
    let sample = (raw & u32::from(SAMPLE_MASK)) as Sample;
    sample
}

/// Converts signed 16-bit PCM to a 12-bit offset-binary sample.
///
/// Keeps the most significant 12 bits and flips the sign bit, so
/// `i16::MIN` maps to 0, zero maps to [`SAMPLE_MIDPOINT`] and `i16::MAX`
/// maps to [`SAMPLE_MAX`].
#[inline]
#[must_use]
pub fn from_pcm(pcm: i16) -> Sample {
    #[allow(clippy::cast_sign_loss)]
    let offset = (i32::from(pcm) + 0x8000) as u32;
    from_raw(offset >> (16 - SAMPLE_BITS))
}

/// Converts a 12-bit offset-binary sample back to signed 16-bit PCM.
#[inline]
#[must_use]
pub fn to_pcm(sample: Sample) -> i16 {
    let shifted = i32::from(sample & SAMPLE_MASK) << (16 - SAMPLE_BITS);
    #[allow(clippy::cast_possible_truncation)]
    let pcm = (shifted - 0x8000) as i16;
    pcm
}
