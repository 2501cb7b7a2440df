//! Fixed-capacity circular sample store for the delay line.
//!
//! Unlike a push/pop ring buffer, this store does not track its own
//! position: callers address slots directly with indices maintained by
//! [`TapSet`](crate::taps::TapSet). One slot is written per tick, several
//! are read, and the whole buffer rotates under the taps.

use crate::sample::{SAMPLE_MASK, Sample};

/// A fixed-size circular store of 12-bit samples.
///
/// * Sized once from configuration, never resized
/// * Zero-initialized
/// * Every stored value is confined to 12 bits
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// The underlying storage
    buffer: Box<[Sample]>,
}

impl SampleBuffer {
    /// Creates a new sample buffer holding `capacity` samples, all zero.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sample buffer capacity must be non-zero");
        Self {
            buffer: vec![0; capacity].into_boxed_slice(),
        }
    }

    /// Stores a sample at `position`, masked to 12 bits.
    ///
    /// # Panics
    ///
    /// Panics if `position` lies outside the buffer.
    #[inline]
    pub fn write(&mut self, position: usize, value: Sample) {
        assert!(
            position < self.buffer.len(),
            "write position {position} outside buffer of {}",
            self.buffer.len()
        );
        self.buffer[position] = value & SAMPLE_MASK;
    }

    /// Returns the sample stored at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position` lies outside the buffer.
    #[inline]
    #[must_use]
    pub fn read(&self, position: usize) -> Sample {
        assert!(
            position < self.buffer.len(),
            "read position {position} outside buffer of {}",
            self.buffer.len()
        );
        self.buffer[position]
    }

    /// Number of samples the buffer holds.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Highest valid position, the wrap point for tap positions.
    #[must_use]
    pub fn top_address(&self) -> usize {
        self.buffer.len() - 1
    }

    /// Resets all samples to zero.
    pub fn reset(&mut self) {
        self.buffer.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_silent() {
        let buffer = SampleBuffer::new(16);
        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.top_address(), 15);
        assert!((0..16).all(|position| buffer.read(position) == 0));
    }

    #[test]
    fn write_masks_to_twelve_bits() {
        let mut buffer = SampleBuffer::new(4);
        buffer.write(2, 0xFABC);
        assert_eq!(buffer.read(2), 0x0ABC);
        assert_eq!(buffer.read(1), 0);
    }

    #[test]
    fn reset_clears_contents() {
        let mut buffer = SampleBuffer::new(4);
        buffer.write(0, 123);
        buffer.write(3, 4095);
        buffer.reset();
        assert!((0..4).all(|position| buffer.read(position) == 0));
    }

    #[test]
    #[should_panic(expected = "outside buffer")]
    fn read_past_end_panics() {
        let buffer = SampleBuffer::new(4);
        let _ = buffer.read(4);
    }
}
