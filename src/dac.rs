//! Output boundary: framing and dispatch of processed samples.
//!
//! Each tick produces one 12-bit sample. Before dispatch it is packed into a
//! 16-bit transfer word: the sample in the low 12 bits and the converter's
//! control bits above it. [`CONTROL_FAST`] selects the converter's fast
//! settling mode. Dispatch is synchronous: [`Dac::send`] returns only once
//! the word has been handed over, and the tick loop does not start the next
//! tick before that.

use std::{fs::File, io::BufWriter, path::Path};

use crate::{
    error::Result,
    sample::{self, SAMPLE_MASK, Sample},
};

/// Control bits selecting fast settling mode.
pub const CONTROL_FAST: u16 = 0x4000;

/// Packs a sample into a transfer word with fast-mode control bits.
///
/// Bits above the 12-bit sample are discarded, never allowed to bleed into
/// the control field.
#[inline]
#[must_use]
pub fn frame(sample: Sample) -> u16 {
    (sample & SAMPLE_MASK) | CONTROL_FAST
}

/// Extracts the sample from a transfer word.
#[inline]
#[must_use]
pub fn unframe(word: u16) -> Sample {
    word & SAMPLE_MASK
}

/// Sink accepting framed transfer words, one per tick.
pub trait Dac {
    /// Sends one transfer word, returning once the transfer has completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying sink fails to accept the word.
    fn send(&mut self, word: u16) -> Result<()>;
}

impl<D> Dac for &mut D
where
    D: Dac + ?Sized,
{
    #[inline]
    fn send(&mut self, word: u16) -> Result<()> {
        (**self).send(word)
    }
}

/// Captures every transfer word in memory.
impl Dac for Vec<u16> {
    #[inline]
    fn send(&mut self, word: u16) -> Result<()> {
        self.push(word);
        Ok(())
    }
}

/// Discards every transfer word.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullDac;

impl Dac for NullDac {
    #[inline]
    fn send(&mut self, _word: u16) -> Result<()> {
        Ok(())
    }
}

/// Reconstructs the output as a mono 16-bit WAV file.
pub struct WavDac {
    writer: hound::WavWriter<BufWriter<File>>,
}

impl WavDac {
    /// Creates a WAV file at `path` recorded at `sample_rate` Hz.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path.as_ref(), spec)?;
        debug!("writing output to {} at {sample_rate} Hz", path.as_ref().display());
        Ok(Self { writer })
    }

    /// Flushes and closes the WAV file, writing its final header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize()?;
        Ok(())
    }
}

impl Dac for WavDac {
    fn send(&mut self, word: u16) -> Result<()> {
        self.writer.write_sample(sample::to_pcm(unframe(word)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_control_bits_above_sample() {
        assert_eq!(frame(0x0ABC), 0x4ABC);
        assert_eq!(frame(0), 0x4000);
        assert_eq!(frame(0x0FFF), 0x4FFF);
    }

    #[test]
    fn frame_confines_overflow_to_twelve_bits() {
        assert_eq!(frame(0x1ABC), 0x4ABC);
        assert_eq!(frame(0xFFFF), 0x4FFF);
    }

    #[test]
    fn unframe_strips_control_bits() {
        assert_eq!(unframe(frame(0x0ABC)), 0x0ABC);
        assert_eq!(unframe(0x0123), 0x0123);
    }

    #[test]
    fn vec_captures_in_order() {
        let mut words: Vec<u16> = Vec::new();
        words.send(frame(1)).unwrap();
        words.send(frame(2)).unwrap();
        assert_eq!(words, vec![0x4001, 0x4002]);
    }

    #[test]
    fn wav_output_reconstructs_pcm() {
        let path = std::env::temp_dir().join(format!("echotap-dac-{}.wav", std::process::id()));

        let mut dac = WavDac::create(&path, 16_000).unwrap();
        for sample in [0, 0x800, 0xFFF] {
            dac.send(frame(sample)).unwrap();
        }
        dac.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        let pcm: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(pcm, vec![i16::MIN, 0, 0x7FF0]);

        let _ = std::fs::remove_file(path);
    }
}
