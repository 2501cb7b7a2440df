//! Input boundary: sources of raw acquisition values.
//!
//! An [`Adc`] yields one raw value per sample clock firing. Values may be
//! wider than 12 bits; the tick loop keeps only the low 12. A source
//! returning `None` has run dry, which ends the stream.
//!
//! Sources here are stand-ins for a hardware converter:
//! * [`WavAdc`] - first channel of a WAV file
//! * [`ToneAdc`] - sine test tone with optional noise
//! * [`IterAdc`] - any iterator of raw values

use std::{f32::consts::TAU, fs::File, io::BufReader, path::Path};

use crate::{
    error::{Error, Result},
    sample::{self, SAMPLE_MAX, SAMPLE_MIDPOINT},
};

/// Source of raw acquisition values.
pub trait Adc {
    /// Performs one conversion.
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source fails to deliver a value.
    fn convert(&mut self) -> Result<Option<u32>>;
}

impl<A> Adc for Box<A>
where
    A: Adc + ?Sized,
{
    fn convert(&mut self) -> Result<Option<u32>> {
        (**self).convert()
    }
}

/// Adapts an iterator of raw values.
#[derive(Debug, Clone)]
pub struct IterAdc<I> {
    iter: I,
}

impl<I> IterAdc<I>
where
    I: Iterator<Item = u32>,
{
    /// Creates a source yielding the values of `iter`, one per conversion.
    pub fn new<T>(iter: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            iter: iter.into_iter(),
        }
    }
}

impl<I> Adc for IterAdc<I>
where
    I: Iterator<Item = u32>,
{
    #[inline]
    fn convert(&mut self) -> Result<Option<u32>> {
        Ok(self.iter.next())
    }
}

/// Reads the first channel of a WAV file as 12-bit offset binary.
pub struct WavAdc {
    reader: hound::WavReader<BufReader<File>>,
    channels: u16,
    bits_per_sample: u16,
    sample_format: hound::SampleFormat,
}

impl WavAdc {
    /// Opens the WAV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a WAV file
    /// with integer samples of at most 32 bits or 32-bit float samples.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = hound::WavReader::open(path.as_ref())?;
        let spec = reader.spec();

        match spec.sample_format {
            hound::SampleFormat::Int if (1..=32).contains(&spec.bits_per_sample) => {}
            hound::SampleFormat::Float if spec.bits_per_sample == 32 => {}
            format => {
                return Err(Error::unimplemented(format!(
                    "unsupported WAV format: {format:?} with {} bits per sample",
                    spec.bits_per_sample
                )));
            }
        }

        if spec.channels > 1 {
            warn!(
                "{} has {} channels, using only the first",
                path.as_ref().display(),
                spec.channels
            );
        }
        debug!(
            "reading input from {}: {} Hz, {} bits",
            path.as_ref().display(),
            spec.sample_rate,
            spec.bits_per_sample
        );

        Ok(Self {
            reader,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            sample_format: spec.sample_format,
        })
    }

    /// Sample rate of the file in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.reader.spec().sample_rate
    }

    /// Reads one value from the file, scaled to signed 16-bit PCM.
    fn read_pcm(&mut self) -> Result<Option<i16>> {
        let pcm = match self.sample_format {
            hound::SampleFormat::Int => {
                let Some(value) = self.reader.samples::<i32>().next().transpose()? else {
                    return Ok(None);
                };
                if self.bits_per_sample > 16 {
                    value >> (self.bits_per_sample - 16)
                } else {
                    value << (16 - self.bits_per_sample)
                }
            }
            hound::SampleFormat::Float => {
                let Some(value) = self.reader.samples::<f32>().next().transpose()? else {
                    return Ok(None);
                };
                #[allow(clippy::cast_possible_truncation)]
                let scaled = (value.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i32;
                scaled
            }
        };

        #[allow(clippy::cast_possible_truncation)]
        let pcm = pcm.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
        Ok(Some(pcm))
    }
}

impl Adc for WavAdc {
    fn convert(&mut self) -> Result<Option<u32>> {
        let Some(pcm) = self.read_pcm()? else {
            return Ok(None);
        };

        // Skip the remaining channels of this frame.
        for _ in 1..self.channels {
            if self.read_pcm()?.is_none() {
                break;
            }
        }

        Ok(Some(u32::from(sample::from_pcm(pcm))))
    }
}

/// Generates a sine test tone centered on [`SAMPLE_MIDPOINT`].
#[derive(Debug)]
pub struct ToneAdc {
    /// Phase increment per sample, in radians
    increment: f32,
    /// Current phase, in radians
    phase: f32,
    /// Peak amplitude relative to full scale (0.0 to 1.0)
    amplitude: f32,
    /// Peak noise amplitude relative to full scale (0.0 to 1.0)
    noise: f32,
    /// Samples left to generate, `None` for an endless tone
    remaining: Option<u64>,
    // Dedicated random number generator for the noise floor
    rng: fastrand::Rng,
}

impl ToneAdc {
    /// Creates an endless tone of `frequency` Hz sampled at `sample_rate` Hz.
    #[must_use]
    pub fn new(frequency: f32, sample_rate: u32, amplitude: f32) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let increment = TAU * frequency / sample_rate as f32;
        Self {
            increment,
            phase: 0.0,
            amplitude: amplitude.clamp(0.0, 1.0),
            noise: 0.0,
            remaining: None,
            rng: fastrand::Rng::new(),
        }
    }

    /// Limits the tone to `samples` samples.
    #[must_use]
    pub fn with_length(mut self, samples: u64) -> Self {
        self.remaining = Some(samples);
        self
    }

    /// Adds uniform noise of the given peak amplitude.
    #[must_use]
    pub fn with_noise(mut self, noise: f32) -> Self {
        self.noise = noise.clamp(0.0, 1.0);
        self
    }
}

impl Adc for ToneAdc {
    fn convert(&mut self) -> Result<Option<u32>> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
        }

        let mut value = self.phase.sin() * self.amplitude;
        if self.noise > 0.0 {
            // Scale the noise to the range -noise..noise
            value += (self.rng.f32() * 2.0 - 1.0) * self.noise;
        }
        self.phase = (self.phase + self.increment) % TAU;

        let half_scale = f32::from(SAMPLE_MIDPOINT);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let raw = (half_scale + value * half_scale).clamp(0.0, f32::from(SAMPLE_MAX)) as u32;
        Ok(Some(raw))
    }
}
