use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::Parser;
use log::{LevelFilter, debug, error, info, warn};

use echotap::{
    adc::{Adc, ToneAdc, WavAdc},
    clock::SampleClock,
    config::Config,
    dac::{Dac, NullDac, WavDac},
    error::Result,
    handoff::Handoff,
    pipeline::Pipeline,
};

/// Amplitude of the built-in test tone, relative to full scale.
const TONE_AMPLITUDE: f32 = 0.5;

/// Command line arguments as parsed by `clap`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML configuration file
    ///
    /// Command line options override values from this file.
    #[arg(short, long, value_hint = clap::ValueHint::FilePath, env = "ECHOTAP_CONFIG")]
    config: Option<PathBuf>,

    /// Number of tap positions, the live position included (2 or more)
    #[arg(short, long, env = "ECHOTAP_TAPS")]
    taps: Option<usize>,

    /// Delay between consecutive echoes in milliseconds
    #[arg(short, long, env = "ECHOTAP_DELAY_MS")]
    delay_ms: Option<u32>,

    /// Nominal sample rate in kHz
    #[arg(long, env = "ECHOTAP_SAMPLE_RATE_KHZ")]
    sample_rate_khz: Option<u32>,

    /// Live/echo balance from 0 (echo only) to 10 (live only)
    #[arg(short, long, env = "ECHOTAP_MIX")]
    mix: Option<u8>,

    /// Rate requested from the sample clock in Hz
    #[arg(long, env = "ECHOTAP_CLOCK_HZ")]
    clock_hz: Option<u32>,

    /// WAV file to use as input instead of the test tone
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    input: Option<PathBuf>,

    /// Test tone frequency in Hz
    #[arg(long, default_value_t = 440.0)]
    tone: f32,

    /// Test tone length in seconds
    #[arg(long, default_value_t = 5.0)]
    seconds: f32,

    /// Peak noise added to the test tone, relative to full scale
    #[arg(long, default_value_t = 0.0)]
    noise: f32,

    /// WAV file to write the output to
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Process as fast as possible, without the sample clock
    ///
    /// Every input sample is processed; with the clock, samples the pipeline
    /// cannot keep up with are dropped.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Suppresses all output except warnings and errors
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Enables verbose logging
    ///
    /// Specify twice for trace logging, which logs every tick.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// Log levels are set by the verbosity flags, falling back to `RUST_LOG` when
/// neither `--quiet` nor `--verbose` is given.
fn init_logger(args: &Args) {
    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if args.quiet || args.verbose > 0 {
        // Filter log messages of external crates.
        logger.filter_level(LevelFilter::Error);

        let level = if args.quiet {
            LevelFilter::Warn
        } else if args.verbose == 1 {
            LevelFilter::Debug
        } else {
            LevelFilter::Trace
        };
        logger.filter_module("echotap", level);
    }

    logger.init();
}

/// Builds the configuration from the optional file and command line
/// overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config.as_ref() {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(taps) = args.taps {
        config.taps = taps;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.delay_ms = delay_ms;
    }
    if let Some(sample_rate_khz) = args.sample_rate_khz {
        config.sample_rate_khz = sample_rate_khz;
    }
    if let Some(mix) = args.mix {
        config.mix = mix;
    }
    if let Some(clock_hz) = args.clock_hz {
        config.clock_hz = clock_hz;
    }

    Ok(config)
}

/// Opens the input file or builds the test tone.
fn open_input(args: &Args, config: &Config) -> Result<Box<dyn Adc + Send>> {
    if let Some(path) = args.input.as_ref() {
        let wav = WavAdc::open(path)?;
        if wav.sample_rate() != config.sample_rate_hz() {
            warn!(
                "input is sampled at {} Hz, delays assume {} Hz",
                wav.sample_rate(),
                config.sample_rate_hz()
            );
        }
        return Ok(Box::new(wav));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let samples = (args.seconds.max(0.0) * config.sample_rate_hz() as f32) as u64;
    debug!("generating {} Hz test tone for {samples} samples", args.tone);

    Ok(Box::new(
        ToneAdc::new(args.tone, config.sample_rate_hz(), TONE_AMPLITUDE)
            .with_noise(args.noise)
            .with_length(samples),
    ))
}

/// Runs the effect until the input runs dry, returning the number of ticks.
fn process<D>(
    pipeline: &mut Pipeline,
    config: &Config,
    mut adc: Box<dyn Adc + Send>,
    sink: &mut D,
    offline: bool,
) -> Result<u64>
where
    D: Dac + ?Sized,
{
    if offline {
        while let Some(raw) = adc.convert()? {
            pipeline.tick(raw, sink)?;
        }
        return Ok(pipeline.ticks());
    }

    let handoff = Arc::new(Handoff::new());
    let clock = SampleClock::spawn(config.clock_hz, adc, Arc::clone(&handoff))?;

    let ticks = pipeline.run(&handoff, sink);
    if ticks.is_err() {
        clock.stop();
    }

    let staged = clock.join()?;
    let ticks = ticks?;
    info!("processed {ticks} of {staged} acquired samples");

    Ok(ticks)
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let mut pipeline = Pipeline::new(&config)?;
    let adc = open_input(args, &config)?;

    info!(
        "echoing {} taps every {} ms, mix {}",
        config.taps - 1,
        config.delay_ms,
        pipeline.mix()
    );

    match args.output.as_ref() {
        Some(path) => {
            let mut wav = WavDac::create(path, config.sample_rate_hz())?;
            let ticks = process(&mut pipeline, &config, adc, &mut wav, args.offline)?;
            wav.finalize()?;
            info!("wrote {ticks} samples to {}", path.display());
        }
        None => {
            let ticks = process(&mut pipeline, &config, adc, &mut NullDac, args.offline)?;
            info!("discarded {ticks} samples");
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
