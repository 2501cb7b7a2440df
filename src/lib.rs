//! # echotap
//!
//! A multi-tap echo effect for a fixed-rate stream of 12-bit samples.
//!
//! Each tick takes one input sample, stores it in a circular delay buffer,
//! sums a set of decay-weighted echo taps trailing through that buffer,
//! blends the echo with the live sample and dispatches one output sample.
//!
//! # Signal Flow
//!
//! ```text
//! sample clock ──► ADC ──► Handoff ──► Pipeline ──────────────────────► DAC
//!   (thread)               (1 slot)      │                        ▲
//!                                        ▼                        │
//!                              ┌──── SampleBuffer ────┐           │
//!                              │ live  tap1 ... tapN  │ ──► Echo ─┤
//!                              └──────────────────────┘    Mixer  │
//!                                        │                        │
//!                                        └──── live ────► Mix ────┘
//! ```
//!
//! # Modules
//!
//! Core processing:
//! * [`taps`] - live and echo tap positions rotating through the buffer
//! * [`ringbuf`] - fixed-capacity circular sample store
//! * [`echo`] - decay-weighted, normalized echo summation
//! * [`mix`] - live/echo blend
//! * [`pipeline`] - per-tick orchestration
//! * [`handoff`] - lossy single-slot mailbox between clock and pipeline
//!
//! Boundaries and support:
//! * [`adc`] - input sources
//! * [`dac`] - output framing and sinks
//! * [`clock`] - periodic sample clock thread
//! * [`config`] - effect parameters
//! * [`sample`] - 12-bit sample representation
//! * [`error`] - error types

#[macro_use]
extern crate log;

pub mod adc;
pub mod clock;
pub mod config;
pub mod dac;
pub mod echo;
pub mod error;
pub mod handoff;
pub mod mix;
pub mod pipeline;
pub mod ringbuf;
pub mod sample;
pub mod taps;
