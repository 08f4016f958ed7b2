//! ECG front-end sampler
//! =============================================================================================
//!
//! Periodic acquisition core for an AD8232-class ECG front end:
//! - Two leads-off detection lines (LO+ / LO-)
//! - One analog channel carrying the ECG signal
//! - One heartbeat LED, toggled every sampling tick
//!
//! Each tick emits one decimal line on the serial output: the raw ADC reading,
//! or `-1` when either electrode is detached.
//!
//! The core (`sampler`, `schedule`, `output`, `config`) is hardware-agnostic and
//! runs on the host under `cargo test`. The embassy-stm32 glue lives behind the
//! `firmware` feature together with the `ecg` binary.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod error;
pub mod hardware;
pub mod output;
pub mod sampler;
pub mod schedule;

pub use config::SamplerConfig;
pub use error::{ConfigError, StartupError};
pub use output::{Line, SampleSink};
pub use sampler::{LeadStatus, Reading, SampleTick, Sampler};
pub use schedule::{Alarm, DisarmHandle, FixedRate, Period, RunSummary};
