//! Startup error types.
//!
//! A detached electrode is not an error: it travels through the data stream as
//! the `-1` sentinel. Everything here is fatal and stops the schedule from being
//! armed.

use core::fmt;

/// Rejected sampler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A zero period would fire the sampler continuously.
    ZeroInterval,
    IntervalTooLong { interval_ms: u32, max_ms: u32 },
    AdcChannelOutOfRange { channel: u8, max: u8 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroInterval => write!(f, "sampling interval must be non-zero"),
            ConfigError::IntervalTooLong {
                interval_ms,
                max_ms,
            } => write!(
                f,
                "sampling interval {} ms exceeds the {} ms limit",
                interval_ms, max_ms
            ),
            ConfigError::AdcChannelOutOfRange { channel, max } => {
                write!(f, "ADC channel {} out of range (max {})", channel, max)
            }
        }
    }
}

/// Failure while bringing the board up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartupError {
    /// Configuration did not validate.
    Config(ConfigError),
    /// The serial transport could not be set up.
    Transport,
    /// The sampling task could not be spawned, so the schedule was never armed.
    TimerArm,
}

impl From<ConfigError> for StartupError {
    fn from(err: ConfigError) -> Self {
        StartupError::Config(err)
    }
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(err) => write!(f, "invalid configuration: {}", err),
            StartupError::Transport => write!(f, "serial transport setup failed"),
            StartupError::TimerArm => write!(f, "failed to arm the sampling schedule"),
        }
    }
}
