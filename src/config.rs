use embassy_time::Duration;

use crate::error::ConfigError;
use crate::schedule::Period;

/// Longest accepted sampling interval.
pub const MAX_INTERVAL_MS: u32 = 1_000;

/// Highest ADC1 input bonded out on the 48-pin STM32F103C8 (PA0..PA7, PB0, PB1).
pub const MAX_ADC_CHANNEL: u8 = 9;

/// Build-time sampler configuration
///
/// Pin assignments are chosen by the firmware binary (embassy peripherals are
/// type-level singletons); everything else about the acquisition lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplerConfig {
    /// Sampling period in milliseconds (4 ms = 250 Hz)
    pub interval_ms: u32,
    /// Delay before the banner is printed and the schedule is armed
    pub startup_delay_ms: u32,
    /// ADC input the ECG signal is wired to
    pub adc_channel: u8,
}

impl SamplerConfig {
    pub const DEFAULT: Self = Self {
        interval_ms: 4,
        startup_delay_ms: 2_000,
        adc_channel: 0,
    };

    pub const fn with_interval_ms(mut self, interval_ms: u32) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub const fn with_startup_delay_ms(mut self, startup_delay_ms: u32) -> Self {
        self.startup_delay_ms = startup_delay_ms;
        self
    }

    pub const fn with_adc_channel(mut self, adc_channel: u8) -> Self {
        self.adc_channel = adc_channel;
        self
    }

    /// Checks the configuration before any hardware is armed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.interval_ms > MAX_INTERVAL_MS {
            return Err(ConfigError::IntervalTooLong {
                interval_ms: self.interval_ms,
                max_ms: MAX_INTERVAL_MS,
            });
        }
        if self.adc_channel > MAX_ADC_CHANNEL {
            return Err(ConfigError::AdcChannelOutOfRange {
                channel: self.adc_channel,
                max: MAX_ADC_CHANNEL,
            });
        }
        Ok(())
    }

    /// Exact sampling period; not rounded to timer ticks.
    pub fn interval(&self) -> Period {
        Period::from_millis(u64::from(self.interval_ms))
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.startup_delay_ms))
    }

    /// Nominal sampling rate in Hz (integer part).
    pub fn sample_rate_hz(&self) -> u32 {
        1_000 / self.interval_ms.max(1)
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
