use super::traits::AnalogInput;
use embassy_stm32::adc::{Adc, AnyAdcChannel, Instance, SampleTime};

/// One ADC channel with its converter.
///
/// The F1 converter runs a single regular conversion per read; with the default
/// 12 MHz ADC clock and 239.5 cycle sampling that is ~21 µs, far below the tick.
///
/// `read` completes from the converter's end-of-conversion interrupt: the
/// caller must bind `adc::InterruptHandler` and enable that line in the NVIC
/// (`ADC1_2` on the F103) before the first read, or the read never resolves.
pub struct AdcInput<'d, T: Instance> {
    adc: Adc<'d, T>,
    channel: AnyAdcChannel<T>,
}

impl<'d, T: Instance> AdcInput<'d, T> {
    pub fn new(mut adc: Adc<'d, T>, channel: AnyAdcChannel<T>, sample_time: SampleTime) -> Self {
        adc.set_sample_time(sample_time);
        Self { adc, channel }
    }
}

impl<'d, T: Instance> AnalogInput for AdcInput<'d, T> {
    async fn read(&mut self) -> u16 {
        self.adc.read(&mut self.channel).await
    }
}
