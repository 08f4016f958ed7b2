use super::traits::LeadOffInput;
use core::convert::Infallible;
use embedded_hal::digital::InputPin;

/// Leads-off line read from a GPIO pin.
///
/// The AD8232 drives LO+ / LO- high when an electrode loses contact; the pin is
/// expected to be pulled down so a floating line reads as attached.
pub struct GpioLeadOff<P> {
    pin: P,
}

impl<P> GpioLeadOff<P>
where
    P: InputPin<Error = Infallible>,
{
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P> LeadOffInput for GpioLeadOff<P>
where
    P: InputPin<Error = Infallible>,
{
    fn is_detached(&mut self) -> bool {
        let Ok(high) = self.pin.is_high();
        high
    }
}
