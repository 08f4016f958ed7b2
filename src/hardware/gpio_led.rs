use super::traits::Led;
use core::convert::Infallible;
use embedded_hal::digital::StatefulOutputPin;

/// Which pin level lights the LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveLevel {
    High,
    /// e.g. PC13 on the Blue Pill
    Low,
}

pub struct GpioLed<P> {
    pin: P,
    active: ActiveLevel,
}

impl<P> GpioLed<P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    pub fn new(pin: P, active: ActiveLevel) -> Self {
        Self { pin, active }
    }
}

impl<P> Led for GpioLed<P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    fn on(&mut self) {
        let Ok(()) = match self.active {
            ActiveLevel::High => self.pin.set_high(),
            ActiveLevel::Low => self.pin.set_low(),
        };
    }

    fn off(&mut self) {
        let Ok(()) = match self.active {
            ActiveLevel::High => self.pin.set_low(),
            ActiveLevel::Low => self.pin.set_high(),
        };
    }

    fn toggle(&mut self) {
        let Ok(()) = self.pin.toggle();
    }

    fn is_on(&mut self) -> bool {
        let Ok(high) = self.pin.is_set_high();
        high == (self.active == ActiveLevel::High)
    }
}
