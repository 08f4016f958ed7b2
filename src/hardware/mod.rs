pub mod front_end;
pub mod gpio_lead;
pub mod gpio_led;
pub mod traits;

#[cfg(feature = "firmware")]
pub mod adc_input;

pub use front_end::{EcgFrontEnd, FrontEnd};
pub use gpio_lead::GpioLeadOff;
pub use gpio_led::{ActiveLevel, GpioLed};
pub use traits::{AnalogInput, LeadOffInput, Led};

#[cfg(feature = "firmware")]
pub use adc_input::AdcInput;
