//! Shared fakes for the ecg_sampler integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use core::convert::Infallible;
use core::future::pending;
use std::cell::Cell;
use std::rc::Rc;

use ecg_sampler::hardware::{
    ActiveLevel, AnalogInput, EcgFrontEnd, GpioLeadOff, GpioLed, LeadOffInput, Led,
};
use ecg_sampler::output::{Line, SampleSink, format_line};
use ecg_sampler::schedule::{Alarm, DisarmHandle};
use ecg_sampler::{Reading, Sampler};
use embassy_time::Instant;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

// ============================================================================
// Fake GPIO pin
// ============================================================================

/// Pin whose level is shared with the test through an `Rc<Cell<bool>>`.
#[derive(Clone, Default)]
pub struct FakePin {
    level: Rc<Cell<bool>>,
}

impl FakePin {
    pub fn new(high: bool) -> Self {
        Self {
            level: Rc::new(Cell::new(high)),
        }
    }

    pub fn set(&self, high: bool) {
        self.level.set(high);
    }

    pub fn get(&self) -> bool {
        self.level.get()
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl InputPin for FakePin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level.get())
    }
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.level.set(true);
        Ok(())
    }
}

impl StatefulOutputPin for FakePin {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.get())
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level.get())
    }
}

// ============================================================================
// Fake leads-off line and LED (trait level)
// ============================================================================

#[derive(Clone, Default)]
pub struct FakeLeadOff {
    detached: Rc<Cell<bool>>,
}

impl FakeLeadOff {
    pub fn set_detached(&self, detached: bool) {
        self.detached.set(detached);
    }
}

impl LeadOffInput for FakeLeadOff {
    fn is_detached(&mut self) -> bool {
        self.detached.get()
    }
}

#[derive(Clone, Default)]
pub struct MockLed {
    lit: Rc<Cell<bool>>,
    toggles: Rc<Cell<u32>>,
}

impl MockLed {
    pub fn lit(&self) -> bool {
        self.lit.get()
    }

    pub fn toggles(&self) -> u32 {
        self.toggles.get()
    }
}

impl Led for MockLed {
    fn on(&mut self) {
        self.lit.set(true);
    }

    fn off(&mut self) {
        self.lit.set(false);
    }

    fn toggle(&mut self) {
        self.lit.set(!self.lit.get());
        self.toggles.set(self.toggles.get() + 1);
    }

    fn is_on(&mut self) -> bool {
        self.lit.get()
    }
}

// ============================================================================
// Fake ADC
// ============================================================================

/// Returns a programmable value and counts conversions.
#[derive(Clone, Default)]
pub struct FakeAdc {
    value: Rc<Cell<u16>>,
    reads: Rc<Cell<u32>>,
}

impl FakeAdc {
    pub fn set_value(&self, value: u16) {
        self.value.set(value);
    }

    pub fn reads(&self) -> u32 {
        self.reads.get()
    }
}

impl AnalogInput for FakeAdc {
    async fn read(&mut self) -> u16 {
        self.reads.set(self.reads.get() + 1);
        self.value.get()
    }
}

// ============================================================================
// Recording sink
// ============================================================================

/// Keeps every emitted line as it would appear on the wire.
#[derive(Default)]
pub struct RecordingSink {
    lines: Vec<Line>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<&str> {
        self.lines.iter().map(|line| line.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

impl SampleSink for RecordingSink {
    fn emit(&mut self, reading: Reading) {
        self.lines.push(format_line(reading));
    }
}

// ============================================================================
// Test rig: front end built from fake pins
// ============================================================================

pub type RigFrontEnd =
    EcgFrontEnd<GpioLeadOff<FakePin>, GpioLeadOff<FakePin>, GpioLed<FakePin>, FakeAdc>;

/// Handles that stay with the test while the front end is lent to a sampler.
pub struct Rig {
    pub lo_plus: FakePin,
    pub lo_minus: FakePin,
    pub led: FakePin,
    pub adc: FakeAdc,
}

impl Rig {
    pub fn new() -> (Self, RigFrontEnd) {
        let rig = Rig {
            lo_plus: FakePin::new(false),
            lo_minus: FakePin::new(false),
            // Active-low LED starts off.
            led: FakePin::new(true),
            adc: FakeAdc::default(),
        };
        let front_end = EcgFrontEnd::new(
            GpioLeadOff::new(rig.lo_plus.clone()),
            GpioLeadOff::new(rig.lo_minus.clone()),
            GpioLed::new(rig.led.clone(), ActiveLevel::Low),
            rig.adc.clone(),
        );
        (rig, front_end)
    }

    pub fn set_leads(&self, lo_plus: bool, lo_minus: bool) {
        self.lo_plus.set(lo_plus);
        self.lo_minus.set(lo_minus);
    }
}

pub fn tick<F, S>(sampler: &mut Sampler<'_, F, S>) -> bool
where
    F: ecg_sampler::hardware::FrontEnd,
    S: SampleSink,
{
    embassy_futures::block_on(sampler.on_tick())
}

// ============================================================================
// Simulated clock
// ============================================================================

/// Alarm on a simulated tick counter. Waiting jumps straight to the deadline;
/// the first deadline past `horizon` disarms the schedule and never fires.
pub struct SimClock<'a> {
    now: Rc<Cell<u64>>,
    horizon: u64,
    disarm: DisarmHandle<'a>,
}

impl<'a> SimClock<'a> {
    pub fn new(now: Rc<Cell<u64>>, horizon: u64, disarm: DisarmHandle<'a>) -> Self {
        Self {
            now,
            horizon,
            disarm,
        }
    }
}

impl Alarm for SimClock<'_> {
    fn now(&self) -> Instant {
        Instant::from_ticks(self.now.get())
    }

    async fn wait_until(&mut self, deadline: Instant) {
        if deadline.as_ticks() > self.horizon {
            self.disarm.disarm();
            pending::<()>().await;
        }
        if deadline.as_ticks() > self.now.get() {
            self.now.set(deadline.as_ticks());
        }
    }
}
