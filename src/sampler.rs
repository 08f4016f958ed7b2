use crate::hardware::FrontEnd;
use crate::output::SampleSink;

/// Wire value for a tick with no ADC reading.
pub const NO_READING: i32 = -1;

/// Result of one acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    /// At least one electrode was detached, the ADC was not touched.
    NoReading,
    Sample(u16),
}

impl Reading {
    /// Integer written to the serial stream.
    pub fn wire_value(self) -> i32 {
        match self {
            Reading::NoReading => NO_READING,
            Reading::Sample(raw) => i32::from(raw),
        }
    }
}

/// State of both leads-off lines during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LeadStatus {
    pub lo_plus: bool,
    pub lo_minus: bool,
}

impl LeadStatus {
    pub fn read<F: FrontEnd>(front_end: &mut F) -> Self {
        Self {
            lo_plus: front_end.lead_off_plus(),
            lo_minus: front_end.lead_off_minus(),
        }
    }

    /// A single detached electrode invalidates the reading.
    pub fn is_connected(&self) -> bool {
        !(self.lo_plus || self.lo_minus)
    }
}

/// Everything observed during one firing. Lives for one tick only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleTick {
    pub leads: LeadStatus,
    pub reading: Reading,
}

/// The periodic sampling callback.
///
/// Borrows the front end from bootstrap for its whole life. `on_tick` is meant
/// to be called from a single non-reentrant context (see [`crate::schedule::run`]);
/// it never waits on another task and never allocates.
pub struct Sampler<'h, F, S> {
    front_end: &'h mut F,
    sink: S,
    ticks: u32,
    detached_ticks: u32,
    // Only used to log transitions; never feeds back into a reading.
    last_connected: bool,
}

impl<'h, F, S> Sampler<'h, F, S>
where
    F: FrontEnd,
    S: SampleSink,
{
    pub fn new(front_end: &'h mut F, sink: S) -> Self {
        Self {
            front_end,
            sink,
            ticks: 0,
            detached_ticks: 0,
            last_connected: true,
        }
    }

    /// Runs one sampling tick. Returns `true` to keep the schedule armed.
    pub async fn on_tick(&mut self) -> bool {
        self.sample().await;
        true
    }

    /// One tick: heartbeat, lead check, conditional acquisition, emission.
    pub async fn sample(&mut self) -> SampleTick {
        self.front_end.toggle_heartbeat();

        let leads = LeadStatus::read(&mut *self.front_end);
        let reading = if leads.is_connected() {
            Reading::Sample(self.front_end.acquire().await)
        } else {
            Reading::NoReading
        };

        let tick = SampleTick { leads, reading };
        self.sink.emit(tick.reading);
        self.record(&tick);
        tick
    }

    fn record(&mut self, tick: &SampleTick) {
        self.ticks = self.ticks.wrapping_add(1);
        let connected = tick.leads.is_connected();
        if !connected {
            self.detached_ticks = self.detached_ticks.wrapping_add(1);
        }
        if connected != self.last_connected {
            if connected {
                info!("leads reattached");
            } else {
                info!("leads off: {}", tick.leads);
            }
            self.last_connected = connected;
        }
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Ticks that emitted the sentinel.
    pub fn detached_ticks(&self) -> u32 {
        self.detached_ticks
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn front_end(&mut self) -> &mut F {
        &mut *self.front_end
    }
}
