//! Serial output encoding.
//!
//! One tick becomes one line: the decimal wire value followed by `\n`. The
//! tagged [`Reading`] is flattened to the `-1` sentinel only here.

use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Sender;
use heapless::String;

use crate::config::SamplerConfig;
use crate::sampler::Reading;

/// Fits the longest banner line as well as any sample line.
pub const LINE_CAPACITY: usize = 40;

pub type Line = String<LINE_CAPACITY>;

/// Where the sampler puts its output. `emit` must never block.
pub trait SampleSink {
    fn emit(&mut self, reading: Reading);
}

impl<S: SampleSink + ?Sized> SampleSink for &mut S {
    fn emit(&mut self, reading: Reading) {
        (**self).emit(reading)
    }
}

/// Encodes a reading as `"%d\n"`.
pub fn format_line(reading: Reading) -> Line {
    let mut line = Line::new();
    // An i32 plus newline always fits.
    let _ = writeln!(line, "{}", reading.wire_value());
    line
}

/// The two startup lines printed before the schedule is armed.
pub fn banner(config: &SamplerConfig) -> [Line; 2] {
    let mut title = Line::new();
    let _ = title.push_str("ECG Sampling Application Started\n");

    let mut interval = Line::new();
    let _ = writeln!(interval, "Sampling interval: {} ms", config.interval_ms);

    [title, interval]
}

/// Queues the banner. Runs in the foreground, so it may wait for room.
pub async fn send_banner<M: RawMutex, const N: usize>(
    sender: &Sender<'_, M, Line, N>,
    config: &SamplerConfig,
) {
    for line in banner(config) {
        sender.send(line).await;
    }
}

/// Sink that hands formatted lines to the serial writer through a bounded
/// channel. When the writer falls behind the line is dropped and counted.
pub struct ChannelSink<'a, M: RawMutex, const N: usize> {
    sender: Sender<'a, M, Line, N>,
    dropped: u32,
}

impl<'a, M: RawMutex, const N: usize> ChannelSink<'a, M, N> {
    pub fn new(sender: Sender<'a, M, Line, N>) -> Self {
        Self { sender, dropped: 0 }
    }

    /// Lines lost because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<'a, M: RawMutex, const N: usize> SampleSink for ChannelSink<'a, M, N> {
    fn emit(&mut self, reading: Reading) {
        if self.sender.try_send(format_line(reading)).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            if self.dropped.is_power_of_two() {
                warn!("serial queue full, {} lines dropped", self.dropped);
            }
        }
    }
}
