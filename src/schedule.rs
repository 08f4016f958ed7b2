//! Fixed-rate periodic schedule.
//!
//! Firing `n` is due at `origin + n * period`, however long each callback took.
//! A callback that runs past the next slot makes the following firing happen
//! immediately; slots that were passed over entirely are dropped and counted,
//! never replayed as a burst. Afterwards the schedule is back on its grid.

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, TICK_HZ};

use crate::hardware::FrontEnd;
use crate::output::SampleSink;
use crate::sampler::Sampler;

/// Nominal spacing between firings, kept exact to a thousandth of a timer tick.
///
/// `Duration` rounds a millisecond interval up to whole ticks, which a grid
/// built by repeated addition would accumulate (4 ms at 32.768 kHz is 131.072
/// ticks). Slots are instead placed at `origin + n * period` and rounded once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Period {
    milli_ticks: u64,
}

impl Period {
    pub const fn from_ticks(ticks: u64) -> Self {
        Self {
            milli_ticks: ticks * 1_000,
        }
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self {
            milli_ticks: millis * TICK_HZ,
        }
    }

    pub const fn as_micros(&self) -> u64 {
        self.milli_ticks * 1_000 / TICK_HZ
    }

    /// Offset of slot `n` from the origin, rounded down to a whole tick.
    fn offset(&self, n: u64) -> Duration {
        Duration::from_ticks(n * self.milli_ticks / 1_000)
    }

    /// Last slot whose offset is not after `elapsed`.
    fn last_slot_by(&self, elapsed: Duration) -> u64 {
        ((elapsed.as_ticks() + 1) * 1_000 - 1) / self.milli_ticks.max(1)
    }
}

impl From<Duration> for Period {
    fn from(duration: Duration) -> Self {
        Self::from_ticks(duration.as_ticks())
    }
}

/// Outcome of [`FixedRate::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Advance {
    OnTime,
    /// The callback ended after the next slot; `skipped` slots were dropped.
    Overrun { skipped: u32 },
}

/// Deadline bookkeeping for a fixed-rate timer.
#[derive(Debug, Clone)]
pub struct FixedRate {
    origin: Instant,
    period: Period,
    // Grid slot the pending firing stands for.
    slot: u64,
    // When the pending firing is due; later than its slot only after an overrun.
    deadline: Instant,
    overruns: u32,
    missed_slots: u32,
}

impl FixedRate {
    /// First firing is one period after `origin`.
    pub fn new(origin: Instant, period: Period) -> Self {
        Self {
            origin,
            period,
            slot: 1,
            deadline: origin + period.offset(1),
            overruns: 0,
            missed_slots: 0,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Moves to the next firing once the callback has returned at `finished`.
    pub fn advance(&mut self, finished: Instant) -> Advance {
        let next = self.slot + 1;
        let next_at = self.origin + self.period.offset(next);
        if finished <= next_at {
            self.slot = next;
            self.deadline = next_at;
            return Advance::OnTime;
        }

        // Fire now, standing in for the latest slot already passed.
        let latest = self.period.last_slot_by(finished - self.origin);
        let skipped = latest - next;
        self.slot = latest;
        self.deadline = finished;

        let skipped = u32::try_from(skipped).unwrap_or(u32::MAX);
        self.overruns = self.overruns.saturating_add(1);
        self.missed_slots = self.missed_slots.saturating_add(skipped);
        Advance::Overrun { skipped }
    }

    /// Callbacks that ran past the following slot.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    pub fn missed_slots(&self) -> u32 {
        self.missed_slots
    }
}

/// Timer facility the schedule waits on.
#[allow(async_fn_in_trait)]
pub trait Alarm {
    fn now(&self) -> Instant;
    async fn wait_until(&mut self, deadline: Instant);
}

/// [`Alarm`] on top of the embassy time driver.
#[cfg(feature = "firmware")]
pub struct EmbassyAlarm;

#[cfg(feature = "firmware")]
impl Alarm for EmbassyAlarm {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn wait_until(&mut self, deadline: Instant) {
        embassy_time::Timer::at(deadline).await
    }
}

/// Callback driven by [`run`]. Returning `false` disarms the schedule.
#[allow(async_fn_in_trait)]
pub trait Periodic {
    async fn on_tick(&mut self) -> bool;
}

impl<'h, F, S> Periodic for Sampler<'h, F, S>
where
    F: FrontEnd,
    S: SampleSink,
{
    async fn on_tick(&mut self) -> bool {
        Sampler::on_tick(self).await
    }
}

pub type DisarmSignal = Signal<CriticalSectionRawMutex, ()>;

/// Cancels a running schedule from any context.
#[derive(Clone, Copy)]
pub struct DisarmHandle<'a> {
    signal: &'a DisarmSignal,
}

impl<'a> DisarmHandle<'a> {
    pub const fn new(signal: &'a DisarmSignal) -> Self {
        Self { signal }
    }

    /// Stops the schedule before its next firing. Stays latched afterwards.
    pub fn disarm(&self) {
        self.signal.signal(());
    }

    pub fn is_disarmed(&self) -> bool {
        self.signal.signaled()
    }

    async fn wait(&self) {
        self.signal.wait().await;
        // `wait` consumes the signal; put it back so the state stays observable.
        self.signal.signal(());
    }
}

/// Totals reported once the schedule stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunSummary {
    pub ticks: u32,
    pub overruns: u32,
    pub missed_slots: u32,
}

/// Drives `callback` on a fixed-rate schedule until it is disarmed or the
/// callback returns `false`.
///
/// Firings are strictly serialized: the next wait only starts after
/// `on_tick` has returned, so a callback is never re-entered and needs no lock
/// around the state it owns. To get a cadence that does not depend on
/// foreground work, run this as the only task of a higher-priority
/// `InterruptExecutor`.
pub async fn run<P, A>(
    callback: &mut P,
    alarm: &mut A,
    disarm: DisarmHandle<'_>,
    period: Period,
) -> RunSummary
where
    P: Periodic,
    A: Alarm,
{
    let mut schedule = FixedRate::new(alarm.now(), period);
    let mut summary = RunSummary::default();
    debug!("schedule armed, period {} us", period.as_micros());

    loop {
        if disarm.is_disarmed() {
            break;
        }
        let deadline = schedule.deadline();
        if let Either::Second(()) = select(alarm.wait_until(deadline), disarm.wait()).await {
            break;
        }

        let keep_armed = callback.on_tick().await;
        summary.ticks = summary.ticks.wrapping_add(1);
        if !keep_armed {
            break;
        }

        if let Advance::Overrun { skipped } = schedule.advance(alarm.now()) {
            warn!("sampling overrun, {} slot(s) dropped", skipped);
        }
    }

    summary.overruns = schedule.overruns();
    summary.missed_slots = schedule.missed_slots();
    info!("schedule disarmed: {}", summary);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    // Whole ticks keep the arithmetic exact whatever the tick rate.
    fn at(ticks: u64) -> Instant {
        Instant::from_ticks(ticks)
    }

    const PERIOD: Period = Period::from_ticks(4);

    #[test]
    fn first_firing_is_one_period_after_origin() {
        let schedule = FixedRate::new(at(100), PERIOD);
        assert_eq!(schedule.deadline(), at(104));
    }

    #[test]
    fn on_time_ticks_stay_on_the_grid() {
        let mut schedule = FixedRate::new(at(0), PERIOD);
        // Callback duration does not push the grid.
        assert_eq!(schedule.advance(at(7)), Advance::OnTime);
        assert_eq!(schedule.deadline(), at(8));
        assert_eq!(schedule.advance(at(8)), Advance::OnTime);
        assert_eq!(schedule.deadline(), at(12));
        assert_eq!(schedule.overruns(), 0);
    }

    #[test]
    fn overrun_fires_immediately_and_drops_whole_slots() {
        let mut schedule = FixedRate::new(at(0), PERIOD);
        // Tick at 4 returns at 13: slot 8 is lost, slot 12 runs late.
        assert_eq!(schedule.advance(at(13)), Advance::Overrun { skipped: 1 });
        assert_eq!(schedule.deadline(), at(13));

        // Back on the original grid.
        assert_eq!(schedule.advance(at(14)), Advance::OnTime);
        assert_eq!(schedule.deadline(), at(16));
        assert_eq!(schedule.overruns(), 1);
        assert_eq!(schedule.missed_slots(), 1);
    }

    #[test]
    fn short_overrun_skips_nothing() {
        let mut schedule = FixedRate::new(at(0), PERIOD);
        assert_eq!(schedule.advance(at(9)), Advance::Overrun { skipped: 0 });
        assert_eq!(schedule.deadline(), at(9));
        assert_eq!(schedule.advance(at(10)), Advance::OnTime);
        assert_eq!(schedule.deadline(), at(12));
    }

    #[test]
    fn millisecond_period_does_not_drift() {
        let period = Period::from_millis(4);
        let mut schedule = FixedRate::new(at(0), period);
        for _ in 1..2_500 {
            let deadline = schedule.deadline();
            assert_eq!(schedule.advance(deadline), Advance::OnTime);
        }
        // Slot 2500 lands exactly on the 10 s mark, whatever the tick rate.
        assert_eq!(schedule.deadline(), at(10 * TICK_HZ));
        assert_eq!(period.as_micros(), 4_000);
    }

    #[test]
    fn overrun_with_fractional_period_rejoins_the_grid() {
        let period = Period::from_millis(4);
        let origin = at(0);
        let mut schedule = FixedRate::new(origin, period);
        let slot = |n: u64| origin + period.offset(n);

        // Firing for slot 1 runs into slot 3: slot 2 dropped, slot 3 late.
        let finished = slot(3) + Duration::from_ticks(1);
        assert_eq!(schedule.advance(finished), Advance::Overrun { skipped: 1 });
        assert_eq!(schedule.deadline(), finished);

        assert_eq!(schedule.advance(finished), Advance::OnTime);
        assert_eq!(schedule.deadline(), slot(4));
    }
}
