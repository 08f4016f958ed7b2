pub trait Led {
    fn on(&mut self);
    fn off(&mut self);
    fn toggle(&mut self);
    fn is_on(&mut self) -> bool;
}

/// One leads-off comparator output of the ECG front end.
pub trait LeadOffInput {
    /// `true` while the electrode behind this line is detached.
    fn is_detached(&mut self) -> bool;
}

/// A single analog channel.
///
/// A conversion is bounded in time and never waits on another task.
#[allow(async_fn_in_trait)]
pub trait AnalogInput {
    async fn read(&mut self) -> u16;
}
