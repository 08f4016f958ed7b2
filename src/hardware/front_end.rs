use super::traits::{AnalogInput, LeadOffInput, Led};

/// Capabilities the sampler needs from the board: two digital reads, one
/// analog read and one digital write.
#[allow(async_fn_in_trait)]
pub trait FrontEnd {
    fn lead_off_plus(&mut self) -> bool;
    fn lead_off_minus(&mut self) -> bool;
    async fn acquire(&mut self) -> u16;
    fn toggle_heartbeat(&mut self);
}

/// Hardware handle for the ECG front end.
///
/// Built once by bootstrap with every pin and the converter already configured,
/// then lent to the sampler. Nothing inside reconfigures the parts afterwards.
pub struct EcgFrontEnd<P, M, L, A> {
    lo_plus: P,
    lo_minus: M,
    heartbeat: L,
    adc: A,
}

impl<P, M, L, A> EcgFrontEnd<P, M, L, A>
where
    P: LeadOffInput,
    M: LeadOffInput,
    L: Led,
    A: AnalogInput,
{
    pub fn new(lo_plus: P, lo_minus: M, heartbeat: L, adc: A) -> Self {
        Self {
            lo_plus,
            lo_minus,
            heartbeat,
            adc,
        }
    }

    pub fn heartbeat(&mut self) -> &mut L {
        &mut self.heartbeat
    }
}

impl<P, M, L, A> FrontEnd for EcgFrontEnd<P, M, L, A>
where
    P: LeadOffInput,
    M: LeadOffInput,
    L: Led,
    A: AnalogInput,
{
    fn lead_off_plus(&mut self) -> bool {
        self.lo_plus.is_detached()
    }

    fn lead_off_minus(&mut self) -> bool {
        self.lo_minus.is_detached()
    }

    async fn acquire(&mut self) -> u16 {
        self.adc.read().await
    }

    fn toggle_heartbeat(&mut self) {
        self.heartbeat.toggle();
    }
}
