//! Constant bit-rate traffic generator

use log::{debug, warn, error};

use rand_core::RngCore;

use crate::error::MacError;
use crate::packet::MAX_PAYLOAD_LEN;
use crate::phy::Phy;
use crate::timer::{Timer, RolloverCmp};

use super::core::Core;

impl <P, T, R, const N: usize> Core<P, T, R, N>
where
    P: Phy,
    T: Timer,
    R: RngCore,
{
    /// Submit a random payload once per configured period
    pub(crate) fn tick_cbr(&mut self, now: u32) {
        let (period, length, destination, ack_request) = match &self.config.cbr {
            Some(c) => (c.period_us, c.length.min(MAX_PAYLOAD_LEN), c.destination, c.ack_request),
            None => return,
        };

        if !now.ge_rollover(self.cbr_next) {
            return;
        }
        self.cbr_next = now.wrapping_add(period);

        let mut data = [0u8; MAX_PAYLOAD_LEN];
        self.rng.fill_bytes(&mut data[..length]);

        let pan_id = self.config.address.pan_id;

        match self.data_request(ack_request, true, pan_id, destination, &data[..length]) {
            Ok(()) => debug!("CBR frame of {} bytes queued at {} us", length, now),
            Err(MacError::Busy) => warn!("Congestion at MAC layer, CBR frame dropped at {} us", now),
            Err(e) => error!("CBR data request failed: {:?}", e),
        }
    }
}
