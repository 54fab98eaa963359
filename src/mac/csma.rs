//! CSMA/CA transmit engine
//!
//! Unslotted CSMA/CA with truncated binary exponential backoff, driven
//! once per [`Mac::tick`]. A single frame is in flight at a time, each
//! accepted frame ends in exactly one [`DataConfirm`].

use log::{trace, debug, info, error};

use rand_core::RngCore;
use strum::Display;

use crate::error::MacError;
use crate::phy::Phy;
use crate::timer::{Timer, RolloverCmp};

use super::Mac;
use super::core::*;

/// CSMA/CA engine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CsmaState {
    NewFrame,
    InitValues,
    SetBackoff,
    WaitBackoff,
    PerformCca,
    TransmitFrame,
    WaitAck,
    WaitInterframe,
}

/// Terminal outcome of a data request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataConfirm {
    Success,
    /// No ACK received after all retries
    NoAck,
    /// Channel busy for every CCA attempt
    ChannelAccessFailure,
}

/// Per-cycle engine variables
#[derive(Debug, Clone, PartialEq)]
pub struct CsmaEngine {
    pub(crate) state: CsmaState,
    /// Set from latching a frame until its confirm
    pub(crate) in_progress: bool,
    /// Remaining retransmissions, exhausted when negative
    pub(crate) retries: i8,
    /// Backoff attempts (NB)
    pub(crate) nb: u8,
    /// Backoff exponent (BE)
    pub(crate) be: u8,
    /// Backoff, ACK or interframe deadline depending on state
    pub(crate) deadline: u32,
}

impl CsmaEngine {
    /// Create an idle engine, ready to pick up a frame after `now`
    pub fn new(now: u32) -> Self {
        Self {
            state: CsmaState::WaitInterframe,
            in_progress: false,
            retries: 0,
            nb: 0,
            be: 0,
            deadline: now,
        }
    }

    pub fn state(&self) -> CsmaState {
        self.state
    }
}

impl <P, T, R, const N: usize> Core<P, T, R, N>
where
    P: Phy,
    T: Timer,
    R: RngCore,
{
    /// Current CSMA/CA engine state
    pub fn csma_state(&self) -> CsmaState {
        self.csma.state
    }

    /// Advance the CSMA/CA engine by one step
    pub(crate) fn tick_csma(&mut self, now: u32) -> Result<Option<DataConfirm>, MacError<P::Error>> {
        use CsmaState::*;

        trace!("CSMA tick at {} us state: {}", now, self.csma.state);

        match self.csma.state {
            NewFrame => {
                if self.csma.in_progress {
                    self.csma.state = SetBackoff;
                    return Ok(None);
                }

                let seq = match &self.tx_buffer {
                    Some(p) => p.header.seq,
                    None => return Ok(None),
                };

                debug!("Starting CSMA cycle for frame {} at {} us", seq, now);

                self.csma.retries = self.config.csma.max_frame_retries;
                self.csma.in_progress = true;

                self.init_values();
                self.set_backoff(now);
            },
            InitValues => {
                self.init_values();
                self.set_backoff(now);
            },
            SetBackoff => self.set_backoff(now),
            WaitBackoff => if now.gt_rollover(self.csma.deadline) {
                self.csma.state = PerformCca;
            },
            PerformCca => {
                let energy = self.phy.sample_energy();
                if let Err(e) = &energy {
                    error!("CCA energy sample failed: {:?}", e);
                    self.stats.cca_errors = self.stats.cca_errors.saturating_add(1);
                }

                // A failed sample counts as a busy channel
                if let Ok(&v) = energy.as_ref() {
                    if v < self.config.csma.cca_busy_threshold {
                        trace!("Channel clear ({}) at {} us", v, now);
                        self.csma.state = TransmitFrame;
                        return Ok(None);
                    }
                }

                self.csma.nb = self.csma.nb.saturating_add(1);
                self.csma.be = self.csma.be.saturating_add(1).min(self.config.csma.max_be);

                debug!("Channel busy ({:?}) at {} us, NB: {} BE: {}",
                    energy, now, self.csma.nb, self.csma.be);

                if self.csma.nb > self.config.csma.max_csma_backoffs {
                    return Ok(Some(self.confirm(DataConfirm::ChannelAccessFailure, now)));
                }

                self.csma.state = SetBackoff;

                energy.map_err(MacError::Radio)?;
            },
            TransmitFrame => {
                if self.csma.retries < 0 {
                    return Ok(Some(self.confirm(DataConfirm::NoAck, now)));
                }

                let packet = match self.tx_buffer.take() {
                    Some(p) => p,
                    None => {
                        error!("CSMA cycle in progress with no frame");
                        self.csma.in_progress = false;
                        self.csma.state = NewFrame;
                        return Ok(None);
                    }
                };

                let seq = packet.header.seq;
                let ack_request = packet.header.ack_request;

                debug!("Transmitting frame {} at {} us ({} retries remaining)",
                    seq, now, self.csma.retries);

                // Only ACKs received after this transmission count
                self.last_ack = None;

                let res = self.transmit_now(&packet);
                self.tx_buffer = Some(packet);

                // A failed transmission uses up an attempt
                if let Err(e) = res {
                    error!("Transmit failed for frame {}: {:?}", seq, e);
                    self.stats.tx_errors = self.stats.tx_errors.saturating_add(1);

                    self.csma.retries = self.csma.retries.saturating_sub(1);
                    self.csma.state = InitValues;

                    return Err(e);
                }

                if ack_request {
                    self.csma.deadline = now.wrapping_add(self.config.csma.ack_wait_us);
                    self.csma.state = WaitAck;
                } else {
                    return Ok(Some(self.confirm(DataConfirm::Success, now)));
                }
            },
            WaitAck => {
                let seq = self.tx_buffer.as_ref().map(|p| p.header.seq);

                if self.last_ack.is_some() && self.last_ack == seq {
                    return Ok(Some(self.confirm(DataConfirm::Success, now)));
                }

                if now.gt_rollover(self.csma.deadline) {
                    self.csma.retries = self.csma.retries.saturating_sub(1);
                    self.stats.ack_timeouts = self.stats.ack_timeouts.saturating_add(1);

                    debug!("ACK timeout at {} us, {} retries remaining", now, self.csma.retries);

                    self.csma.state = InitValues;
                }
            },
            WaitInterframe => if now.gt_rollover(self.csma.deadline) {
                self.csma.state = NewFrame;
            },
        }

        Ok(None)
    }

    fn init_values(&mut self) {
        self.csma.nb = 0;
        self.csma.be = self.config.csma.min_be;
    }

    fn set_backoff(&mut self, now: u32) {
        let window = 1u32 << self.csma.be.min(31);
        let slots = self.rng.next_u32() % window;

        self.csma.deadline = now.wrapping_add(slots.wrapping_mul(self.config.csma.backoff_slot_us));
        self.csma.state = CsmaState::WaitBackoff;

        trace!("Backoff {} slots (BE {}), expires at {} us", slots, self.csma.be, self.csma.deadline);
    }

    /// Complete the current cycle, releasing the frame
    fn confirm(&mut self, outcome: DataConfirm, now: u32) -> DataConfirm {
        let seq = self.tx_buffer.take().map(|p| p.header.seq);

        self.csma.in_progress = false;

        match outcome {
            DataConfirm::Success => {
                self.csma.deadline = now.wrapping_add(self.config.csma.interframe_us);
                self.csma.state = CsmaState::WaitInterframe;
                self.stats.tx_success = self.stats.tx_success.saturating_add(1);
            },
            DataConfirm::NoAck => {
                self.csma.state = CsmaState::NewFrame;
                self.stats.tx_no_ack = self.stats.tx_no_ack.saturating_add(1);
            },
            DataConfirm::ChannelAccessFailure => {
                self.csma.state = CsmaState::NewFrame;
                self.stats.tx_channel_access_failure = self.stats.tx_channel_access_failure.saturating_add(1);
            },
        }

        info!("Data confirm for frame {:?} at {} us: {}", seq, now, outcome);

        outcome
    }
}

impl <P, T, R, const N: usize> Mac for Core<P, T, R, N>
where
    P: Phy,
    T: Timer,
    R: RngCore,
{
    type Error = MacError<P::Error>;

    fn init(&mut self) {
        Core::init(self)
    }

    fn send(&mut self, destination: u16, data: &[u8]) -> Result<(), Self::Error> {
        let pan_id = self.config.address.pan_id;
        self.data_request(true, true, pan_id, destination, data)
    }

    fn receive(&mut self) -> Option<Received> {
        self.take_received()
    }

    fn busy(&self) -> bool {
        self.is_busy()
    }

    fn tick(&mut self) -> Result<Option<DataConfirm>, Self::Error> {
        let now = self.timer.ticks_us();

        // PHY errors on the receive side never hold up the engine
        let rx = self.poll_received().map(|_| ());

        let ack = self.tick_ack(now);

        self.tick_cbr(now);

        // Confirms take precedence, errors have already been logged
        match self.tick_csma(now)? {
            Some(c) => Ok(Some(c)),
            None => rx.and(ack).map(|_| None),
        }
    }
}
