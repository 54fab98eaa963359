//! MAC core: frame reception, data requests and ACK replies

use log::{trace, debug, warn, error};

use heapless::{Deque, Vec};
use rand_core::RngCore;

use super::config::*;
use super::csma::CsmaEngine;
use crate::error::{DecodeError, MacError};
use crate::neighbors::{Insert, NeighborTable};
use crate::packet::{Packet, Header, FrameType, ACK_FRAME_LEN, MAX_PAYLOAD_LEN};
use crate::phy::{Phy, RxInfo};
use crate::timer::{Timer, RolloverCmp};
use crate::{BROADCAST_ADDRESS, MAX_FRAME_LEN, NEIGHBOR_TABLE_LEN};

/// Scratch buffer length for frames read from the PHY
const RX_BUFF_LEN: usize = 256;

/// Maximum number of ACK replies awaiting their guard delay
pub const ACK_QUEUE_LEN: usize = 4;

/// Payload delivered to the application
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    pub source: u16,
    pub rssi: i16,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

/// Outcome of processing a received frame
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxEvent {
    /// ACK recorded for the provided sequence number
    Ack(u8),
    /// Data payload placed in the receive slot
    Delivered{ source: u16, seq: u8 },
    /// Data frame already seen from this source
    Duplicate{ source: u16, seq: u8 },
    /// Addressed frame of a type with no handler
    Unhandled(FrameType),
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DropReason {
    Malformed(DecodeError),
    /// ACK frame with an unexpected length
    AckLength(usize),
    PanMismatch(u16),
    /// Destination is neither this node nor broadcast
    NotForUs(u16),
}

/// ACK reply awaiting its guard delay
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingAck {
    pub seq: u8,
    pub tx_time: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MacStats {
    pub tx_success: u32,
    pub tx_no_ack: u32,
    pub tx_channel_access_failure: u32,
    /// ACK wait expiries, including the final one before `NoAck`
    pub ack_timeouts: u32,
    /// Failed transmissions of data frames
    pub tx_errors: u32,
    /// Failed CCA energy samples
    pub cca_errors: u32,
    pub rx_errors: u32,
    pub acks_sent: u32,
    /// ACK replies lost to a full queue or a failed transmission
    pub acks_dropped: u32,
    pub rx_delivered: u32,
    pub rx_duplicate: u32,
    pub rx_overwritten: u32,
    pub rx_malformed: u32,
    pub rx_pan_mismatch: u32,
    pub rx_not_for_us: u32,
    pub neighbor_table_full: u32,
}

/// CSMA/CA MAC
/// Generic over a PHY (P), Timer (T), Random source (R) and neighbor table size (N)
pub struct Core<P, T, R, const N: usize = NEIGHBOR_TABLE_LEN> {
    pub(crate) config: Config,

    pub(crate) phy: P,
    pub(crate) timer: T,
    pub(crate) rng: R,

    pub(crate) neighbors: NeighborTable<N>,

    /// Sequence number for the next locally originated data frame
    pub(crate) seq: u8,

    /// Frame queued for or owned by the CSMA/CA engine
    pub(crate) tx_buffer: Option<Packet>,
    /// Undelivered payload
    pub(crate) rx_buffer: Option<Received>,

    pub(crate) csma: CsmaEngine,
    pub(crate) last_ack: Option<u8>,
    /// ACK replies in reception order
    pub(crate) ack_queue: Deque<PendingAck, ACK_QUEUE_LEN>,

    pub(crate) cbr_next: u32,

    pub(crate) stats: MacStats,
}

impl <P, T, R, const N: usize> Core<P, T, R, N>
where
    P: Phy,
    T: Timer,
    R: RngCore,
{
    /// Create a new MAC using the provided PHY
    pub fn new(phy: P, timer: T, rng: R, config: Config) -> Self {
        let now = timer.ticks_us();

        let mut s = Self {
            config,

            phy,
            timer,
            rng,

            neighbors: NeighborTable::new(),
            seq: 0,

            tx_buffer: None,
            rx_buffer: None,

            csma: CsmaEngine::new(now),
            last_ack: None,
            ack_queue: Deque::new(),

            cbr_next: now,

            stats: MacStats::default(),
        };

        s.init();

        s
    }

    /// Reset the neighbor table and return the engine to idle
    pub fn init(&mut self) {
        let now = self.timer.ticks_us();

        debug!("MAC init for 0x{:04x} (PAN 0x{:04x}) at {} us",
            self.config.address.short_address, self.config.address.pan_id, now);

        self.neighbors.reset();
        self.seq = 0;

        self.tx_buffer = None;
        self.rx_buffer = None;

        self.csma = CsmaEngine::new(now);
        self.last_ack = None;
        self.ack_queue = Deque::new();

        if let Some(cbr) = &self.config.cbr {
            self.cbr_next = now.wrapping_add(cbr.period_us);
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn neighbors(&self) -> &NeighborTable<N> {
        &self.neighbors
    }

    /// Fetch MAC layer statistics
    pub fn stats(&self) -> MacStats {
        self.stats.clone()
    }

    /// Fetch the underlying PHY
    pub fn phy(&mut self) -> &mut P {
        &mut self.phy
    }

    /// Check whether a frame is queued or in flight
    pub fn is_busy(&self) -> bool {
        self.tx_buffer.is_some()
    }

    /// Submit a data frame for transmission.
    ///
    /// The outcome is reported later by the engine tick as a
    /// [`DataConfirm`](super::csma::DataConfirm).
    pub fn data_request(&mut self, ack_request: bool, intra_pan: bool, pan_id: u16, destination: u16, data: &[u8]) -> Result<(), MacError<P::Error>> {
        if self.tx_buffer.is_some() {
            debug!("Data request rejected, MAC busy");
            return Err(MacError::Busy)
        }

        // Broadcasts are never acknowledged
        let ack_request = ack_request && destination != BROADCAST_ADDRESS;

        let header = Header::data(ack_request, intra_pan, pan_id, destination,
            self.config.address.short_address, self.seq);
        let packet = Packet::data(header, data)
            .ok_or(MacError::PayloadTooLong(data.len()))?;

        debug!("Queued frame {} for 0x{:04x} ({} bytes, ack: {})",
            self.seq, destination, data.len(), ack_request);

        self.seq = self.seq.wrapping_add(1);
        self.tx_buffer = Some(packet);

        Ok(())
    }

    /// Take the pending received payload (if present)
    pub fn take_received(&mut self) -> Option<Received> {
        self.rx_buffer.take()
    }

    /// Poll the PHY for a received frame and process it
    pub fn poll_received(&mut self) -> Result<Option<RxEvent>, MacError<P::Error>> {
        let mut buff = [0u8; RX_BUFF_LEN];

        let info = match self.phy.receive_poll(&mut buff) {
            Ok(Some(i)) => i,
            Ok(None) => return Ok(None),
            Err(e) => {
                error!("PHY receive poll failed: {:?}", e);
                self.stats.rx_errors = self.stats.rx_errors.saturating_add(1);
                return Err(MacError::Radio(e))
            },
        };

        let n = info.len.min(buff.len());

        trace!("PHY rx at {} us rssi {} ({} bytes): {:02x?}",
            info.timestamp, info.rssi, n, &buff[..n]);

        Ok(Some(self.on_frame_received(&buff[..n], info)))
    }

    /// Process a frame received from the PHY
    pub fn on_frame_received(&mut self, data: &[u8], info: RxInfo) -> RxEvent {
        let packet = match Packet::decode(data) {
            Ok(p) => p,
            Err(e) => {
                debug!("Dropping malformed frame ({} bytes): {:?}", data.len(), e);
                self.stats.rx_malformed = self.stats.rx_malformed.saturating_add(1);
                return RxEvent::Dropped(DropReason::Malformed(e))
            }
        };

        let header = packet.header;

        let addressing = match (header.frame_type, header.addressing) {
            (FrameType::Ack, _) => {
                if data.len() != ACK_FRAME_LEN {
                    warn!("ACK with abnormal size received ({} bytes)", data.len());
                    self.stats.rx_malformed = self.stats.rx_malformed.saturating_add(1);
                    return RxEvent::Dropped(DropReason::AckLength(data.len()))
                }

                debug!("Received ACK for packet {}", header.seq);
                self.last_ack = Some(header.seq);

                return RxEvent::Ack(header.seq)
            },
            (_, Some(a)) => a,
            (_, None) => return RxEvent::Dropped(DropReason::Malformed(DecodeError::NotEnoughBytes)),
        };

        // Filter by PAN ID
        if addressing.pan_id != self.config.address.pan_id {
            debug!("PAN ID mismatch, dropped packet {} for 0x{:04x}", header.seq, addressing.pan_id);
            self.stats.rx_pan_mismatch = self.stats.rx_pan_mismatch.saturating_add(1);
            return RxEvent::Dropped(DropReason::PanMismatch(addressing.pan_id))
        }

        self.track_neighbor(addressing.source, &info);

        // Filter by destination
        let dest = addressing.destination;
        if dest != self.config.address.short_address && dest != BROADCAST_ADDRESS {
            trace!("Address mismatch, dropped packet {} for 0x{:04x}", header.seq, dest);
            self.stats.rx_not_for_us = self.stats.rx_not_for_us.saturating_add(1);
            return RxEvent::Dropped(DropReason::NotForUs(dest))
        }

        // Arm ACK response if required
        if header.ack_request {
            self.schedule_ack(header.seq, addressing.source);
        }

        match header.frame_type {
            FrameType::Data => self.handle_data(addressing.source, packet, info),
            t => {
                debug!("Received {} frame from 0x{:04x}, no handler", t, addressing.source);
                RxEvent::Unhandled(t)
            },
        }
    }

    fn track_neighbor(&mut self, source: u16, info: &RxInfo) {
        if source == BROADCAST_ADDRESS {
            debug!("Frame with broadcast source address, not tracking");
            return;
        }

        if self.neighbors.update(source, info.timestamp, info.rssi) {
            return;
        }

        match self.neighbors.insert(source, info.timestamp, info.rssi) {
            Insert::Inserted(i) => {
                debug!("New neighbor 0x{:04x} (#{})", source, i);
                self.neighbors.log_table();
            },
            Insert::AlreadyPresent(n) => {
                warn!("Neighbor 0x{:04x} duplicated in table ({} entries)", source, n);
            },
            Insert::Full => {
                warn!("Neighbor table full, not tracking 0x{:04x}", source);
                self.stats.neighbor_table_full = self.stats.neighbor_table_full.saturating_add(1);
            },
        }
    }

    fn handle_data(&mut self, source: u16, packet: Packet, info: RxInfo) -> RxEvent {
        let seq = packet.header.seq;

        // Untracked senders (full table) bypass duplicate detection
        if let Some(n) = self.neighbors.get_mut(source) {
            if n.seq.data == Some(seq) {
                debug!("Duplicated frame {} from 0x{:04x}", seq, source);
                self.stats.rx_duplicate = self.stats.rx_duplicate.saturating_add(1);
                return RxEvent::Duplicate{ source, seq }
            }
            n.seq.data = Some(seq);
        }

        debug!("Received {} bytes of data from 0x{:04x}", packet.payload().len(), source);

        if let Some(prev) = &self.rx_buffer {
            debug!("Overwriting undelivered payload from 0x{:04x}", prev.source);
            self.stats.rx_overwritten = self.stats.rx_overwritten.saturating_add(1);
        }

        self.rx_buffer = Some(Received {
            source,
            rssi: info.rssi,
            payload: packet.into_payload(),
        });
        self.stats.rx_delivered = self.stats.rx_delivered.saturating_add(1);

        RxEvent::Delivered{ source, seq }
    }

    /// ACK replies waiting for their guard delay
    pub fn pending_acks(&self) -> impl Iterator<Item=&PendingAck> {
        self.ack_queue.iter()
    }

    fn schedule_ack(&mut self, seq: u8, source: u16) {
        let tx_time = self.timer.ticks_us().wrapping_add(self.config.csma.ack_delay_us);

        match self.ack_queue.push_back(PendingAck{ seq, tx_time }) {
            Ok(()) => debug!("Scheduled ACK for packet {} from 0x{:04x} at {} us", seq, source, tx_time),
            Err(_) => {
                warn!("ACK queue full, dropped ACK for packet {} from 0x{:04x}", seq, source);
                self.stats.acks_dropped = self.stats.acks_dropped.saturating_add(1);
            },
        }
    }

    /// Transmit every scheduled ACK whose guard delay has elapsed
    pub(crate) fn tick_ack(&mut self, now: u32) -> Result<(), MacError<P::Error>> {
        // Scheduled with a fixed delay, so due times follow queue order
        while let Some(ack) = self.ack_queue.front().copied() {
            if !now.ge_rollover(ack.tx_time) {
                break;
            }
            self.ack_queue.pop_front();

            debug!("Sending ACK for packet {} at {} us", ack.seq, now);

            if let Err(e) = self.transmit_now(&Packet::ack(ack.seq)) {
                error!("ACK transmit failed for packet {}: {:?}", ack.seq, e);
                self.stats.acks_dropped = self.stats.acks_dropped.saturating_add(1);
                return Err(e)
            }
            self.stats.acks_sent = self.stats.acks_sent.saturating_add(1);
        }

        Ok(())
    }

    /// Transmit a packet immediately (bypassing CSMA)
    pub(crate) fn transmit_now(&mut self, packet: &Packet) -> Result<(), MacError<P::Error>> {
        let mut buff = [0u8; MAX_FRAME_LEN];
        let n = packet.encode(&mut buff);

        trace!("Transmitting ({} bytes): {:02x?}", n, &buff[..n]);

        self.phy.transmit(&buff[..n]).map_err(MacError::Radio)
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::mock::StepRng;

    use crate::phy::mock::MockPhy;
    use crate::timer::mock::MockTimer;
    use crate::packet::HEADER_LEN;
    use super::*;

    const PAN: u16 = 0x0100;
    const ME: u16 = 0x0002;
    const PEER: u16 = 0x0003;

    fn setup() -> (Core<MockPhy, MockTimer, StepRng>, MockPhy, MockTimer) {
        let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, simplelog::Config::default());

        let timer = MockTimer::new();
        let phy = MockPhy::new(timer.clone());
        let mac = Core::new(phy.clone(), timer.clone(), StepRng::new(0, 0), Config::new(PAN, ME));

        (mac, phy, timer)
    }

    fn frame(ack: bool, pan: u16, dest: u16, src: u16, seq: u8, payload: &[u8]) -> ([u8; MAX_FRAME_LEN], usize) {
        let p = Packet::data(Header::data(ack, true, pan, dest, src, seq), payload).unwrap();
        let mut buff = [0u8; MAX_FRAME_LEN];
        let n = p.encode(&mut buff);
        (buff, n)
    }

    fn info() -> RxInfo {
        RxInfo{ len: 0, rssi: -60, timestamp: 10 }
    }

    #[test]
    fn deliver_data_to_slot() {
        let (mut mac, _phy, _timer) = setup();
        let (buff, n) = frame(false, PAN, ME, PEER, 1, &[1, 2, 3]);

        assert_eq!(mac.on_frame_received(&buff[..n], info()), RxEvent::Delivered{ source: PEER, seq: 1 });

        let rx = mac.take_received().unwrap();
        assert_eq!(rx.source, PEER);
        assert_eq!(&rx.payload[..], &[1, 2, 3]);
        assert_eq!(mac.take_received(), None);

        let nbr = mac.neighbors().get(PEER).unwrap();
        assert_eq!(nbr.last_rssi, -60);
        assert_eq!(nbr.seq.data, Some(1));
    }

    #[test]
    fn duplicate_data_delivered_once() {
        let (mut mac, _phy, _timer) = setup();
        let (buff, n) = frame(false, PAN, ME, PEER, 9, &[0xaa]);

        assert_eq!(mac.on_frame_received(&buff[..n], info()), RxEvent::Delivered{ source: PEER, seq: 9 });
        assert!(mac.take_received().is_some());

        assert_eq!(mac.on_frame_received(&buff[..n], info()), RxEvent::Duplicate{ source: PEER, seq: 9 });
        assert!(mac.take_received().is_none());
        assert_eq!(mac.stats().rx_duplicate, 1);

        // Next sequence number is accepted
        let (buff, n) = frame(false, PAN, ME, PEER, 10, &[0xbb]);
        assert_eq!(mac.on_frame_received(&buff[..n], info()), RxEvent::Delivered{ source: PEER, seq: 10 });
    }

    #[test]
    fn first_frame_with_seq_255_is_delivered() {
        let (mut mac, _phy, _timer) = setup();
        let (buff, n) = frame(false, PAN, ME, PEER, 255, &[0x01]);

        assert_eq!(mac.on_frame_received(&buff[..n], info()), RxEvent::Delivered{ source: PEER, seq: 255 });
    }

    #[test]
    fn undelivered_payload_is_overwritten() {
        let (mut mac, _phy, _timer) = setup();

        let (buff, n) = frame(false, PAN, ME, PEER, 1, &[1]);
        mac.on_frame_received(&buff[..n], info());
        let (buff, n) = frame(false, PAN, BROADCAST_ADDRESS, 0x0004, 1, &[2]);
        mac.on_frame_received(&buff[..n], info());

        let rx = mac.take_received().unwrap();
        assert_eq!(rx.source, 0x0004);
        assert_eq!(&rx.payload[..], &[2]);
        assert_eq!(mac.stats().rx_overwritten, 1);
    }

    #[test]
    fn pan_mismatch_dropped_silently() {
        let (mut mac, _phy, _timer) = setup();
        let (buff, n) = frame(true, 0x0200, ME, PEER, 1, &[1]);

        assert_eq!(mac.on_frame_received(&buff[..n], info()), RxEvent::Dropped(DropReason::PanMismatch(0x0200)));
        assert!(mac.neighbors().is_empty());
        assert_eq!(mac.pending_acks().count(), 0);
    }

    #[test]
    fn other_destination_tracks_neighbor_only() {
        let (mut mac, _phy, _timer) = setup();
        let (buff, n) = frame(true, PAN, 0x0009, PEER, 1, &[1]);

        assert_eq!(mac.on_frame_received(&buff[..n], info()), RxEvent::Dropped(DropReason::NotForUs(0x0009)));
        assert!(mac.neighbors().get(PEER).is_some());
        assert!(mac.take_received().is_none());
        assert_eq!(mac.pending_acks().count(), 0);
    }

    #[test]
    fn ack_recorded() {
        let (mut mac, _phy, _timer) = setup();

        assert_eq!(mac.on_frame_received(&[0x88, 0x42, 0x17], info()), RxEvent::Ack(0x17));
        assert_eq!(mac.last_ack, Some(0x17));
    }

    #[test]
    fn malformed_ack_dropped() {
        let (mut mac, _phy, _timer) = setup();

        assert_eq!(mac.on_frame_received(&[0x88, 0x42, 0x17, 0x00], info()), RxEvent::Dropped(DropReason::AckLength(4)));
        assert_eq!(mac.last_ack, None);
    }

    #[test]
    fn truncated_frame_dropped() {
        let (mut mac, _phy, _timer) = setup();

        assert_eq!(mac.on_frame_received(&[0x88, 0x61, 0x01, 0x01], info()),
            RxEvent::Dropped(DropReason::Malformed(DecodeError::NotEnoughBytes)));
        assert_eq!(mac.on_frame_received(&[0x88], info()),
            RxEvent::Dropped(DropReason::Malformed(DecodeError::NotEnoughBytes)));
    }

    #[test]
    fn beacon_and_command_unhandled() {
        let (mut mac, _phy, _timer) = setup();

        let mut h = Header::data(false, true, PAN, ME, PEER, 1);
        h.frame_type = FrameType::Command;
        let mut buff = [0u8; HEADER_LEN];
        h.encode(&mut buff);

        assert_eq!(mac.on_frame_received(&buff, info()), RxEvent::Unhandled(FrameType::Command));
        assert!(mac.neighbors().get(PEER).is_some());
        assert!(mac.take_received().is_none());
    }

    #[test]
    fn ack_sent_after_guard_delay() {
        let (mut mac, phy, mut timer) = setup();
        let (buff, n) = frame(true, PAN, ME, PEER, 0x21, &[1]);

        timer.set_us(1000);
        mac.on_frame_received(&buff[..n], info());
        assert_eq!(mac.pending_acks().copied().collect::<std::vec::Vec<_>>(), std::vec![PendingAck{ seq: 0x21, tx_time: 1640 }]);

        mac.tick_ack(1500).unwrap();
        assert!(phy.sent().is_empty());

        mac.tick_ack(1640).unwrap();
        assert_eq!(phy.sent(), std::vec![std::vec![0x88, 0x42, 0x21]]);
        assert_eq!(mac.pending_acks().count(), 0);
    }

    #[test]
    fn full_table_still_delivers() {
        let (mut mac, _phy, _timer) = setup();

        for a in 0..NEIGHBOR_TABLE_LEN as u16 {
            let (buff, n) = frame(false, PAN, 0x0009, 0x0100 + a, 1, &[]);
            mac.on_frame_received(&buff[..n], info());
        }
        assert!(mac.neighbors().is_full());

        let (buff, n) = frame(false, PAN, ME, PEER, 1, &[7]);
        assert_eq!(mac.on_frame_received(&buff[..n], info()), RxEvent::Delivered{ source: PEER, seq: 1 });
        assert_eq!(mac.neighbors().lookup(PEER), None);
        assert_eq!(mac.stats().neighbor_table_full, 1);
    }

    #[test]
    fn busy_while_frame_queued() {
        let (mut mac, _phy, _timer) = setup();

        mac.data_request(true, true, PAN, PEER, &[1]).unwrap();
        assert_eq!(mac.data_request(true, true, PAN, PEER, &[2]), Err(MacError::Busy));
        assert_eq!(mac.seq, 1);
    }

    #[test]
    fn broadcast_request_clears_ack() {
        let (mut mac, _phy, _timer) = setup();

        mac.data_request(true, true, PAN, BROADCAST_ADDRESS, &[1]).unwrap();

        let p = mac.tx_buffer.as_ref().unwrap();
        assert!(!p.header.ack_request);
    }

    #[test]
    fn oversized_request_rejected() {
        let (mut mac, _phy, _timer) = setup();

        let data = [0u8; MAX_PAYLOAD_LEN + 1];
        assert_eq!(mac.data_request(false, true, PAN, PEER, &data), Err(MacError::PayloadTooLong(MAX_PAYLOAD_LEN + 1)));
        assert!(!mac.is_busy());
        assert_eq!(mac.seq, 0);
    }

    #[test]
    fn overlapping_ack_requests_all_acknowledged() {
        let (mut mac, phy, mut timer) = setup();

        timer.set_us(1000);
        let (buff, n) = frame(true, PAN, ME, 0x0003, 7, &[1]);
        mac.on_frame_received(&buff[..n], info());

        timer.set_us(1100);
        let (buff, n) = frame(true, PAN, ME, 0x0004, 9, &[2]);
        mac.on_frame_received(&buff[..n], info());

        assert_eq!(mac.pending_acks().count(), 2);

        mac.tick_ack(1640).unwrap();
        assert_eq!(phy.sent(), std::vec![std::vec![0x88, 0x42, 7]]);

        mac.tick_ack(1740).unwrap();
        assert_eq!(phy.sent(), std::vec![std::vec![0x88, 0x42, 7], std::vec![0x88, 0x42, 9]]);
        assert_eq!(mac.pending_acks().count(), 0);
        assert_eq!(mac.stats().acks_sent, 2);
    }

    #[test]
    fn due_acks_sent_in_one_tick() {
        let (mut mac, phy, _timer) = setup();

        for seq in 0..3 {
            let (buff, n) = frame(true, PAN, ME, 0x0010 + seq as u16, seq, &[]);
            mac.on_frame_received(&buff[..n], info());
        }

        mac.tick_ack(10_000).unwrap();

        assert_eq!(phy.sent().len(), 3);
        assert_eq!(mac.pending_acks().count(), 0);
    }

    #[test]
    fn ack_queue_overflow_counted() {
        let (mut mac, _phy, _timer) = setup();

        for seq in 0..(ACK_QUEUE_LEN as u8 + 1) {
            let (buff, n) = frame(true, PAN, ME, 0x0010 + seq as u16, seq, &[]);
            mac.on_frame_received(&buff[..n], info());
        }

        assert_eq!(mac.pending_acks().count(), ACK_QUEUE_LEN);
        assert_eq!(mac.stats().acks_dropped, 1);
    }

    #[test]
    fn duplicate_frame_is_acknowledged_again() {
        let (mut mac, phy, mut timer) = setup();
        let (buff, n) = frame(true, PAN, ME, PEER, 5, &[0x42]);

        timer.set_us(1000);
        assert_eq!(mac.on_frame_received(&buff[..n], info()), RxEvent::Delivered{ source: PEER, seq: 5 });
        mac.tick_ack(1640).unwrap();
        assert!(mac.take_received().is_some());

        // Our ACK was lost, the sender retries
        timer.set_us(5000);
        assert_eq!(mac.on_frame_received(&buff[..n], info()), RxEvent::Duplicate{ source: PEER, seq: 5 });
        assert_eq!(mac.pending_acks().copied().collect::<std::vec::Vec<_>>(), std::vec![PendingAck{ seq: 5, tx_time: 5640 }]);
        assert!(mac.take_received().is_none());

        mac.tick_ack(5640).unwrap();
        assert_eq!(phy.sent(), std::vec![std::vec![0x88, 0x42, 5], std::vec![0x88, 0x42, 5]]);
        assert_eq!(mac.stats().rx_delivered, 1);
    }

    #[test]
    fn receive_error_reported() {
        let (mut mac, mut phy, _timer) = setup();
        phy.set_rx_error(true);

        assert_eq!(mac.poll_received(), Err(MacError::Radio(())));
        assert_eq!(mac.stats().rx_errors, 1);
    }
}
