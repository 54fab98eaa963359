//! Physical layer interface
//!
//! The MAC consumes the radio through the [`Phy`] trait. [`RadioPhy`]
//! implements this for any device providing the `radio` crate traits.

use core::fmt::Debug;

use log::{trace, error};

use radio::{Transmit, Receive, Rssi, ReceiveInfo};

use crate::timer::Timer;

/// Metadata for a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxInfo {
    /// Frame length in bytes
    pub len: usize,
    pub rssi: i16,
    /// Microsecond timestamp at reception
    pub timestamp: u32,
}

/// PHY collaborator used by the MAC
pub trait Phy {
    type Error: Debug;

    /// Transmit a frame, blocking until it has left the radio
    fn transmit(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Poll for a received frame, copying it into `buff`
    fn receive_poll(&mut self, buff: &mut [u8]) -> Result<Option<RxInfo>, Self::Error>;

    /// Sample the channel energy for clear channel assessment
    fn sample_energy(&mut self) -> Result<i16, Self::Error>;
}

/// [`Phy`] adapter for `radio` devices
#[derive(Debug, Clone, PartialEq)]
pub struct RadioPhy<R, T> {
    radio: R,
    timer: T,
}

impl <R, T, I, E> RadioPhy<R, T>
where
    R: Transmit<Error=E> + Receive<Info=I, Error=E> + Rssi<Error=E>,
    I: ReceiveInfo,
    E: Debug,
    T: Timer,
{
    /// Wrap a radio device, placing it in receive mode
    pub fn new(mut radio: R, timer: T) -> Result<Self, E> {
        radio.start_receive()?;

        Ok(Self { radio, timer })
    }

    pub fn inner(&mut self) -> &mut R {
        &mut self.radio
    }
}

impl <R, T, I, E> Phy for RadioPhy<R, T>
where
    R: Transmit<Error=E> + Receive<Info=I, Error=E> + Rssi<Error=E>,
    I: ReceiveInfo,
    E: Debug,
    T: Timer,
{
    type Error = E;

    fn transmit(&mut self, data: &[u8]) -> Result<(), E> {
        trace!("Transmitting ({} bytes): {:02x?}", data.len(), data);

        self.radio.start_transmit(data).map_err(|e| {
            error!("Radio start transmit error: {:?}", e);
            e
        })?;

        // Wait for on-air completion
        while !self.radio.check_transmit()? {}

        // Re-enter receive mode
        self.radio.start_receive()
    }

    fn receive_poll(&mut self, buff: &mut [u8]) -> Result<Option<RxInfo>, E> {
        if !self.radio.check_receive(true)? {
            return Ok(None)
        }

        let timestamp = self.timer.ticks_us();
        let (len, info) = self.radio.get_received(buff)?;

        trace!("Received ({} bytes) at {} us: {:02x?}", len, timestamp, &buff[..len]);

        // Restart receive for the next frame
        self.radio.start_receive()?;

        Ok(Some(RxInfo{ len, rssi: info.rssi(), timestamp }))
    }

    fn sample_energy(&mut self) -> Result<i16, E> {
        self.radio.poll_rssi()
    }
}

#[cfg(any(test, feature="mocks"))]
pub mod mock {
    //! Simulated channel for exercising the MAC without hardware

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::vec::Vec;

    use super::{Phy, RxInfo};
    use crate::packet::{Header, Packet, FrameType};
    use crate::timer::{Timer, mock::MockTimer};

    #[derive(Default)]
    struct Inner {
        energy: i16,
        auto_ack: bool,
        tx_error: bool,
        rx_error: bool,
        cca_error: bool,
        rx: VecDeque<(Vec<u8>, i16)>,
        sent: Vec<Vec<u8>>,
        peer: Option<Arc<Mutex<Inner>>>,
    }

    /// Mock PHY backed by an in-memory channel
    ///
    /// Transmitted frames are recorded and, for linked PHYs, delivered to
    /// the peer. With `auto_ack` enabled, every transmitted frame requesting
    /// an ACK is answered by a simulated peer.
    #[derive(Clone)]
    pub struct MockPhy {
        inner: Arc<Mutex<Inner>>,
        timer: MockTimer,
    }

    impl MockPhy {
        pub fn new(timer: MockTimer) -> Self {
            Self {
                inner: Arc::new(Mutex::new(Inner::default())),
                timer,
            }
        }

        /// Create two PHYs sharing a channel
        pub fn pair(timer: MockTimer) -> (Self, Self) {
            let a = Self::new(timer.clone());
            let b = Self::new(timer);

            a.inner.lock().unwrap().peer = Some(b.inner.clone());
            b.inner.lock().unwrap().peer = Some(a.inner.clone());

            (a, b)
        }

        /// Set the energy level reported by CCA
        pub fn set_energy(&mut self, level: i16) {
            self.inner.lock().unwrap().energy = level;
        }

        pub fn set_auto_ack(&mut self, enabled: bool) {
            self.inner.lock().unwrap().auto_ack = enabled;
        }

        /// Fail every transmission while set
        pub fn set_tx_error(&mut self, fail: bool) {
            self.inner.lock().unwrap().tx_error = fail;
        }

        /// Fail every receive poll while set
        pub fn set_rx_error(&mut self, fail: bool) {
            self.inner.lock().unwrap().rx_error = fail;
        }

        /// Fail every energy sample while set
        pub fn set_cca_error(&mut self, fail: bool) {
            self.inner.lock().unwrap().cca_error = fail;
        }

        /// Queue a frame for reception
        pub fn push_rx(&mut self, data: &[u8], rssi: i16) {
            self.inner.lock().unwrap().rx.push_back((data.to_vec(), rssi));
        }

        /// Frames transmitted so far
        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.inner.lock().unwrap().sent.clone()
        }

        pub fn clear_sent(&mut self) {
            self.inner.lock().unwrap().sent.clear();
        }
    }

    impl Phy for MockPhy {
        type Error = ();

        fn transmit(&mut self, data: &[u8]) -> Result<(), ()> {
            let mut inner = self.inner.lock().unwrap();
            if inner.tx_error {
                return Err(());
            }
            inner.sent.push(data.to_vec());

            if let Some(peer) = &inner.peer {
                peer.lock().unwrap().rx.push_back((data.to_vec(), -40));
            }

            if inner.auto_ack {
                if let Ok((h, _)) = Header::decode(data) {
                    if h.frame_type != FrameType::Ack && h.ack_request {
                        let mut ack = [0u8; 8];
                        let n = Packet::ack(h.seq).encode(&mut ack);
                        inner.rx.push_back((ack[..n].to_vec(), -40));
                    }
                }
            }

            Ok(())
        }

        fn receive_poll(&mut self, buff: &mut [u8]) -> Result<Option<RxInfo>, ()> {
            let (data, rssi) = {
                let mut inner = self.inner.lock().unwrap();
                if inner.rx_error {
                    return Err(());
                }
                match inner.rx.pop_front() {
                    Some(v) => v,
                    None => return Ok(None),
                }
            };

            let len = data.len().min(buff.len());
            buff[..len].copy_from_slice(&data[..len]);

            Ok(Some(RxInfo{ len, rssi, timestamp: self.timer.ticks_us() }))
        }

        fn sample_energy(&mut self) -> Result<i16, ()> {
            let inner = self.inner.lock().unwrap();
            if inner.cca_error {
                return Err(());
            }
            Ok(inner.energy)
        }
    }
}
