
/// Node addressing
#[derive(Clone, PartialEq, Debug)]
pub struct AddressConfig {
    pub pan_id: u16,

    pub short_address: u16,
}

impl AddressConfig {
    pub fn new(pan_id: u16, short_address: u16) -> Self {
        Self{
            pan_id,
            short_address,
        }
    }
}

/// Configuration for the CSMA/CA engine
#[derive(Clone, PartialEq, Debug)]
pub struct CsmaConfig {
    /// Duration of one backoff slot in microseconds
    pub backoff_slot_us: u32,

    /// Minimum backoff exponent
    pub min_be: u8,
    /// Maximum backoff exponent
    pub max_be: u8,

    /// Number of busy CCAs tolerated before channel access failure
    pub max_csma_backoffs: u8,

    /// Number of retransmissions for unacknowledged frames
    pub max_frame_retries: i8,

    /// Time to wait for an ACK after transmission in microseconds
    pub ack_wait_us: u32,

    /// Delay between frame reception and ACK transmission in microseconds
    pub ack_delay_us: u32,

    /// Idle gap enforced after each completed transmission in microseconds
    pub interframe_us: u32,

    /// Energy level at or above which the channel is considered busy
    pub cca_busy_threshold: i16,
}

impl Default for CsmaConfig {
    fn default() -> Self {
        Self {
            backoff_slot_us: 640,
            min_be: 3,
            max_be: 8,
            max_csma_backoffs: 4,
            max_frame_retries: 3,
            ack_wait_us: 10_000,
            ack_delay_us: 640,
            interframe_us: 2_000,
            cca_busy_threshold: 135,
        }
    }
}

/// Constant bit-rate test traffic
#[derive(Clone, PartialEq, Debug)]
pub struct CbrConfig {
    /// Transmission period in microseconds
    pub period_us: u32,
    /// Random payload length in bytes
    pub length: usize,
    pub destination: u16,
    pub ack_request: bool,
}

impl Default for CbrConfig {
    fn default() -> Self {
        Self {
            period_us: 1_000_000,
            length: 16,
            destination: crate::BROADCAST_ADDRESS,
            ack_request: false,
        }
    }
}

/// Complete MAC configuration
#[derive(Clone, PartialEq, Debug)]
pub struct Config {
    pub address: AddressConfig,

    pub csma: CsmaConfig,

    /// Enable periodic test traffic
    pub cbr: Option<CbrConfig>,
}

impl Config {
    pub fn new(pan_id: u16, short_address: u16) -> Self {
        Self {
            address: AddressConfig::new(pan_id, short_address),
            csma: CsmaConfig::default(),
            cbr: None,
        }
    }
}
