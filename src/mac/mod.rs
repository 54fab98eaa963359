//! Medium Access Control (MAC) layer module.
//! Contains the upward MAC trait and the CSMA/CA implementation.

pub mod config;
pub mod core;
pub mod csma;
pub mod cbr;

use self::core::Received;
use self::csma::DataConfirm;

/// Generic MAC trait
pub trait Mac {
    type Error;

    /// Reset neighbor and engine state to idle
    fn init(&mut self);

    /// Queue a payload for acknowledged transmission to `destination`
    fn send(&mut self, destination: u16, data: &[u8]) -> Result<(), Self::Error>;

    /// Take the most recently received payload
    fn receive(&mut self) -> Option<Received>;

    /// Check whether a frame is queued or in flight
    fn busy(&self) -> bool;

    /// Update the MAC state, returning the confirm of a completed transmission
    fn tick(&mut self) -> Result<Option<DataConfirm>, Self::Error>;
}
