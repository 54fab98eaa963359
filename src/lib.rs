//! CSMA/CA MAC for low-power sensor nodes
//
// https://github.com/rust-iot/csma-mac
// Copyright 2021 Ryan Kurte

#![no_std]

#[cfg(any(test, feature="std"))]
extern crate std;

pub mod codec;

pub mod timer;

pub mod packet;

pub mod neighbors;

pub mod phy;

pub mod mac;

pub mod error;

pub mod prelude;


/// Short address accepted by every node
pub const BROADCAST_ADDRESS: u16 = 0xFFFF;

/// Maximum encoded frame length in bytes
pub const MAX_FRAME_LEN: usize = 64;

/// Default neighbor table capacity
pub const NEIGHBOR_TABLE_LEN: usize = 16;
