//! CSMA MAC crate prelude
//
// https://github.com/rust-iot/csma-mac
// Copyright 2021 Ryan Kurte

pub use crate::{BROADCAST_ADDRESS, MAX_FRAME_LEN};

pub use crate::mac::Mac;
pub use crate::mac::core::{Core as CsmaMac, Received, RxEvent, MacStats, PendingAck};
pub use crate::mac::csma::{DataConfirm, CsmaState};
pub use crate::mac::config::{Config as MacConfig, AddressConfig, CsmaConfig, CbrConfig};

pub use crate::error::{MacError, DecodeError};
pub use crate::timer::{Timer as MacTimer, RolloverCmp};
pub use crate::phy::{Phy, RadioPhy, RxInfo};

pub use crate::neighbors::{NeighborTable, Neighbor};
