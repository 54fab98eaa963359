//! Neighbor table
//!
//! Fixed-capacity directory of recently heard peers, with the last
//! sequence number seen from each peer per frame class for duplicate
//! detection. Entries are never evicted, a full table rejects new peers.

use log::{debug, trace};

use crate::NEIGHBOR_TABLE_LEN;

/// Last received sequence numbers for a neighbor, `None` until a frame
/// of that class has been seen.
///
/// There is deliberately no sentinel value (such as 255) for "nothing seen",
/// so the first frame from a new neighbor is always delivered, whatever its
/// sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SeqNumbers {
    pub beacon: Option<u8>,
    pub data: Option<u8>,
    pub command: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Neighbor {
    pub address: u16,
    /// Microsecond timestamp of the last frame heard
    pub last_update: u32,
    pub last_rssi: i16,
    pub seq: SeqNumbers,
}

/// Result of a neighbor insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Insert {
    /// New neighbor stored at the provided index
    Inserted(usize),
    /// Address already tracked, with the number of slots holding it
    AlreadyPresent(usize),
    /// No free slot for a new neighbor
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NeighborTable<const N: usize = NEIGHBOR_TABLE_LEN> {
    slots: [Option<Neighbor>; N],
    count: usize,
}

impl <const N: usize> Default for NeighborTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl <const N: usize> NeighborTable<N> {
    pub fn new() -> Self {
        Self {
            slots: [None; N],
            count: 0,
        }
    }

    /// Empty every slot
    pub fn reset(&mut self) {
        self.slots = [None; N];
        self.count = 0;
    }

    /// Find the index of the first slot holding `address`
    pub fn lookup(&self, address: u16) -> Option<usize> {
        self.slots.iter().position(|s| matches!(s, Some(n) if n.address == address))
    }

    pub fn get(&self, address: u16) -> Option<&Neighbor> {
        self.lookup(address).and_then(|i| self.slots[i].as_ref())
    }

    pub fn get_mut(&mut self, address: u16) -> Option<&mut Neighbor> {
        match self.lookup(address) {
            Some(i) => self.slots[i].as_mut(),
            None => None,
        }
    }

    /// Add a neighbor if it is not already present.
    ///
    /// Re-inserting a tracked address leaves the table untouched.
    pub fn insert(&mut self, address: u16, timestamp: u32, rssi: i16) -> Insert {
        let present = self.slots.iter()
            .filter(|s| matches!(s, Some(n) if n.address == address))
            .count();
        if present != 0 {
            return Insert::AlreadyPresent(present);
        }

        let index = match self.slots.iter().position(|s| s.is_none()) {
            Some(i) => i,
            None => return Insert::Full,
        };

        self.slots[index] = Some(Neighbor {
            address,
            last_update: timestamp,
            last_rssi: rssi,
            seq: SeqNumbers::default(),
        });
        self.count += 1;

        debug!("Neighbor 0x{:04x} added at slot {}", address, index);

        Insert::Inserted(index)
    }

    /// Refresh the timestamp and RSSI of a tracked neighbor,
    /// returns false if the address is not present
    pub fn update(&mut self, address: u16, timestamp: u32, rssi: i16) -> bool {
        match self.get_mut(address) {
            Some(n) => {
                n.last_update = timestamp;
                n.last_rssi = rssi;
                true
            },
            None => false,
        }
    }

    /// Number of tracked neighbors
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == N
    }

    pub fn iter(&self) -> impl Iterator<Item=&Neighbor> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    /// Copy tracked addresses into `list`, returning the number written
    pub fn addresses(&self, list: &mut [u16]) -> usize {
        let mut n = 0;
        for (dst, nbr) in list.iter_mut().zip(self.iter()) {
            *dst = nbr.address;
            n += 1;
        }
        n
    }

    /// Dump the table to the debug log
    pub fn log_table(&self) {
        debug!("Neighbor table: {} entries", self.count);

        for n in self.iter() {
            trace!("0x{:04x}\t{:010}\t{}", n.address, n.last_update, n.last_rssi);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut t = NeighborTable::<4>::new();

        assert_eq!(t.lookup(0x10), None);
        assert_eq!(t.insert(0x10, 100, -40), Insert::Inserted(0));
        assert_eq!(t.insert(0x20, 200, -50), Insert::Inserted(1));

        assert_eq!(t.lookup(0x20), Some(1));
        assert_eq!(t.len(), 2);

        let n = t.get(0x10).unwrap();
        assert_eq!(n.last_update, 100);
        assert_eq!(n.last_rssi, -40);
        assert_eq!(n.seq, SeqNumbers::default());
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let mut t = NeighborTable::<4>::new();

        t.insert(0x10, 100, -40);
        assert_eq!(t.insert(0x10, 500, -10), Insert::AlreadyPresent(1));

        assert_eq!(t.len(), 1);
        assert_eq!(t.iter().count(), 1);
        assert_eq!(t.get(0x10).unwrap().last_update, 100);
    }

    #[test]
    fn full_table_rejects_new_address() {
        let mut t = NeighborTable::<NEIGHBOR_TABLE_LEN>::new();

        for a in 0..NEIGHBOR_TABLE_LEN as u16 {
            assert_eq!(t.insert(a, 0, 0), Insert::Inserted(a as usize));
        }
        assert!(t.is_full());

        assert_eq!(t.insert(0x100, 0, 0), Insert::Full);
        assert_eq!(t.len(), NEIGHBOR_TABLE_LEN);

        // Known addresses are still reported as present
        assert_eq!(t.insert(3, 0, 0), Insert::AlreadyPresent(1));
    }

    #[test]
    fn update_existing_only() {
        let mut t = NeighborTable::<4>::new();
        t.insert(0x10, 100, -40);

        assert!(t.update(0x10, 300, -20));
        assert!(!t.update(0x11, 300, -20));

        let n = t.get(0x10).unwrap();
        assert_eq!((n.last_update, n.last_rssi), (300, -20));
    }

    #[test]
    fn broadcast_address_is_not_an_empty_slot() {
        let mut t = NeighborTable::<2>::new();

        assert_eq!(t.lookup(0xFFFF), None);
        t.insert(0xFFFF, 0, 0);
        assert_eq!(t.lookup(0xFFFF), Some(0));
        assert_eq!(t.insert(0x01, 0, 0), Insert::Inserted(1));
    }

    #[test]
    fn reset_clears_entries() {
        let mut t = NeighborTable::<4>::new();
        t.insert(0x10, 100, -40);
        t.get_mut(0x10).unwrap().seq.data = Some(4);

        t.reset();

        assert!(t.is_empty());
        assert_eq!(t.lookup(0x10), None);
        assert_eq!(t.insert(0x10, 0, 0), Insert::Inserted(0));
        assert_eq!(t.get(0x10).unwrap().seq.data, None);
    }

    #[test]
    fn address_list() {
        let mut t = NeighborTable::<4>::new();
        t.insert(0x10, 0, 0);
        t.insert(0x20, 0, 0);

        let mut list = [0u16; 4];
        assert_eq!(t.addresses(&mut list), 2);
        assert_eq!(&list[..2], &[0x10, 0x20]);
    }
}
