//! MAC Timer API
//
// https://github.com/rust-iot/csma-mac
// Copyright 2021 Ryan Kurte

/// Timer trait provides access to a monotonic microsecond clock
/// to assist with protocol implementations.
///
/// The counter is free-running and wraps at `u32::MAX`, all deadline
/// checks must use [`RolloverCmp`] rather than plain comparisons.
pub trait Timer {
    /// Returns the number of microsecond ticks since some unknown epoc
    fn ticks_us(&self) -> u32;
}

/// Comparison of free-running counter samples that tolerates wraparound.
///
/// Results are correct as long as the true distance between the two
/// samples is less than half the counter range.
///
/// This is the signed wrapping difference, intentionally not the rule of
/// comparing the top bits of both samples: that rule gets distances
/// crossing the wrap wrong, e.g. it reports `5` as earlier than `0xFFFF_FFF0`.
pub trait RolloverCmp: Copy {
    /// Returns true if `self` is strictly later than `other`
    fn gt_rollover(self, other: Self) -> bool;

    /// Returns true if `self` is later than or equal to `other`
    fn ge_rollover(self, other: Self) -> bool;
}

macro_rules! impl_rollover_cmp {
    ($($u:ty => $i:ty),*) => {
        $(
            impl RolloverCmp for $u {
                fn gt_rollover(self, other: Self) -> bool {
                    (self.wrapping_sub(other) as $i) > 0
                }

                fn ge_rollover(self, other: Self) -> bool {
                    (self.wrapping_sub(other) as $i) >= 0
                }
            }
        )*
    };
}

impl_rollover_cmp!(u8 => i8, u16 => i16, u32 => i32);

#[cfg(any(test, feature="mocks"))]
pub mod mock {
    use std::sync::{Arc, Mutex};

    /// Mock timer implementation to assist with testing
    #[derive(Clone, Debug)]
    pub struct MockTimer (Arc<Mutex<u32>>);

    impl MockTimer {
        pub fn new() -> Self {
            Self(Arc::new(Mutex::new(0)))
        }

        pub fn set_us(&mut self, val: u32) {
            *self.0.lock().unwrap() = val;
        }

        pub fn inc_us(&mut self, by: u32) {
            let mut v  = self.0.lock().unwrap();
            *v = v.wrapping_add(by);
        }

        pub fn val(&self) -> u32 {
            *self.0.lock().unwrap()
        }
    }

    impl super::Timer for MockTimer {
        fn ticks_us(&self) -> u32 {
            *self.0.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn u8_next_is_later_across_wrap() {
        for a in 0..=u8::MAX {
            let b = a.wrapping_add(1);
            assert!(b.gt_rollover(a), "{} should be later than {}", b, a);
            assert!(!a.gt_rollover(b));
            assert!(!a.gt_rollover(a));
            assert!(a.ge_rollover(a));
        }
    }

    #[test]
    fn u16_next_is_later_across_wrap() {
        for &a in &[0u16, 1, 0x7FFF, 0x8000, 0xFFFE, u16::MAX] {
            let b = a.wrapping_add(1);
            assert!(b.gt_rollover(a));
            assert!(b.ge_rollover(a));
            assert!(!a.gt_rollover(a));
            assert!(a.ge_rollover(a));
            assert!(!a.ge_rollover(b));
        }
    }

    #[test]
    fn u32_deadline_across_wrap() {
        let deadline = u32::MAX - 100;

        assert!(!(u32::MAX - 200).gt_rollover(deadline));
        assert!(!deadline.gt_rollover(deadline));
        assert!((u32::MAX - 99).gt_rollover(deadline));
        // Counter wrapped past the deadline
        assert!(50u32.gt_rollover(deadline));
        assert!(5u32.gt_rollover(0xFFFF_FFF0));
        assert!(!0xFFFF_FFF0u32.gt_rollover(5));
        assert!(0x7FFF_FFFFu32.gt_rollover(0x7FFF_FFFE));
        assert!(0x8000_0000u32.gt_rollover(0x7FFF_FFFF));
    }

    #[test]
    fn mock_timer_wraps() {
        let mut t = mock::MockTimer::new();
        t.set_us(u32::MAX);
        t.inc_us(2);
        assert_eq!(t.ticks_us(), 1);
    }
}
