//! Position keys for ordering list nodes
//!
//! Keys are 128-bit fixed-point numbers with 64 fractional bits. Nodes created
//! by the builder sit on whole numbers (1, 2, 3, ...) and key 0 is reserved as
//! the exclusive floor in front of the head. A node spliced between two others
//! takes the exact midpoint of its neighbours, so up to 64 consecutive
//! insertions at one spot fit before the list has to renumber.

use std::fmt;

/// Number of fractional bits below the whole-number part of a key
pub const FRACTION_BITS: u32 = 64;

/// Ordering token for a node in an [`ExtentList`](crate::core::list::ExtentList)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionKey(u128);

impl PositionKey {
    /// Exclusive lower bound: no node ever holds this key
    pub const FLOOR: PositionKey = PositionKey(0);

    /// Key for the node at `index` (0-based) of a freshly numbered list
    pub fn from_index(index: u64) -> Self {
        PositionKey((u128::from(index) + 1) << FRACTION_BITS)
    }

    /// Exact midpoint strictly between `lo` and `hi`
    ///
    /// Returns `None` when the keys are adjacent (or out of order) and no key
    /// fits between them.
    pub fn midpoint(lo: PositionKey, hi: PositionKey) -> Option<PositionKey> {
        let gap = hi.0.checked_sub(lo.0)?;
        if gap < 2 {
            return None;
        }
        Some(PositionKey(lo.0 + gap / 2))
    }

    /// Integer part of the key
    pub fn whole(&self) -> u64 {
        (self.0 >> FRACTION_BITS) as u64
    }

    /// True if the key sits on a whole number (no fractional bits set)
    pub fn is_whole(&self) -> bool {
        self.0 & ((1u128 << FRACTION_BITS) - 1) == 0
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fraction = self.0 as u64;
        if fraction == 0 {
            write!(f, "{}", self.whole())
        } else {
            write!(f, "{}+{:#x}/2^64", self.whole(), fraction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_keys_are_whole_and_ordered() {
        let a = PositionKey::from_index(0);
        let b = PositionKey::from_index(1);
        assert!(PositionKey::FLOOR < a);
        assert!(a < b);
        assert!(a.is_whole());
        assert_eq!(a.whole(), 1);
        assert_eq!(b.whole(), 2);
    }

    #[test]
    fn test_midpoint_is_strictly_between() {
        let lo = PositionKey::from_index(0);
        let hi = PositionKey::from_index(1);
        let mid = PositionKey::midpoint(lo, hi).unwrap();
        assert!(lo < mid && mid < hi);
        assert!(!mid.is_whole());
    }

    #[test]
    fn test_midpoint_exhausts_after_fraction_bits() {
        // Repeatedly bisecting towards the lower key runs out after 64 steps
        let lo = PositionKey::from_index(0);
        let mut hi = PositionKey::from_index(1);
        let mut splits = 0;
        while let Some(mid) = PositionKey::midpoint(lo, hi) {
            hi = mid;
            splits += 1;
        }
        assert_eq!(splits, FRACTION_BITS);
    }

    #[test]
    fn test_midpoint_rejects_reversed_bounds() {
        let lo = PositionKey::from_index(3);
        let hi = PositionKey::from_index(1);
        assert!(PositionKey::midpoint(lo, hi).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(PositionKey::from_index(4).to_string(), "5");
        let mid =
            PositionKey::midpoint(PositionKey::from_index(0), PositionKey::from_index(1)).unwrap();
        assert_eq!(mid.to_string(), "1+0x8000000000000000/2^64");
    }
}
