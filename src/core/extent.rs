//! Extents: the atomic unit of the simulated disk
//!
//! An extent is a contiguous run of storage units that either belongs to one
//! owner (a file) or is free. Sizes are counted in units, never bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous run of units, occupied by one owner or free
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Extent {
    /// Units belonging to the file identified by `owner`
    Occupied { owner: u64, size: u64 },
    /// Unused units
    Free { size: u64 },
}

impl Extent {
    pub fn occupied(owner: u64, size: u64) -> Self {
        Extent::Occupied { owner, size }
    }

    pub fn free(size: u64) -> Self {
        Extent::Free { size }
    }

    /// Number of units covered by this extent
    pub fn size(&self) -> u64 {
        match *self {
            Extent::Occupied { size, .. } | Extent::Free { size } => size,
        }
    }

    /// Owner identifier, or `None` for free space
    pub fn owner(&self) -> Option<u64> {
        match *self {
            Extent::Occupied { owner, .. } => Some(owner),
            Extent::Free { .. } => None,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Extent::Free { .. })
    }

    pub fn is_occupied(&self) -> bool {
        !self.is_free()
    }

    /// Same kind and owner, different size
    pub fn with_size(&self, size: u64) -> Self {
        match *self {
            Extent::Occupied { owner, .. } => Extent::Occupied { owner, size },
            Extent::Free { .. } => Extent::Free { size },
        }
    }

    /// Check if this extent can be coalesced with `other` into one free run
    pub fn can_coalesce(&self, other: &Extent) -> bool {
        self.is_free() && other.is_free()
    }

    /// Coalesce two free extents
    pub fn coalesce(&self, other: &Extent) -> Option<Extent> {
        if !self.can_coalesce(other) {
            return None;
        }
        Some(Extent::free(self.size() + other.size()))
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extent::Occupied { owner, size } => write!(f, "file {owner} x{size}"),
            Extent::Free { size } => write!(f, "free x{size}"),
        }
    }
}
