//! Positional checksum and layout diagnostics

use crate::core::extent::Extent;
use crate::core::list::ExtentList;

/// Position-weighted sum of owner identifiers over every occupied unit
///
/// Positions start at 0 and advance by one per unit, free or not. The sum is
/// kept in `u128`: a few million runs of 9s already exceed `u64::MAX`.
pub fn checksum(list: &ExtentList) -> u128 {
    let mut position = 0u128;
    let mut total = 0u128;
    for (_, extent) in list.iter() {
        let size = u128::from(extent.size());
        if let Extent::Occupied { owner, .. } = extent {
            // sum of position..position + size
            let span = size * position + size * (size - 1) / 2;
            total += u128::from(owner) * span;
        }
        position += size;
    }
    total
}

/// Per-unit view of the disk: `Some(owner)` or `None` for free units
pub fn expand(list: &ExtentList) -> Vec<Option<u64>> {
    let mut units = Vec::with_capacity(list.total_units() as usize);
    for (_, extent) in list.iter() {
        let cell = extent.owner();
        units.extend(std::iter::repeat(cell).take(extent.size() as usize));
    }
    units
}

/// Render the layout as `0_|..|1__|` groups, one per extent
pub fn render(list: &ExtentList, free_glyph: char) -> String {
    let mut out = String::new();
    for (_, extent) in list.iter() {
        match extent {
            Extent::Occupied { owner, size } => {
                out.push_str(&owner.to_string());
                out.extend(std::iter::repeat('_').take(size as usize - 1));
            }
            Extent::Free { size } => {
                out.extend(std::iter::repeat(free_glyph).take(size as usize));
            }
        }
        out.push('|');
    }
    out
}
