//! Disk map decoding
//!
//! A disk map is a string of decimal digits giving alternating run lengths:
//! file 0, gap, file 1, gap, ... A zero-length run keeps the alternation but
//! produces no node, and a zero-length file does not consume an owner id.

use crate::core::error::{CompactError, Result};
use crate::core::extent::Extent;
use crate::core::list::ExtentList;
use tracing::debug;

/// Decode a disk map into a fresh [`ExtentList`]
///
/// Surrounding whitespace is ignored; any other non-digit character is
/// rejected with [`CompactError::MalformedInput`].
pub fn build(input: &str) -> Result<ExtentList> {
    let leading = input.len() - input.trim_start().len();
    let digits = input.trim();

    let mut list = ExtentList::with_capacity(digits.len());
    let mut next_owner = 0u64;
    let mut pending_free = 0u64;

    for (index, c) in digits.char_indices() {
        let run = c.to_digit(10).ok_or_else(|| CompactError::MalformedInput {
            input: input.to_string(),
            offset: leading + index,
            found: c,
        })? as u64;

        // Runs alternate by position, so the parity of the byte index decides
        // the kind (every accepted character is a single ASCII byte)
        if index % 2 == 0 {
            if run == 0 {
                continue;
            }
            flush_free(&mut list, &mut pending_free)?;
            list.push_back(Extent::occupied(next_owner, run))?;
            next_owner += 1;
        } else {
            // Gaps separated only by zero-length files end up adjacent
            pending_free += run;
        }
    }
    flush_free(&mut list, &mut pending_free)?;

    debug!(
        "Decoded disk map of {} runs into {} extents ({} files)",
        digits.len(),
        list.len(),
        next_owner
    );
    Ok(list)
}

fn flush_free(list: &mut ExtentList, pending: &mut u64) -> Result<()> {
    if *pending > 0 {
        list.push_back(Extent::free(*pending))?;
        *pending = 0;
    }
    Ok(())
}
