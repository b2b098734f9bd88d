//! # blockpack - Extent-Based Block Storage Compactor
//!
//! `blockpack` models a disk as an ordered list of extents (runs of units that
//! are either owned by one file or free) and defragments it under two policies:
//!
//! - **Fragmenting**: units move one at a time from the end of the disk into
//!   the first free units, splitting files, until the disk is packed left
//! - **Whole-extent**: each file, highest owner first, moves as a unit into the
//!   leftmost gap in front of it that can hold it
//!
//! Either result is summarised by a positional checksum.
//!
//! ## Quick Start
//!
//! ```rust
//! use blockpack::{solve, CompactorConfig, Result};
//!
//! # fn main() -> Result<()> {
//! let sums = solve("2333133121414131402", &CompactorConfig::default())?;
//! assert_eq!(sums.fragmented, 1928);
//! assert_eq!(sums.whole_extent, 2858);
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving a compactor directly
//!
//! ```rust
//! use blockpack::{build, checksum, Compactor, CompactorConfig, WholeExtentCompactor, Result};
//!
//! # fn main() -> Result<()> {
//! let mut list = build("12345")?;
//! let config = CompactorConfig::default().verified();
//! let report = WholeExtentCompactor::new(&config).compact(&mut list)?;
//! assert_eq!(report.relocations, 0);
//! assert_eq!(checksum(&list), 132);
//! # Ok(())
//! # }
//! ```

pub mod core;

pub use crate::core::{
    builder::build,
    checksum::{checksum, expand, render},
    compactor::{
        CompactionReport, Compactor, FragmentCompactor, StepEvent, WholeExtentCompactor,
    },
    config::CompactorConfig,
    error::{CompactError, Result},
    extent::Extent,
    key::PositionKey,
    list::{ExtentList, NodeHandle},
    observer::{NoopObserver, Observer, RecordingObserver, TracingObserver},
};

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Checksums of one disk map under both compaction policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksums {
    /// Checksum after fragmenting compaction
    pub fragmented: u128,
    /// Checksum after whole-extent compaction
    pub whole_extent: u128,
}

impl fmt::Display for Checksums {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Result 1: {}", self.fragmented)?;
        write!(f, "Result 2: {}", self.whole_extent)
    }
}

/// Compact one disk map under both policies
///
/// Each policy runs against its own freshly decoded list.
pub fn solve(input: &str, config: &CompactorConfig) -> Result<Checksums> {
    info!("Compacting disk map of {} runs", input.trim().len());

    let fragmented = compact_input(
        input,
        FragmentCompactor::with_observer(tracing_observer(config), config),
    )?;
    let whole_extent = compact_input(
        input,
        WholeExtentCompactor::with_observer(tracing_observer(config), config),
    )?;

    let sums = Checksums {
        fragmented,
        whole_extent,
    };
    info!(
        "Checksums: fragmented={}, whole_extent={}",
        sums.fragmented, sums.whole_extent
    );
    Ok(sums)
}

/// Decode `input`, run `compactor` over it and return the checksum
pub fn compact_input<C: Compactor>(input: &str, mut compactor: C) -> Result<u128> {
    let mut list = build(input)?;
    let report = compactor.compact(&mut list)?;
    let sum = checksum(&list);
    debug!(
        "{} compaction: checksum {} after {} steps ({} relocations, {} stayed)",
        compactor.name(),
        sum,
        report.steps,
        report.relocations,
        report.skipped
    );
    Ok(sum)
}

fn tracing_observer(config: &CompactorConfig) -> TracingObserver {
    TracingObserver::new(config.trace_layout, config.free_glyph)
}
