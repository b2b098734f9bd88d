//! Compaction policies for the extent list
//!
//! Two policies are provided:
//! - [`FragmentCompactor`]: moves units one gap at a time from the tail
//!   into the leftmost free space, splitting files as needed
//! - [`WholeExtentCompactor`]: moves each file as a unit into the leftmost
//!   gap that can hold it, highest owner first
//!
//! Each policy runs against its own freshly built list.

pub mod fragment;
pub mod whole;

pub use fragment::FragmentCompactor;
pub use whole::WholeExtentCompactor;

use crate::core::config::CompactorConfig;
use crate::core::error::Result;
use crate::core::list::ExtentList;
use crate::core::observer::Observer;
use serde::{Deserialize, Serialize};

/// Compaction policy
///
/// Defines the interface shared by both compaction strategies.
pub trait Compactor {
    /// Short policy name for logs
    fn name(&self) -> &'static str;

    /// Compact `list` in place
    fn compact(&mut self, list: &mut ExtentList) -> Result<CompactionReport>;
}

/// One applied compaction step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepEvent {
    /// A gap exactly the size of the trailing file traded places with it
    Swapped { owner: u64, size: u64 },
    /// A gap smaller than the trailing file was filled with `size` of its units
    Filled { owner: u64, size: u64 },
    /// The whole trailing file was placed at the front of a larger gap
    Inserted { owner: u64, size: u64 },
    /// A file moved left into a gap; `split` is set when the gap was larger
    Relocated { owner: u64, size: u64, split: bool },
    /// No gap to the left could hold the file
    Stayed { owner: u64, size: u64 },
}

/// Counters collected over one compaction run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionReport {
    /// Every step, including files that stayed put
    pub steps: usize,
    /// Moves that exchanged two equal-size nodes
    pub swaps: usize,
    /// Moves that had to cut a gap or a file in two
    pub splits: usize,
    /// Whole files moved by the whole-extent policy
    pub relocations: usize,
    /// Whole files left in place by the whole-extent policy
    pub skipped: usize,
}

impl CompactionReport {
    fn record(&mut self, event: &StepEvent) {
        self.steps += 1;
        match *event {
            StepEvent::Swapped { .. } => self.swaps += 1,
            StepEvent::Filled { .. } | StepEvent::Inserted { .. } => self.splits += 1,
            StepEvent::Relocated { split, .. } => {
                self.relocations += 1;
                if split {
                    self.splits += 1;
                } else {
                    self.swaps += 1;
                }
            }
            StepEvent::Stayed { .. } => self.skipped += 1,
        }
    }
}

/// Bookkeeping shared by the compactors: report, optional audit, observer
#[derive(Debug)]
struct StepLog<O> {
    observer: O,
    verify_each_step: bool,
    report: CompactionReport,
}

impl<O: Observer> StepLog<O> {
    fn new(observer: O, config: &CompactorConfig) -> Self {
        StepLog {
            observer,
            verify_each_step: config.verify_each_step,
            report: CompactionReport::default(),
        }
    }

    fn record(&mut self, event: StepEvent, list: &ExtentList) -> Result<()> {
        self.report.record(&event);
        if self.verify_each_step {
            list.verify()?;
        }
        self.observer.on_step(&event, list);
        Ok(())
    }

    fn finish(&mut self) -> CompactionReport {
        std::mem::take(&mut self.report)
    }
}
