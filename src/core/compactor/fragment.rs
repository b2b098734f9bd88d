//! Unit-granular compaction
//!
//! Treats the disk as a tape: units are taken from the last file and written
//! into the first free units until no gap precedes any file. Files are split
//! freely, so the result is fully packed to the left.
//!
//! Two cursors walk inward, `head` from the front looking for gaps and `tail`
//! from the back looking for files. With a gap of `F` units at `head` and a
//! file of `S` units at `tail`:
//!
//! ```text
//! F == S   swap the two nodes' contents, both cursors step inward
//! F <  S   the gap becomes F units of the file, the file shrinks by F
//! F >  S   the file is inserted in front of the gap, the gap shrinks by S,
//!          the tail node is dropped
//! ```

use super::{CompactionReport, Compactor, StepEvent, StepLog};
use crate::core::config::CompactorConfig;
use crate::core::error::Result;
use crate::core::extent::Extent;
use crate::core::list::ExtentList;
use crate::core::observer::{NoopObserver, Observer};
use std::cmp::Ordering;
use tracing::debug;

/// Compactor that packs units left, splitting files as needed
#[derive(Debug)]
pub struct FragmentCompactor<O = NoopObserver> {
    log: StepLog<O>,
}

impl FragmentCompactor<NoopObserver> {
    pub fn new(config: &CompactorConfig) -> Self {
        Self::with_observer(NoopObserver, config)
    }
}

impl<O: Observer> FragmentCompactor<O> {
    pub fn with_observer(observer: O, config: &CompactorConfig) -> Self {
        FragmentCompactor {
            log: StepLog::new(observer, config),
        }
    }

    pub fn observer(&self) -> &O {
        &self.log.observer
    }

    pub fn into_observer(self) -> O {
        self.log.observer
    }
}

impl<O: Observer> Compactor for FragmentCompactor<O> {
    fn name(&self) -> &'static str {
        "fragment"
    }

    fn compact(&mut self, list: &mut ExtentList) -> Result<CompactionReport> {
        debug!("Fragment compaction over {} extents", list.len());
        let mut head = list.head();
        let mut tail = list.tail();

        while let (Some(h), Some(t)) = (head, tail) {
            // Cursors met or crossed
            if !list.is_before(h, t)? {
                break;
            }
            let gap = list.extent(h)?;
            if gap.is_occupied() {
                head = list.next(h)?;
                continue;
            }
            let (owner, size) = match list.extent(t)? {
                Extent::Free { .. } => {
                    tail = list.prev(t)?;
                    continue;
                }
                Extent::Occupied { owner, size } => (owner, size),
            };

            let free = gap.size();
            let event = match free.cmp(&size) {
                Ordering::Equal => {
                    list.swap_contents(h, t)?;
                    head = list.next(h)?;
                    let vacated = list.coalesce_around(t)?;
                    tail = list.prev(vacated)?;
                    StepEvent::Swapped { owner, size }
                }
                Ordering::Less => {
                    list.set_extent(h, Extent::occupied(owner, free))?;
                    list.set_size(t, size - free)?;
                    head = list.next(h)?;
                    StepEvent::Filled { owner, size: free }
                }
                Ordering::Greater => {
                    list.insert_before(h, Extent::occupied(owner, size))?;
                    list.set_size(h, free - size)?;
                    let prev = list.prev(t)?;
                    list.remove(t)?;
                    if let Some(prev) = prev {
                        list.merge_adjacent_free(prev)?;
                    }
                    tail = prev;
                    StepEvent::Inserted { owner, size }
                }
            };
            self.log.record(event, list)?;
        }

        let report = self.log.finish();
        debug!(
            "Fragment compaction done: {} steps, {} swaps, {} splits",
            report.steps, report.swaps, report.splits
        );
        Ok(report)
    }
}
