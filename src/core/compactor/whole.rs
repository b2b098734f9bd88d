//! Whole-extent compaction (first fit, highest owner first)
//!
//! Each file is visited once, in descending owner order, and moved as a unit
//! into the leftmost gap that lies before it and can hold it. A file that
//! finds no such gap stays where it is and is not reconsidered, even if space
//! opens up in front of it later in the pass.

use super::{CompactionReport, Compactor, StepEvent, StepLog};
use crate::core::config::CompactorConfig;
use crate::core::error::{CompactError, Result};
use crate::core::extent::Extent;
use crate::core::key::PositionKey;
use crate::core::list::{ExtentList, NodeHandle};
use crate::core::observer::{NoopObserver, Observer};
use tracing::debug;

/// Compactor that relocates whole files into the leftmost fitting gap
#[derive(Debug)]
pub struct WholeExtentCompactor<O = NoopObserver> {
    log: StepLog<O>,
}

impl WholeExtentCompactor<NoopObserver> {
    pub fn new(config: &CompactorConfig) -> Self {
        Self::with_observer(NoopObserver, config)
    }
}

impl<O: Observer> WholeExtentCompactor<O> {
    pub fn with_observer(observer: O, config: &CompactorConfig) -> Self {
        WholeExtentCompactor {
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

impl<O: Observer> Compactor for WholeExtentCompactor<O> {
    fn name(&self) -> &'static str {
        "whole-extent"
    }

    fn compact(&mut self, list: &mut ExtentList) -> Result<CompactionReport> {
        debug!("Whole-extent compaction over {} extents", list.len());

        // Moves only touch gaps and the file being moved, so handles of files
        // still waiting in this queue keep pointing at their files
        let queue = visiting_order(list)?;
        // Leftmost gap; only advances once that gap is used up entirely
        let mut first_gap = next_gap(list, list.head())?;

        for file in queue {
            let extent = list.extent(file)?;
            let Extent::Occupied { owner, size } = extent else {
                return Err(CompactError::invariant(format!(
                    "queued node {file} no longer holds a file"
                )));
            };

            let Some(gap) = find_fit(list, first_gap, file, size)? else {
                self.log.record(StepEvent::Stayed { owner, size }, list)?;
                continue;
            };

            let room = list.extent(gap)?.size();
            if room < size {
                return Err(CompactError::invariant(format!(
                    "gap {gap} of {room} units cannot hold {extent}"
                )));
            }
            let split = room > size;
            if split {
                list.insert_before(gap, extent)?;
                list.set_size(gap, room - size)?;
                list.set_extent(file, Extent::free(size))?;
            } else {
                list.swap_contents(gap, file)?;
            }
            list.coalesce_around(file)?;

            if !split && first_gap == Some(gap) {
                first_gap = next_gap(list, list.next(gap)?)?;
            }
            self.log
                .record(StepEvent::Relocated { owner, size, split }, list)?;
        }

        let report = self.log.finish();
        debug!(
            "Whole-extent compaction done: {} relocated, {} stayed",
            report.relocations, report.skipped
        );
        Ok(report)
    }
}

/// Files ordered by owner descending, right-most first among equal owners
fn visiting_order(list: &ExtentList) -> Result<Vec<NodeHandle>> {
    let mut files: Vec<(u64, PositionKey, NodeHandle)> = Vec::new();
    for (handle, extent) in list.iter() {
        if let Some(owner) = extent.owner() {
            files.push((owner, list.key(handle)?, handle));
        }
    }
    files.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    Ok(files.into_iter().map(|(_, _, handle)| handle).collect())
}

/// First free node at or after `from`
fn next_gap(list: &ExtentList, from: Option<NodeHandle>) -> Result<Option<NodeHandle>> {
    let mut cursor = from;
    while let Some(handle) = cursor {
        if list.extent(handle)?.is_free() {
            return Ok(Some(handle));
        }
        cursor = list.next(handle)?;
    }
    Ok(None)
}

/// Leftmost gap of at least `size` units strictly before `file`
fn find_fit(
    list: &ExtentList,
    from: Option<NodeHandle>,
    file: NodeHandle,
    size: u64,
) -> Result<Option<NodeHandle>> {
    let mut cursor = from;
    while let Some(handle) = cursor {
        if !list.is_before(handle, file)? {
            return Ok(None);
        }
        let extent = list.extent(handle)?;
        if extent.is_free() && extent.size() >= size {
            return Ok(Some(handle));
        }
        cursor = list.next(handle)?;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::build;
    use crate::core::checksum::{checksum, render};
    use crate::core::observer::RecordingObserver;

    fn compact_list(list: &mut ExtentList) -> CompactionReport {
        let config = CompactorConfig::default().verified();
        WholeExtentCompactor::new(&config).compact(list).unwrap()
    }

    #[test]
    fn test_small_map_by_hand() {
        // 0..111....22222: neither file finds a gap to its left big enough
        let mut list = build("12345").unwrap();
        let report = compact_list(&mut list);
        assert_eq!(render(&list, '.'), "0|..|1__|....|2____|");
        assert_eq!(report.relocations, 0);
        assert_eq!(report.skipped, 3);
        assert_eq!(checksum(&list), 132);
    }

    #[test]
    fn test_reference_map() {
        let mut list = build("2333133121414131402").unwrap();
        let report = compact_list(&mut list);
        assert_eq!(checksum(&list), 2858);
        assert_eq!(report.relocations, 4);
        assert_eq!(
            render(&list, '.'),
            "0_|9_|2|1__|7__|.|4_|.|3__|....|5___|.|6___|.....|8___|..|"
        );
    }

    #[test]
    fn test_split_gap_at_head_boundary() {
        // 0...11 -> 011..., the gap keeps its tail end and merges with the hole
        let mut list = build("132").unwrap();
        let report = compact_list(&mut list);
        assert_eq!(render(&list, '.'), "0|1_|...|");
        assert_eq!(report.splits, 1);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_exact_fit_swaps() {
        // 0..11 -> 011..
        let mut list = build("122").unwrap();
        let report = compact_list(&mut list);
        assert_eq!(render(&list, '.'), "0|1_|..|");
        assert_eq!(report.swaps, 1);
        assert_eq!(report.splits, 0);
    }

    #[test]
    fn test_file_never_moves_right() {
        // 0.11...2: file 2 goes into the single-unit gap, file 1 has no gap to its left that fits
        let mut list = build("11231").unwrap();
        compact_list(&mut list);
        assert_eq!(render(&list, '.'), "0|2|1_|....|");
    }

    #[test]
    fn test_skipped_file_is_not_revisited() {
        // 0.1.22: file 2 stays, then file 1 moves left and opens a 2-unit gap
        // in front of file 2, which is not looked at again
        let mut list = build("11112").unwrap();
        let report = compact_list(&mut list);
        assert_eq!(render(&list, '.'), "0|1|..|2_|");
        assert_eq!(report.relocations, 1);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_single_extent_is_identity() {
        let mut list = build("4").unwrap();
        let report = compact_list(&mut list);
        assert_eq!(list.extents(), vec![Extent::occupied(0, 4)]);
        assert_eq!(report.relocations, 0);
        assert_eq!(checksum(&list), 0);
    }

    #[test]
    fn test_visiting_order_descending() {
        let mut list = build("2333133121414131402").unwrap();
        let mut compactor = WholeExtentCompactor::with_observer(
            RecordingObserver::new(),
            &CompactorConfig::default(),
        );
        compactor.compact(&mut list).unwrap();

        let owners: Vec<u64> = compactor
            .observer()
            .events
            .iter()
            .map(|event| match *event {
                StepEvent::Relocated { owner, .. } | StepEvent::Stayed { owner, .. } => owner,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(owners, (0..10).rev().collect::<Vec<u64>>());
    }

    #[test]
    fn test_lower_bound_advances_past_filled_gap() {
        // 0.1.2.33: 3 fits nowhere, 2 uses up the first gap, after which the
        // next gap lies past 1
        let mut list = build("1111112").unwrap();
        let report = compact_list(&mut list);
        assert_eq!(report.relocations, 1);
        assert_eq!(report.skipped, 3);
        assert_eq!(render(&list, '.'), "0|2|1|...|3_|");
    }
}
