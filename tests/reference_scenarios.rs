//! Known disk maps traced end to end
//!
//! Covers the published example, hand-traceable small maps and the
//! single-extent edge case for both policies.

use blockpack::{
    build, checksum, render, solve, CompactError, Compactor, CompactorConfig, Extent,
    FragmentCompactor, RecordingObserver, StepEvent, WholeExtentCompactor,
};

const REFERENCE: &str = "2333133121414131402";

fn verified() -> CompactorConfig {
    CompactorConfig::default().verified()
}

#[test]
fn test_reference_checksums() {
    let sums = solve(REFERENCE, &verified()).unwrap();
    assert_eq!(sums.fragmented, 1928);
    assert_eq!(sums.whole_extent, 2858);
}

#[test]
fn test_reference_fragment_layout() {
    let mut list = build(REFERENCE).unwrap();
    FragmentCompactor::new(&verified()).compact(&mut list).unwrap();

    let packed: String = blockpack::expand(&list)
        .iter()
        .map(|cell| match cell {
            Some(owner) => char::from_digit(*owner as u32, 10).unwrap(),
            None => '.',
        })
        .collect();
    assert!(packed.starts_with("0099811188827773336446555566"));
    assert!(packed.trim_end_matches('.').chars().all(|c| c != '.'));
}

#[test]
fn test_small_map_fragment_trace() {
    // 0..111....22222
    let mut list = build("12345").unwrap();
    let mut compactor = FragmentCompactor::with_observer(RecordingObserver::new(), &verified());
    compactor.compact(&mut list).unwrap();

    // first the 2-unit gap takes two units of file 2, then the 4-unit gap
    // takes the remaining three and keeps one free unit at the end
    assert_eq!(
        compactor.observer().events,
        vec![
            StepEvent::Filled { owner: 2, size: 2 },
            StepEvent::Inserted { owner: 2, size: 3 },
        ]
    );
    assert_eq!(render(&list, '.'), "0|2_|1__|2__|.|");
    assert_eq!(list.head().map(|h| list.extent(h).unwrap()), Some(Extent::occupied(0, 1)));
    assert_eq!(list.tail().map(|h| list.extent(h).unwrap()), Some(Extent::free(1)));
    assert_eq!(checksum(&list), 60);
}

#[test]
fn test_small_map_whole_extent_trace() {
    let mut list = build("12345").unwrap();
    let mut compactor = WholeExtentCompactor::with_observer(RecordingObserver::new(), &verified());
    compactor.compact(&mut list).unwrap();

    assert_eq!(
        compactor.observer().events,
        vec![
            StepEvent::Stayed { owner: 2, size: 5 },
            StepEvent::Stayed { owner: 1, size: 3 },
            StepEvent::Stayed { owner: 0, size: 1 },
        ]
    );
    assert_eq!(render(&list, '.'), "0|..|1__|....|2____|");
    assert_eq!(checksum(&list), 132);
}

#[test]
fn test_single_extent_is_identity_for_both() {
    for digit in 1..=9u64 {
        let input = digit.to_string();
        for whole in [false, true] {
            let mut list = build(&input).unwrap();
            let report = if whole {
                WholeExtentCompactor::new(&verified()).compact(&mut list).unwrap()
            } else {
                FragmentCompactor::new(&verified()).compact(&mut list).unwrap()
            };
            assert_eq!(list.extents(), vec![Extent::occupied(0, digit)]);
            assert_eq!(report.relocations + report.swaps + report.splits, 0);
            assert_eq!(checksum(&list), 0);
        }
    }
}

#[test]
fn test_second_whole_extent_pass_can_move_files() {
    // After one pass the reference disk reads
    // 00992111777.44.333....5555.6666.....8888..
    // File 8 skipped the four-unit gap because it only opened up once file 4
    // moved; a second pass finds it.
    let config = verified();
    let mut list = build(REFERENCE).unwrap();
    WholeExtentCompactor::new(&config).compact(&mut list).unwrap();
    assert_eq!(checksum(&list), 2858);

    let report = WholeExtentCompactor::new(&config).compact(&mut list).unwrap();
    assert_eq!(report.relocations, 1);
    assert_eq!(checksum(&list), 2858 - 8 * ((36 + 37 + 38 + 39) - (18 + 19 + 20 + 21)));

    // Nothing left to move on a third pass
    let report = WholeExtentCompactor::new(&config).compact(&mut list).unwrap();
    assert_eq!(report.relocations, 0);
}

#[test]
fn test_malformed_input_is_surfaced_verbatim() {
    let err = solve("23331x3", &CompactorConfig::default()).unwrap_err();
    assert!(!err.is_internal());
    let message = err.to_string();
    assert!(message.contains("23331x3"), "message was {message}");
    assert!(matches!(err, CompactError::MalformedInput { found: 'x', offset: 5, .. }));
}

#[test]
fn test_file_with_trailing_newline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.txt");
    std::fs::write(&path, format!("{REFERENCE}\n")).unwrap();

    let input = std::fs::read_to_string(&path).unwrap();
    let sums = solve(&input, &CompactorConfig::default()).unwrap();
    assert_eq!(sums.fragmented, 1928);
}

#[test]
fn test_long_map_checksum_exceeds_u64() {
    let runs = 2_000_001;
    let mut list = build(&"9".repeat(runs)).unwrap();
    FragmentCompactor::new(&CompactorConfig::default())
        .compact(&mut list)
        .unwrap();

    // Equal-size gaps and files: each gap takes the current last file, so
    // files come out as 0, last, 1, last - 1, ...
    let files = (runs as u128 + 1) / 2;
    let (mut lo, mut hi) = (0u128, files - 1);
    let mut expected = 0u128;
    let mut slot = 0u128;
    while lo <= hi {
        let owner = if slot % 2 == 0 {
            lo += 1;
            lo - 1
        } else {
            hi -= 1;
            hi + 1
        };
        // units 9 * slot .. 9 * slot + 9
        expected += owner * (81 * slot + 36);
        slot += 1;
    }

    assert_eq!(expected, 20_250_048_375_038_250_000);
    assert!(expected > u128::from(u64::MAX));
    assert_eq!(checksum(&list), expected);
}
