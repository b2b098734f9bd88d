#![no_main]
use blockpack::{
    build, checksum, solve, CompactError, Compactor, CompactorConfig, FragmentCompactor,
    WholeExtentCompactor,
};
use libfuzzer_sys::fuzz_target;

// Arbitrary text must either decode and compact cleanly or be rejected as
// malformed input; an invariant violation is always a bug.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let config = CompactorConfig::default().verified();

    let mut fragmented = match build(text) {
        Ok(list) => list,
        Err(CompactError::MalformedInput { .. }) => return,
        Err(err) => panic!("unexpected error decoding {text:?}: {err}"),
    };
    let census = fragmented.owner_census();
    FragmentCompactor::new(&config).compact(&mut fragmented).unwrap();
    assert_eq!(fragmented.owner_census(), census);

    let mut whole = build(text).unwrap();
    WholeExtentCompactor::new(&config).compact(&mut whole).unwrap();
    assert_eq!(whole.owner_census(), census);

    // Whole pipeline, with layout tracing on
    let traced = CompactorConfig {
        trace_layout: true,
        ..config
    };
    let sums = solve(text, &traced).unwrap();
    assert_eq!(sums.fragmented, checksum(&fragmented));
    assert_eq!(sums.whole_extent, checksum(&whole));
});
