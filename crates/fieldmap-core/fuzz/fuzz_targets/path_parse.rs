//! Fuzzing target for path parsing
//!
//! The path parser is lenient: any input must parse, render and survive
//! index rewriting without panicking.

#![no_main]

use fieldmap_core::PathExpression;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let path = PathExpression::parse(&text);

    // Rendering and re-parsing must be stable after the first pass
    let rendered = path.to_string();
    let reparsed = PathExpression::parse(&rendered);
    assert_eq!(reparsed.to_string(), rendered);

    let segments: Vec<String> = path.segments().iter().map(|s| s.expression().to_string()).collect();
    for segment in &segments {
        let mut copy = path.clone();
        // Contract violations are expected for non-collection segments
        let _ = copy.set_collection_index(segment, 3);
        let _ = path.de_collectionify(segment);
    }
    let _ = path.remove_collection_indexes();
    let _ = path.de_parentify();
    let _ = path.parent_path();
});
