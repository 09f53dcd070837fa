//! Fuzzing target for field tree reads
//!
//! Builds a document from fuzzed JSON and reads fuzzed paths from it.

#![no_main]

use fieldmap_core::{FieldTree, FieldType, PathExpression};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the split between path text and document
    let split_point = (data[0] as usize) % data.len();
    let (path_bytes, doc_bytes) = data[1..].split_at(split_point.min(data.len() - 1));

    let Ok(json) = serde_json::from_slice::<Value>(doc_bytes) else {
        return;
    };
    let Ok(tree) = FieldTree::from_json("fuzz", &json) else {
        return;
    };

    let path = PathExpression::parse(&String::from_utf8_lossy(path_bytes));
    let field = tree.read(&path, FieldType::Any);
    let _ = field.leaves();
    let _ = tree.to_json();
});
