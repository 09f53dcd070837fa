//! Fuzzing target for expression parsing and evaluation
//!
//! Arbitrary formula text must either fail with an error or evaluate;
//! neither step may panic, including on integer overflow.

#![no_main]

use fieldmap_core::expression::{ArgumentList, EmptyContext, Expression};
use fieldmap_core::{Field, FieldType};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let Ok(expression) = Expression::parse(&text) else {
        return;
    };

    let _ = expression.evaluate(&EmptyContext);

    let arguments = vec![
        Field::new("/a", FieldType::Long).with_value(i64::MAX),
        Field::new("/b", FieldType::Long).with_value(-1i64),
        Field::new("/c", FieldType::String).with_value("x"),
    ];
    let _ = expression.evaluate(&ArgumentList::new(&arguments));
});
