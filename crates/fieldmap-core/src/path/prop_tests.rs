//! Property-based tests for path expressions
//!
//! These tests verify that path operations are total, lenient and
//! self-consistent for arbitrary segment names.

use super::*;
use proptest::prelude::*;

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,12}"
}

fn bracket_strategy() -> impl Strategy<Value = (char, char)> {
    prop_oneof![Just(('[', ']')), Just(('<', '>')), Just(('{', '}'))]
}

proptest! {
    /// Property: parsing never panics, whatever the input
    #[test]
    fn prop_parse_never_panics(text in "\\PC{0,40}") {
        let path = PathExpression::parse(&text);
        let _ = path.to_string();
    }

    /// Property: a path built from plain appends survives a display/parse round trip
    #[test]
    fn prop_append_round_trip(names in proptest::collection::vec(name_strategy(), 0..6)) {
        let mut path = PathExpression::new();
        for name in &names {
            path = path.append(name);
        }
        prop_assert_eq!(PathExpression::parse(&path.to_string()), path);
    }

    /// Property: bracket classification and index extraction agree for every bracket kind
    #[test]
    fn prop_bracket_classification(
        name in name_strategy(),
        (open, close) in bracket_strategy(),
        index in proptest::option::of(0u32..100_000),
    ) {
        let content = index.map(|i| i.to_string()).unwrap_or_default();
        let segment = format!("{}{}{}{}", name, open, content, close);
        prop_assert!(PathExpression::is_collection_segment(&segment));

        let expected = if open == '{' { None } else { index };
        prop_assert_eq!(PathExpression::collection_index(&segment), expected);

        // dropping the closing bracket leaves a plain (malformed) name
        let broken = format!("{}{}{}", name, open, content);
        prop_assert!(!PathExpression::is_collection_segment(&broken));
    }

    /// Property: set_collection_index is observed by collection_index
    #[test]
    fn prop_set_then_read_index(
        parent in name_strategy(),
        coll in name_strategy(),
        leaf in name_strategy(),
        list in any::<bool>(),
        index in 0u32..1_000_000,
    ) {
        prop_assume!(parent != coll && leaf != coll);
        let segment = if list { format!("{}<>", coll) } else { format!("{}[]", coll) };
        let mut path = PathExpression::new().append(&parent).append(&segment).append(&leaf);
        path.set_collection_index(&segment, index).unwrap();

        let rewritten = path.segments()[1].expression().to_string();
        prop_assert_eq!(PathExpression::collection_index(&rewritten), Some(index));
        prop_assert_eq!(PathExpression::clean_segment(&rewritten), coll);
    }

    /// Property: de_collectionify returns the exact suffix after the first match
    #[test]
    fn prop_de_collectionify_suffix(
        names in proptest::collection::vec(name_strategy(), 2..6),
        pick in 0usize..6,
    ) {
        let mut path = PathExpression::new();
        for name in &names {
            path = path.append(name);
        }
        let pick = pick % names.len();
        let target = &names[pick];
        let first = names.iter().position(|n| n == target).unwrap_or(pick);

        let suffix = path.de_collectionify(target).unwrap();
        let expected: Vec<&str> = names[first + 1..].iter().map(String::as_str).collect();
        let actual: Vec<&str> = suffix.segments().iter().map(|s| s.name()).collect();
        prop_assert_eq!(actual, expected);
    }
}
