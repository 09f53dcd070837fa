//! Tests for path parsing and manipulation
//!
//! Copyright (c) 2025 Fieldmap Team
//! Licensed under the Apache-2.0 license

use super::*;

#[test]
fn test_parse_empty_and_root() {
    assert!(PathExpression::parse("").is_empty());
    assert!(PathExpression::parse("/").is_empty());
    assert_eq!(PathExpression::parse("").to_string(), "/");
}

#[test]
fn test_parse_without_separator_is_single_segment() {
    let path = PathExpression::parse("name");
    assert_eq!(path.len(), 1);
    assert_eq!(path.last_segment().unwrap().name(), "name");
    assert_eq!(path, PathExpression::parse("/name"));
}

#[test]
fn test_parse_preserves_original_text() {
    let path = PathExpression::parse("order//items<1>/");
    assert_eq!(path.original(), "order//items<1>/");
    assert_eq!(path.to_string(), "/order/items<1>");
    assert_eq!(path.len(), 2);
}

#[test]
fn test_segment_parts() {
    let path = PathExpression::parse("/ns:order/@id/tags[2]/attrs{color}");
    let segments = path.segments();

    assert_eq!(segments[0].namespace(), Some("ns"));
    assert_eq!(segments[0].name(), "order");

    assert!(segments[1].is_attribute());
    assert_eq!(segments[1].name(), "id");

    assert_eq!(segments[2].collection_type(), CollectionType::Array);
    assert_eq!(segments[2].collection_index(), Some(2));

    assert_eq!(segments[3].collection_type(), CollectionType::Map);
    assert_eq!(segments[3].map_key(), Some("color"));
    assert_eq!(segments[3].collection_index(), None);
}

#[test]
fn test_append_builder() {
    let path = PathExpression::new().append("a").append("b<>").append("c");
    assert_eq!(path.to_string(), "/a/b<>/c");
    assert_eq!(PathExpression::parse(&path.to_string()), path);
}

#[test]
fn test_parent_operations() {
    let path = PathExpression::parse("/a/b/c");
    assert_eq!(path.last_segment().unwrap().name(), "c");
    assert_eq!(path.parent_segment().unwrap().name(), "b");
    assert_eq!(path.parent_path().unwrap().to_string(), "/a/b");

    let single = PathExpression::parse("/a");
    assert!(single.parent_segment().is_none());
    assert!(single.parent_path().is_none());
    assert!(PathExpression::new().last_segment().is_none());
}

#[test]
fn test_is_collection_segment() {
    assert!(PathExpression::is_collection_segment("list<>"));
    assert!(PathExpression::is_collection_segment("arr[3]"));
    assert!(PathExpression::is_collection_segment("map{key}"));
    assert!(!PathExpression::is_collection_segment("plain"));
    assert!(!PathExpression::is_collection_segment("broken]"));
    assert!(!PathExpression::is_collection_segment("broken[1"));
    assert!(!PathExpression::is_collection_segment("mismatch[1>"));
}

#[test]
fn test_collection_index() {
    assert_eq!(PathExpression::collection_index("list<4>"), Some(4));
    assert_eq!(PathExpression::collection_index("arr[12]"), Some(12));
    assert_eq!(PathExpression::collection_index("list<>"), None);
    assert_eq!(PathExpression::collection_index("arr[]"), None);
    assert_eq!(PathExpression::collection_index("map{3}"), None);
    assert_eq!(PathExpression::collection_index("arr[x]"), None);
}

#[test]
fn test_clean_segment() {
    assert_eq!(PathExpression::clean_segment("ns:items<3>"), "items");
    assert_eq!(PathExpression::clean_segment("@id"), "id");
    assert_eq!(PathExpression::clean_segment("@ns:id"), "id");
    assert_eq!(PathExpression::clean_segment("attrs{k}"), "attrs");
    // malformed brackets pass through
    assert_eq!(PathExpression::clean_segment("arr[1"), "arr[1");
}

#[test]
fn test_set_collection_index_rewrites_all_matches() {
    let mut path = PathExpression::parse("/a<>/b/a[1]");
    path.set_collection_index("a<>", 5).unwrap();
    assert_eq!(path.to_string(), "/a<5>/b/a[5]");
    assert_eq!(path.original(), "/a<5>/b/a[5]");
}

#[test]
fn test_set_collection_index_contract_errors() {
    let mut path = PathExpression::parse("/items<>/name");

    let err = path.set_collection_index("", 0).unwrap_err();
    assert!(err.is_contract_violation());

    let err = path.set_collection_index("items", 0).unwrap_err();
    assert!(err.is_contract_violation());

    let err = path.set_collection_index("items{}", 0).unwrap_err();
    assert!(err.is_contract_violation());

    let err = path.set_collection_index("other<>", 0).unwrap_err();
    assert!(err.is_contract_violation());

    // the path is unchanged after a failure
    assert_eq!(path.to_string(), "/items<>/name");
}

#[test]
fn test_de_collectionify() {
    let path = PathExpression::parse("/orders<2>/items<>/sku");
    assert_eq!(
        path.de_collectionify("items<>").unwrap().to_string(),
        "/sku"
    );
    assert_eq!(
        path.de_collectionify("orders<>").unwrap().to_string(),
        "/items<>/sku"
    );
    assert!(path.de_collectionify("missing<>").is_none());
    assert!(PathExpression::parse("/items<>").de_collectionify("items<>").is_none());

    let tail = path.de_collectionify("sku").unwrap();
    assert!(tail.is_empty());
}

#[test]
fn test_de_parentify() {
    let path = PathExpression::parse("/a/b/c");
    assert_eq!(path.de_parentify().unwrap().to_string(), "/b/c");
    assert!(PathExpression::parse("/a").de_parentify().is_none());
}

#[test]
fn test_remove_collection_indexes() {
    assert_eq!(PathExpression::remove_collection_index("list<3>"), "list<>");
    assert_eq!(PathExpression::remove_collection_index("arr[3]"), "arr[]");
    assert_eq!(PathExpression::remove_collection_index("plain"), "plain");

    let a = PathExpression::parse("/orders<0>/items[1]/sku");
    let b = PathExpression::parse("/orders<4>/items[7]/sku");
    assert_ne!(a, b);
    assert_eq!(a.remove_collection_indexes(), b.remove_collection_indexes());
    assert_eq!(a.remove_collection_indexes().to_string(), "/orders<>/items[]/sku");
}

#[test]
fn test_matches_and_starts_with() {
    let concrete = PathExpression::parse("/list<1>/v");
    assert!(concrete.matches(&PathExpression::parse("/list<>/v")));
    assert!(concrete.matches(&PathExpression::parse("/list<1>/v")));
    assert!(!concrete.matches(&PathExpression::parse("/list<0>/v")));
    assert!(concrete.starts_with(&PathExpression::parse("/list<>")));
    assert!(!concrete.starts_with(&PathExpression::parse("/other")));
}

#[test]
fn test_with_index_at() {
    let path = PathExpression::parse("/a<>/b<>");
    assert_eq!(path.first_unindexed_collection(), Some(0));
    let indexed = path.with_index_at(0, 2);
    assert_eq!(indexed.to_string(), "/a<2>/b<>");
    assert_eq!(indexed.first_unindexed_collection(), Some(1));
    // non-collection positions are ignored
    assert_eq!(path.with_index_at(9, 1), path);
}

#[test]
fn test_serde_as_string() {
    let path = PathExpression::parse("/a/b<1>");
    let json = serde_json::to_string(&path).unwrap();
    assert_eq!(json, "\"/a/b<1>\"");
    let back: PathExpression = serde_json::from_str(&json).unwrap();
    assert_eq!(back, path);
}
