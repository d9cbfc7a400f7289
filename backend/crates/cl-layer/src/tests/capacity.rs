use crate::{CapacityTable, LayerError};

use cl_config::{CapacityOverride, PatternKind};

use regex::Regex;

#[test]
fn given_no_overrides_when_capacity_for_then_default() {
    let table = CapacityTable::new(7);

    assert_eq!(table.capacity_for("anything"), 7);
    assert_eq!(table.default_capacity(), 7);
}

#[test]
fn given_overlapping_globs_when_capacity_for_then_first_match_wins() {
    // Given
    let table = CapacityTable::new(100)
        .with_glob("http.response!*", 10)
        .unwrap()
        .with_glob("http.*", 20)
        .unwrap();

    // Then
    assert_eq!(table.capacity_for("http.response!abc"), 10);
    assert_eq!(table.capacity_for("http.request"), 20);
    assert_eq!(table.capacity_for("chat"), 100);
}

#[test]
fn given_glob_when_name_only_contains_match_then_not_matched() {
    let table = CapacityTable::new(100).with_glob("chat", 5).unwrap();

    assert_eq!(table.capacity_for("chat"), 5);
    assert_eq!(table.capacity_for("chat.room"), 100);
    assert_eq!(table.capacity_for("xchat"), 100);
}

#[test]
fn given_glob_with_character_class_when_capacity_for_then_matched() {
    let table = CapacityTable::new(100).with_glob("shard-[0-3]", 50).unwrap();

    assert_eq!(table.capacity_for("shard-2"), 50);
    assert_eq!(table.capacity_for("shard-7"), 100);
}

#[test]
fn given_regex_override_when_capacity_for_then_anchored_at_start_only() {
    // Given
    let table = CapacityTable::new(100).with_regex(Regex::new(r"room-\d+").unwrap(), 3);

    // Then
    assert_eq!(table.capacity_for("room-12"), 3);
    assert_eq!(table.capacity_for("room-12.extra"), 3);
    assert_eq!(table.capacity_for("big-room-12"), 100);
}

#[test]
fn given_configured_overrides_when_from_overrides_then_order_kept() {
    // Given
    let overrides = vec![
        CapacityOverride {
            pattern: String::from("^priority"),
            capacity: 1000,
            kind: PatternKind::Regex,
        },
        CapacityOverride {
            pattern: String::from("*"),
            capacity: 2,
            kind: PatternKind::Glob,
        },
    ];

    // When
    let table = CapacityTable::from_overrides(100, &overrides).unwrap();

    // Then
    assert_eq!(table.capacity_for("priority.jobs"), 1000);
    assert_eq!(table.capacity_for("other"), 2);
}

#[test]
fn given_bad_regex_when_from_overrides_then_invalid_pattern() {
    // Given
    let overrides = vec![CapacityOverride {
        pattern: String::from("(unclosed"),
        capacity: 1,
        kind: PatternKind::Regex,
    }];

    // When
    let result = CapacityTable::from_overrides(100, &overrides);

    // Then
    assert!(matches!(result, Err(LayerError::InvalidPattern { .. })));
}

#[test]
fn given_bad_glob_when_with_glob_then_invalid_pattern() {
    let result = CapacityTable::new(100).with_glob("[unclosed", 1);

    assert!(matches!(result, Err(LayerError::InvalidPattern { .. })));
}
