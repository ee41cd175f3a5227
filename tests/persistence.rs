//! Condition states surviving a restart through the file cache.

use chrono::TimeDelta;
use rating_gateway::conditions;
use rating_gateway::prelude::*;
use std::path::Path;

fn build(data_path: &Path) -> RatingGateway {
    RatingGateway::builder()
        .config(GatewayConfig::new(data_path))
        .condition(
            "ClickCount",
            conditions::count(0, 5, ConditionType::Standard).explicit_manipulation_only(true),
        )
        .condition("Seen", conditions::boolean(ConditionType::Standard))
        .condition(
            "Cooldown",
            conditions::expires_after(TimeDelta::days(3), ConditionType::Prerequisite)
                .reset_only_on_evaluation_success(false),
        )
        .view(StoreRatingView::new())
        .build()
        .unwrap()
}

fn stored(data_path: &Path) -> Vec<ConditionCacheEntry> {
    let config = GatewayConfig::new(data_path);
    FileConditionCache::from_config(&config).entries().to_vec()
}

#[test]
fn fresh_install_writes_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = build(dir.path());

    let entries = stored(dir.path());
    let names: Vec<&str> = entries.iter().map(|e| e.condition_name.as_str()).collect();
    // Booleans are not cached by default.
    assert_eq!(names, vec!["ClickCount", "Cooldown"]);
    assert_eq!(entries[0].current_value, StateValue::Integer(0));
    assert_eq!(
        entries[1].current_value,
        gateway.condition("Cooldown").unwrap().current_value()
    );
}

#[test]
fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let deadline = {
        let mut gateway = build(dir.path());
        gateway.evaluate_condition("ClickCount", None, true).unwrap();
        gateway.evaluate_condition("ClickCount", None, true).unwrap();
        gateway.evaluate().unwrap();
        gateway.condition("Cooldown").unwrap().current_value()
    };

    let restarted = build(dir.path());
    assert_eq!(
        restarted.condition("ClickCount").unwrap().current_value(),
        StateValue::Integer(2)
    );
    assert_eq!(
        restarted.condition("Cooldown").unwrap().current_value(),
        deadline
    );
    assert_eq!(
        restarted.condition("Seen").unwrap().current_value(),
        StateValue::Bool(false)
    );

    let restored: Vec<bool> = restarted
        .events()
        .recent(10)
        .iter()
        .rev()
        .filter_map(|event| match &event.event_type {
            EventType::ConditionRegistered {
                restored_from_cache,
                ..
            } => Some(*restored_from_cache),
            _ => None,
        })
        .collect();
    assert_eq!(restored, vec![true, false, true]);
}

#[test]
fn reset_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut gateway = build(dir.path());
        gateway
            .evaluate_condition("ClickCount", Some(StateValue::Integer(4)), true)
            .unwrap();
        gateway.reset_all_conditions().unwrap();
    }

    let entries = stored(dir.path());
    assert_eq!(entries[0].condition_name, "ClickCount");
    assert_eq!(entries[0].current_value, StateValue::Integer(0));
}

#[test]
fn remove_can_keep_or_purge_cache_entry() {
    let dir = tempfile::tempdir().unwrap();
    let mut gateway = build(dir.path());

    gateway.remove_condition("Cooldown", false).unwrap();
    assert_eq!(stored(dir.path()).len(), 2);

    gateway.remove_condition("ClickCount", true).unwrap();
    let entries = stored(dir.path());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].condition_name, "Cooldown");
}

#[test]
fn corrupt_cache_starts_from_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = GatewayConfig::new(dir.path());
    std::fs::write(config.cache_file_path(), b"{ definitely not json").unwrap();

    let mut gateway = build(dir.path());
    assert_eq!(
        gateway.condition("ClickCount").unwrap().current_value(),
        StateValue::Integer(0)
    );

    // The next write replaces the corrupt file with a valid one.
    gateway
        .evaluate_condition("ClickCount", Some(StateValue::Integer(3)), true)
        .unwrap();
    let entries = stored(dir.path());
    assert_eq!(entries[0].current_value, StateValue::Integer(3));
}

#[test]
fn write_failure_surfaces_from_build() {
    let dir = tempfile::tempdir().unwrap();
    let config = GatewayConfig::new(dir.path());
    // A non-empty directory where the cache file belongs cannot be replaced.
    std::fs::create_dir(config.cache_file_path()).unwrap();
    std::fs::write(config.cache_file_path().join("keep"), "x").unwrap();

    let err = RatingGateway::builder()
        .config(config)
        .condition("ClickCount", conditions::count(0, 5, ConditionType::Standard))
        .build()
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageError);
}

#[test]
fn handle_initializes_with_file_cache_once() {
    let dir = tempfile::tempdir().unwrap();
    let other = tempfile::tempdir().unwrap();
    let mut handle = GatewayHandle::new();

    handle
        .initialize(
            RatingGateway::builder()
                .config(GatewayConfig::new(dir.path()))
                .condition("ClickCount", conditions::count(0, 5, ConditionType::Standard)),
        )
        .unwrap();
    handle
        .initialize(
            RatingGateway::builder()
                .config(GatewayConfig::new(other.path()))
                .condition("Other", conditions::count(0, 5, ConditionType::Standard)),
        )
        .unwrap();

    let gateway = handle.current_mut().unwrap();
    assert!(gateway.contains_key("ClickCount"));
    assert!(!gateway.contains_key("Other"));
    assert!(!GatewayConfig::new(other.path()).cache_file_path().exists());

    gateway.evaluate().unwrap();
    assert_eq!(stored(dir.path())[0].current_value, StateValue::Integer(1));
}
