// ==========================================
// 阈值管理集成测试
// ==========================================
// 覆盖: 解析优先级、覆写持久化、历史、缓存失效
// ==========================================

mod test_helpers;

use inventory_monitor::api::ApiError;
use inventory_monitor::app::AppState;
use inventory_monitor::config::MonitorConfig;
use std::sync::Arc;
use test_helpers::{andra_rows, TestEnv};

#[test]
fn test_resolution_precedence() {
    let env = TestEnv::new();
    let api = &env.state.threshold_api;

    api.set_threshold("A", "S", "Red", 5).unwrap();
    api.set_threshold("A", "S", "*", 8).unwrap();

    assert_eq!(api.get_threshold("A", "S", "Red").threshold, 5);
    assert_eq!(api.get_threshold("A", "S", "Blue").threshold, 8);
    assert_eq!(api.get_threshold("A", "M", "Blue").threshold, 30);

    // 大小写不敏感
    assert_eq!(api.get_threshold("a", "s", "RED").threshold, 5);
    assert!(api.get_threshold("A", "S", "Red").has_override);
    assert!(!api.get_threshold("A", "S", "Blue").has_override);
}

#[test]
fn test_set_reset_round_trip_with_history() {
    let env = TestEnv::new();
    let api = &env.state.threshold_api;

    let change = api.set_threshold("ANDRA", "XS", "Black", 12).unwrap();
    assert!(change.is_persisted());
    assert_eq!(change.old_threshold, None);
    assert_eq!(api.get_threshold("ANDRA", "XS", "Black").threshold, 12);

    api.set_threshold("ANDRA", "XS", "Black", 15).unwrap();
    let reset = api.reset_threshold("ANDRA", "XS", "Black").unwrap();
    assert_eq!(reset.old_threshold, Some(15));
    assert_eq!(reset.new_threshold, 30);
    assert_eq!(api.get_threshold("ANDRA", "XS", "Black").threshold, 30);

    // 重置也写历史
    let history = api.history(Some("andra"), None);
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].note.as_deref(), Some("reset to default"));
    assert_eq!(history[2].new_threshold, 12);

    assert!(api.list_overrides().is_empty());
}

#[test]
fn test_overrides_survive_restart() {
    let env = TestEnv::new();
    env.state
        .threshold_api
        .set_threshold("ANDRA", "M", "Black", 40)
        .unwrap();

    let config = MonitorConfig {
        upload_dir: env.upload_dir.path().to_path_buf(),
        ..MonitorConfig::default()
    };
    let restarted = AppState::with_config(env.db_path(), config).unwrap();

    let effective = restarted.threshold_api.get_threshold("ANDRA", "M", "Black");
    assert_eq!(effective.threshold, 40);
    assert_eq!(restarted.threshold_api.history(None, Some(10)).len(), 1);

    let feed = restarted.threshold_api.admin_feed(None);
    assert_eq!(feed.default_threshold, 30);
    assert_eq!(feed.overrides.len(), 1);
}

#[test]
fn test_invalid_threshold_input() {
    let env = TestEnv::new();
    let api = &env.state.threshold_api;

    assert!(matches!(
        api.set_threshold("ANDRA", "M", "Black", -1),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        api.set_threshold("  ", "M", "Black", 10),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        api.reset_threshold("ANDRA", "", "Black"),
        Err(ApiError::InvalidInput(_))
    ));
}

#[test]
fn test_threshold_change_invalidates_cached_alerts() {
    let env = TestEnv::new();
    env.upload("inventory.csv", &andra_rows(), 1_000);
    let alerts = &env.state.alert_api;

    let before = alerts.batch_alerts(None).unwrap();
    assert_eq!(before["ANDRA"].alerts.len(), 2);
    assert!(Arc::ptr_eq(&before, &alerts.batch_alerts(None).unwrap()));

    let item_before = alerts.item_alerts("ANDRA", None).unwrap();

    let change = env
        .state
        .threshold_api
        .set_threshold("ANDRA", "M", "Black", 40)
        .unwrap();
    assert!(change.invalidated_cache_entries >= 2);

    let after = alerts.batch_alerts(None).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after["ANDRA"].alerts.len(), 3);

    let item_after = alerts.item_alerts("ANDRA", None).unwrap();
    assert!(!Arc::ptr_eq(&item_before, &item_after));
    assert_eq!(item_after.alerts.len(), 3);
}
