// ==========================================
// 配置加载集成测试
// ==========================================
// 优先级: 内置默认值 → config_kv(global) → 环境变量
// ==========================================

mod test_helpers;

use inventory_monitor::app::AppState;
use inventory_monitor::config::{config_keys, ConfigManager};
use test_helpers::{create_test_db, row, write_inventory_csv};

#[test]
fn test_config_precedence_and_state_wiring() {
    let (_db, db_path) = create_test_db().unwrap();
    let upload_dir = tempfile::TempDir::new().unwrap();

    let manager = ConfigManager::new(&db_path).unwrap();
    manager
        .set_global_config_value(config_keys::UPLOAD_DIR, &upload_dir.path().to_string_lossy())
        .unwrap();
    manager.set_global_config_value(config_keys::SIZE_THRESHOLD, "12").unwrap();
    manager.set_global_config_value(config_keys::TRACKED_SEASON_CODE, "SS25").unwrap();

    // 环境变量覆盖 config_kv
    std::env::set_var("TRACKED_SEASON_CODE", "KI00");
    std::env::set_var("INVENTORY_CACHE_TTL_SECS", "not-a-number");

    let config = manager.load_monitor_config().unwrap();
    assert_eq!(config.upload_dir, upload_dir.path());
    assert_eq!(config.default_threshold, 12);
    assert_eq!(config.tracked_season_code, "KI00");
    // 不可解析的值被忽略
    assert_eq!(config.cache_ttl_secs, 300);

    let state = AppState::new(db_path).unwrap();
    assert_eq!(state.config, config);

    write_inventory_csv(
        &upload_dir.path().join("inventory.csv"),
        &[
            row("ANDRA - JACKET", "Black", "990.XS", 11, "KI00"),
            row("ANDRA - JACKET", "Black", "990.M", 12, "KI00"),
        ],
    )
    .unwrap();

    let report = state.alert_api.batch_alerts(None).unwrap();
    let alerts = &report["ANDRA"].alerts;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].threshold, 12);
    assert_eq!(alerts[0].shortage, 1);

    std::env::remove_var("TRACKED_SEASON_CODE");
    std::env::remove_var("INVENTORY_CACHE_TTL_SECS");
}
