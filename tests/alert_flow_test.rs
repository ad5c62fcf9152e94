// ==========================================
// 预警流程集成测试
// ==========================================
// 覆盖: 批量预警、单款预警、搜索、可选项、错误信封
// ==========================================

mod test_helpers;

use inventory_monitor::api::{ApiError, ApiResponse};
use inventory_monitor::domain::ColorTotal;
use std::sync::Arc;
use test_helpers::{andra_rows, row, TestEnv};

#[test]
fn test_batch_alerts_for_latest_file() {
    let env = TestEnv::new();
    env.upload("inventory.csv", &andra_rows(), 1_000);

    let report = env.state.alert_api.batch_alerts(None).unwrap();
    assert_eq!(report.len(), 1);

    let andra = &report["ANDRA"];
    assert_eq!(andra.total_stock, 45);
    assert_eq!(andra.variants_count, 3);
    assert_eq!(
        andra.color_totals,
        vec![
            ColorTotal { color: "Black".into(), total_stock: 42 },
            ColorTotal { color: "Red".into(), total_stock: 3 },
        ]
    );

    assert_eq!(andra.alerts.len(), 2);
    assert_eq!(andra.alerts[0].size, "XS");
    assert_eq!(andra.alerts[0].stock_level, 7);
    assert_eq!(andra.alerts[0].shortage, 23);
    assert_eq!(andra.alerts[1].size, "2XL");
    // 35 >= 30 不预警
    assert!(andra.alerts.iter().all(|a| a.size != "M"));
}

#[test]
fn test_feed_search_and_options() {
    let env = TestEnv::new();
    env.upload("inventory.csv", &andra_rows(), 1_000);
    let api = &env.state.alert_api;

    let feed = api.alert_feed(None).unwrap();
    assert_eq!(feed.len(), 2);
    assert!(feed.iter().all(|e| e.status == "LOW STOCK"));
    assert_eq!(feed[0].required_threshold, 30);

    assert_eq!(api.search_alerts("leather", None).unwrap().len(), 2);
    assert_eq!(api.search_alerts("RED", None).unwrap().len(), 1);
    assert_eq!(api.search_alerts("", None).unwrap().len(), 2);
    assert!(api.search_alerts("olive", None).unwrap().is_empty());

    let options = api.item_options("ANDRA", None).unwrap();
    assert_eq!(options.colors, vec!["Black", "Red"]);
    assert_eq!(options.color_to_sizes["Black"], vec!["M", "XS"]);

    assert_eq!(*api.key_items(None).unwrap(), vec!["ANDRA".to_string()]);
}

#[test]
fn test_item_alerts_only_for_tracked_items() {
    let env = TestEnv::new();
    let file = env.upload("inventory.csv", &andra_rows(), 1_000);
    let api = &env.state.alert_api;

    let andra = api.item_alerts("ANDRA", Some(&file)).unwrap();
    assert_eq!(andra.total_stock, 45);

    // 款名大小写不敏感，且共用同一缓存条目
    let lower = api.item_alerts("andra", Some(&file)).unwrap();
    assert_eq!(lower.item_name, "ANDRA");
    assert!(Arc::ptr_eq(&andra, &lower));

    let olive = api.item_alerts("OLIVE", Some(&file));
    assert!(matches!(olive, Err(ApiError::NotFound(_))));
}

#[test]
fn test_no_key_items_is_error() {
    let env = TestEnv::new();
    env.upload("inventory.csv", &[row("OLIVE - KNIT", "Blue", "350S", 1, "FW24")], 1_000);

    let response: ApiResponse<_> = env.state.alert_api.batch_alerts(None).into();
    assert!(!response.success);
    assert_eq!(response.error.unwrap().kind, "NO_KEY_ITEMS");
}

#[test]
fn test_schema_error_reports_missing_columns() {
    let env = TestEnv::new();
    let path = env.upload_dir.path().join("broken.csv");
    std::fs::write(&path, "Item Description,Variant Color\nANDRA - X,Black\n").unwrap();

    let response: ApiResponse<_> = env.state.alert_api.batch_alerts(Some(&path)).into();
    assert!(!response.success);

    let error = response.error.unwrap();
    assert_eq!(error.kind, "SCHEMA_ERROR");
    let missing = error.missing_columns.unwrap();
    assert!(missing.contains(&"Quantity".to_string()));
    assert!(missing.contains(&"SeasonCode".to_string()));
}

#[test]
fn test_canonical_column_headers_accepted() {
    let env = TestEnv::new();
    let path = env.upload_dir.path().join("normalized.csv");
    std::fs::write(
        &path,
        "ItemDescription,VariantColor,VariantCode,Quantity,SeasonCode\n\
         ANDRA - LEATHER JACKET,Black,990.XS,7,KI00\n\
         ANDRA - LEATHER JACKET,Black,990.M,35,KI00\n",
    )
    .unwrap();

    let report = env.state.alert_api.batch_alerts(Some(&path)).unwrap();
    let andra = &report["ANDRA"];
    assert_eq!(andra.total_stock, 42);
    assert_eq!(andra.alerts.len(), 1);
    assert_eq!(andra.alerts[0].size, "XS");
}

#[test]
fn test_missing_inventory_file() {
    let env = TestEnv::new();

    let result = env.state.alert_api.batch_alerts(None);
    assert!(matches!(result, Err(ApiError::NoInventoryFile(_))));

    let missing = env.upload_dir.path().join("gone.csv");
    let result = env.state.alert_api.batch_alerts(Some(&missing));
    assert!(matches!(result, Err(ApiError::LoadError(_))));
}
