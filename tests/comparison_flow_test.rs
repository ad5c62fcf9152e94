// ==========================================
// 两期对比 / 阈值变动分析 集成测试
// ==========================================

mod test_helpers;

use inventory_monitor::api::{ApiError, ApiResponse};
use inventory_monitor::domain::Category;
use std::sync::Arc;
use test_helpers::{row, TestEnv};

fn old_rows() -> Vec<test_helpers::InventoryRow> {
    vec![
        row("ItemA - COAT", "Black", "990.XS", 21, "KI00"),
        row("ItemB - DRESS", "Black", "990.L", 10, "KI00"),
        row("ItemD - SHIRT", "White", "990.S", 4, "KI00"),
        row("OLIVE - KNIT", "Blue", "350S", 9, "FW24"),
    ]
}

fn new_rows() -> Vec<test_helpers::InventoryRow> {
    vec![
        row("ItemA - COAT", "Black", "990.XS", 20, "KI00"),
        row("ItemB - DRESS", "Black", "990.L", 0, "KI00"),
        row("ItemD - SHIRT", "White", "990.S", 4, "KI00"),
        row("ItemC - SKIRT", "Red", "990.M", 5, "KI00"),
    ]
}

#[test]
fn test_end_to_end_comparison() {
    let env = TestEnv::new();
    let old = env.upload("week1.csv", &old_rows(), 1_000);
    let new = env.upload("week2.csv", &new_rows(), 2_000);
    let api = &env.state.comparison_api;

    let records = api.compare_records(&old, &new).unwrap();
    assert_eq!(records.len(), 4);

    let by_item = |name: &str| records.iter().find(|r| r.item_name == name).unwrap();
    assert_eq!(by_item("ItemA").change, -1);
    assert_eq!(by_item("ItemA").category, Some(Category::Excellent));
    assert_eq!(by_item("ItemB").category, Some(Category::Urgent));
    assert_eq!(by_item("ItemC").category, Some(Category::New));
    assert!(by_item("ItemC").old.is_none());
    assert_eq!(by_item("ItemD").category, Some(Category::Poor));
    // 非跟踪季节码不参与对比
    assert!(records.iter().all(|r| r.item_name != "OLIVE"));

    let feed = api.compare_files(&old, &new).unwrap();
    let insights = &feed.business_insights;
    assert_eq!(feed.file1, "week1.csv");
    assert_eq!(feed.file2, "week2.csv");
    assert_eq!(feed.total_items_analyzed, 4);
    assert_eq!(insights.summary.excellent_performers, 1);
    assert_eq!(insights.summary.urgent_restock_needed, 1);
    assert_eq!(insights.summary.new_products, 1);
    assert_eq!(insights.summary.poor_performers, 1);
    assert_eq!(insights.summary.discontinued_products, 0);
    assert_eq!(insights.summary.categorized_total(), 4);

    assert_eq!(insights.top_sales.len(), 2);
    assert_eq!(insights.top_sales[0].item_name, "ItemB");
    assert!(!insights.recommendations.is_empty());

    // 相同签名命中缓存
    assert!(Arc::ptr_eq(&feed, &api.compare_files(&old, &new).unwrap()));
}

#[test]
fn test_discontinued_variant() {
    let env = TestEnv::new();
    let old = env.upload(
        "week1.csv",
        &[
            row("ItemA - COAT", "Black", "990.XS", 3, "KI00"),
            row("ItemE - VEST", "Green", "990.M", 0, "KI00"),
        ],
        1_000,
    );
    let new = env.upload("week2.csv", &[row("ItemA - COAT", "Black", "990.XS", 3, "KI00")], 2_000);

    let records = env.state.comparison_api.compare_records(&old, &new).unwrap();
    let vest = records.iter().find(|r| r.item_name == "ItemE").unwrap();
    assert_eq!(vest.category, Some(Category::Discontinued));
    assert!(vest.new.is_none());
}

#[test]
fn test_compare_requires_tracked_items() {
    let env = TestEnv::new();
    let untracked = env.upload("week1.csv", &[row("OLIVE - KNIT", "Blue", "350S", 9, "FW24")], 1_000);
    let tracked = env.upload("week2.csv", &new_rows(), 2_000);
    let api = &env.state.comparison_api;

    let err = api.compare_files(&untracked, &tracked).unwrap_err();
    assert_eq!(err.to_string(), "No KI00 items found in first file");

    let err = api.compare_files(&tracked, &untracked).unwrap_err();
    assert!(matches!(err, ApiError::NoTrackedItems { position: "second", .. }));

    let response: ApiResponse<_> = api.compare_files(&tracked, &untracked).into();
    assert_eq!(response.error.unwrap().kind, "NO_TRACKED_ITEMS");
}

#[test]
fn test_threshold_change_analysis_latest_vs_previous() {
    let env = TestEnv::new();
    let api = &env.state.comparison_api;

    env.upload(
        "week1.csv",
        &[
            row("ANDRA - JACKET", "Black", "990.XS", 10, "KI00"),
            row("ANDRA - JACKET", "Black", "990.S", 5, "KI00"),
            row("ANDRA - JACKET", "Black", "990.M", 50, "KI00"),
        ],
        1_000,
    );

    // 只有一个文件时为基线
    let baseline = api.threshold_change_analysis().unwrap();
    assert!(baseline.previous_file.is_none());
    assert_eq!(baseline.summary.total_current_low_stock, 2);
    assert!(baseline.summary_text.starts_with("Initial Analysis: 2 items"));

    env.upload(
        "week2.csv",
        &[
            row("ANDRA - JACKET", "Black", "990.XS", 4, "KI00"),
            row("ANDRA - JACKET", "Black", "990.S", 45, "KI00"),
            row("ANDRA - JACKET", "Black", "990.M", 2, "KI00"),
        ],
        2_000,
    );
    env.state
        .ingest_api
        .register_upload(&env.upload_dir.path().join("week2.csv"))
        .unwrap();

    let report = api.threshold_change_analysis().unwrap();
    assert_eq!(report.current_file, "week2.csv");
    assert_eq!(report.previous_file.as_deref(), Some("week1.csv"));
    assert_eq!(report.summary.new_below_threshold, 1);
    assert_eq!(report.new_below_threshold_items[0].size, "M");
    assert_eq!(report.summary.improved_items, 1);
    assert_eq!(report.improved_items[0].size, "S");
    assert_eq!(report.summary.worsened_items, 1);
    assert_eq!(report.worsened_items[0].stock_decrease, 6);
    assert_eq!(report.summary.net_change, 0);

    // 目录中出现比登记的最新文件更新的文件时，上一期仍取最新文件之前的那个
    env.upload("late_export.csv", &[row("ANDRA - JACKET", "Black", "990.XS", 1, "KI00")], 3_000);
    let report = api.threshold_change_analysis().unwrap();
    assert_eq!(report.current_file, "week2.csv");
    assert_eq!(report.previous_file.as_deref(), Some("week1.csv"));
}
