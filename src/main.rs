// ==========================================
// 重点款库存监控 - 命令行入口
// ==========================================
// 用法: inventory-monitor <命令> [参数...]
// 输出: JSON（ApiResponse 信封）写 stdout，日志写 stderr
// ==========================================

use inventory_monitor::api::{ApiError, ApiResponse, ApiResult};
use inventory_monitor::app::{get_default_db_path, AppState};
use inventory_monitor::logging;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

const USAGE: &str = "\
用法: inventory-monitor <命令> [参数...]

预警:
  alerts [文件]                          批量低库存预警
  feed [文件]                            展平的预警输出
  key-items [文件]                       重点款款名
  item <款名> [文件]                     单款预警
  search <关键词> [文件]                 在预警中搜索
  options <款名> [文件]                  单款可选颜色/尺码

对比:
  compare <上期文件> <本期文件>          两期对比分析
  threshold-analysis                     最新 vs 上一期 阈值变动

阈值:
  thresholds                             覆写列表 + 变更历史
  get-threshold <款名> <尺码> <颜色>
  set-threshold <款名> <尺码> <颜色> <阈值>
  reset-threshold <款名> <尺码> <颜色>
  history [款名] [条数]

文件/缓存:
  register <文件>                        登记新文件为最新并清空缓存
  files                                  存储目录文件列表
  latest                                 当前最新文件
  cleanup [保留天数]                     清理过期的非激活上传文件
  warm                                   预热最新文件的批量预警
  stats                                  缓存统计

环境变量: INVENTORY_MONITOR_DB_PATH, UPLOAD_DIR, SIZE_THRESHOLD,
          INVENTORY_CACHE_TTL_SECS, TRACKED_SEASON_CODE, RUST_LOG";

fn to_json<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::InternalError(format!("序列化失败: {}", e)))
}

fn arg<'a>(args: &'a [String], idx: usize, name: &str) -> ApiResult<&'a str> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| ApiError::InvalidInput(format!("缺少参数: {}", name)))
}

fn opt_path(args: &[String], idx: usize) -> Option<&Path> {
    args.get(idx).map(Path::new)
}

async fn run(state: &AppState, command: &str, args: &[String]) -> ApiResult<Value> {
    match command {
        "alerts" => to_json(&*state.alert_api.batch_alerts(opt_path(args, 0))?),
        "feed" => to_json(&state.alert_api.alert_feed(opt_path(args, 0))?),
        "key-items" => to_json(&*state.alert_api.key_items(opt_path(args, 0))?),
        "item" => to_json(
            &*state
                .alert_api
                .item_alerts(arg(args, 0, "款名")?, opt_path(args, 1))?,
        ),
        "search" => to_json(
            &state
                .alert_api
                .search_alerts(arg(args, 0, "关键词")?, opt_path(args, 1))?,
        ),
        "options" => to_json(
            &*state
                .alert_api
                .item_options(arg(args, 0, "款名")?, opt_path(args, 1))?,
        ),
        "compare" => {
            let old = Path::new(arg(args, 0, "上期文件")?);
            let new = Path::new(arg(args, 1, "本期文件")?);
            to_json(&*state.comparison_api.compare_files(old, new)?)
        }
        "threshold-analysis" => to_json(&*state.comparison_api.threshold_change_analysis()?),
        "thresholds" => to_json(&state.threshold_api.admin_feed(None)),
        "get-threshold" => to_json(&state.threshold_api.get_threshold(
            arg(args, 0, "款名")?,
            arg(args, 1, "尺码")?,
            arg(args, 2, "颜色")?,
        )),
        "set-threshold" => {
            let raw = arg(args, 3, "阈值")?;
            let value = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ApiError::InvalidInput(format!("阈值不是整数: {}", raw)))?;
            to_json(&state.threshold_api.set_threshold(
                arg(args, 0, "款名")?,
                arg(args, 1, "尺码")?,
                arg(args, 2, "颜色")?,
                value,
            )?)
        }
        "reset-threshold" => to_json(&state.threshold_api.reset_threshold(
            arg(args, 0, "款名")?,
            arg(args, 1, "尺码")?,
            arg(args, 2, "颜色")?,
        )?),
        "history" => {
            let limit = match args.get(1) {
                Some(raw) => Some(
                    raw.parse::<usize>()
                        .map_err(|_| ApiError::InvalidInput(format!("条数不是整数: {}", raw)))?,
                ),
                None => None,
            };
            to_json(&state.threshold_api.history(args.first().map(String::as_str), limit))
        }
        "register" => to_json(&state.ingest_api.register_upload(Path::new(arg(args, 0, "文件")?))?),
        "files" => to_json(&state.ingest_api.list_files()),
        "latest" => to_json(&state.ingest_api.latest_file()?),
        "cleanup" => {
            let keep_days = match args.first() {
                Some(raw) => Some(
                    raw.parse::<u32>()
                        .map_err(|_| ApiError::InvalidInput(format!("保留天数不是非负整数: {}", raw)))?,
                ),
                None => None,
            };
            to_json(&state.ingest_api.cleanup_old_files(keep_days)?)
        }
        "warm" => {
            let warmed = state.warm_caches().await;
            to_json(&serde_json::json!({ "warmed": warmed, "cache": state.cache_stats() }))
        }
        "stats" => to_json(&state.cache_stats()),
        other => Err(ApiError::InvalidInput(format!("未知命令: {}", other))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, args)) = argv.split_first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };
    if command == "help" || command == "--help" || command == "-h" {
        println!("{}", USAGE);
        return Ok(());
    }

    let db_path = get_default_db_path();
    tracing::info!(version = inventory_monitor::VERSION, db = %db_path, "{}", inventory_monitor::APP_NAME);
    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    let response: ApiResponse<Value> = run(&state, command, args).await.into();
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
