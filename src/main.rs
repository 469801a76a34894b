// ==========================================
// 饲料装车看板 - 命令行入口
// ==========================================
// 用法:
//   feed-cargo-kanban            打印当前报表 (空库时写入示例数据并保存快照)
//   feed-cargo-kanban board <部门> 打印部门可见的看板
// 数据库: FEED_KANBAN_DB_PATH 或用户数据目录
// ==========================================

use anyhow::{Context, Result};
use feed_cargo_kanban::app::{get_default_db_path, AppState};
use feed_cargo_kanban::engine::{ReportFilter, SECTOR_LOGISTICS};
use feed_cargo_kanban::{logging, Actor};

fn main() -> Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", feed_cargo_kanban::APP_NAME, feed_cargo_kanban::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    let state = AppState::new(db_path.clone())
        .with_context(|| format!("无法初始化AppState: {}", db_path))?;
    let api = state.kanban_api.clone();

    state
        .seed_demo_if_empty()
        .context("写入示例数据失败")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("board") => {
            let sector = args.get(1).map(String::as_str).unwrap_or(SECTOR_LOGISTICS);
            let board = api.board(&Actor::new("cli", sector))?;
            println!("{}", serde_json::to_string_pretty(&board)?);
        }
        _ => {
            let report = api.report(ReportFilter::default())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
