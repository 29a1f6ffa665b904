//! # 地图瓦片生成工具 — 命令行入口
//!
//! 本文件仅负责日志初始化、Ctrl-C 注册与退出码映射。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::process;

use chrono::Local;
use clap::Parser;
use tile_pyramid::cli::{self, Args};
use tile_pyramid::error::{AppError, EXIT_SUCCESS};
use tile_pyramid::tiler::CancelToken;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cancel = CancelToken::new();

    let handler_token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        log::warn!("🛑 收到中断信号，完成当前瓦片后停止");
        handler_token.cancel();
    }) {
        let err = AppError::Signal(err.to_string());
        log::error!("❌ {}", err);
        process::exit(err.exit_code());
    }

    let code = match cli::run(&args, Local::now().naive_local(), &cancel) {
        Ok(summary) => {
            if args.summary_json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(err) => log::warn!("⚠️ 序列化导出摘要失败：{}", err),
                }
            }
            log::info!("🎉 全部完成");
            EXIT_SUCCESS
        }
        Err(err) => {
            log::error!("❌ {}", err);
            if args.summary_json {
                println!("{}", serde_json::json!({ "error": err, "exitCode": err.exit_code() }));
            }
            err.exit_code()
        }
    };

    process::exit(code);
}
