//! # 地图瓦片生成工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 命令行 (clap + env_logger)                │
//! │                                                          │
//! │  main ── cli::Args ── 钳制/校验 ── Ctrl-C → CancelToken  │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<ExportSummary, AppError> → 退出码
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (tiler)                          │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型 + 退出码)        │
//! │  │                                                       │
//! │  └─ tiler ────── 解码 → 金字塔 → 切片 → 写入             │
//! │      ├─ loader         输入读取 + 签名/像素校验          │
//! │      ├─ pyramid        自细向粗向上取整减半              │
//! │      ├─ slicer         行优先网格 + 边缘填充             │
//! │      ├─ writer         {level}/{column}/{row}.{ext}      │
//! │      ├─ exporter       rayon 级内并行 + 取消 + 进度      │
//! │      └─ leaflet        预览页模板替换                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` 与退出码映射 |
//! | [`cli`] | 命令行参数、配置文件合并、数值钳制、一次完整导出 |
//! | [`tiler`] | 金字塔构建、瓦片切分、编码写入、预览页 |

pub mod cli;
pub mod error;
pub mod tiler;
