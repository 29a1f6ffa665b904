//! # 切片模块（tiler）
//!
//! ## 设计思路
//!
//! 该模块将“输入解码 → 金字塔构建 → 网格切片 → 编码写入 → 预览页”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `exporter`：编排整条处理流水线（并行、取消、进度、耗时日志）
//! - `loader`：负责文件读取、签名校验与解码
//! - `pyramid`：负责逐级向上取整减半的降采样
//! - `slicer`：负责网格计算与边缘瓦片填充
//! - `writer`：负责编码、路径规则与原子写入
//! - `leaflet`：负责预览页模板替换
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! main.rs / cli.rs（参数解析 + 钳制）
//!    ↓
//! exporter.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（读取 + 签名/像素校验 + 解码）
//!    ├─ pyramid.rs（自细向粗降采样）
//!    ├─ slicer.rs（行优先网格 + 填充色补边）
//!    ├─ writer.rs（编码 + 临时文件重命名 + 瞬时错误重试）
//!    └─ leaflet.rs（可选预览页）
//!    ↓
//! 返回 TileError，入口层映射为退出码
//! ```

mod config;
mod error;
mod exporter;
pub mod leaflet;
mod loader;
pub mod pyramid;
pub mod slicer;
mod source;
pub mod writer;

pub use config::{
    ExportConfig, TileFormat, clamp_quality, clamp_tile_size, clamp_zoom_levels,
    default_output_dir, DEFAULT_QUALITY, DEFAULT_TILE_SIZE, DEFAULT_ZOOM_LEVELS,
};
pub use error::TileError;
pub use exporter::{CancelToken, ExportSummary, LevelSummary, TileExporter};
pub use loader::{decode_raster, load_raster};
pub use pyramid::{build_pyramid, level_dimensions};
pub use slicer::{PixelRect, TileGrid, extract_tile, tiles_for};
pub use source::{FillColor, Pyramid, Raster, Tile, TileAddress};
pub use writer::{TileWriter, encode_tile, tile_path};
