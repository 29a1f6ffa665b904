//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ExportConfig`，保证导出行为可观测、可调整、可测试。
//! 命令行给出的数值在进入核心前先按文档范围钳制（而不是拒绝），
//! 核心只对钳制后仍然非法的值（例如 0 级）报 `Config` 错误。
//!
//! ## 实现思路
//!
//! - `Default` 提供与命令行默认值一致的配置。
//! - `TileFormat` 负责格式字符串解析、扩展名与填充色。
//! - `clamp_*` 系列函数实现边界钳制。
//! - `default_output_dir` 为纯函数，便于在不依赖真实时间的情况下测试。

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use image::Rgba;
use image::imageops::FilterType;

use super::TileError;
use super::source::FillColor;

pub const MIN_QUALITY: i64 = 1;
pub const MAX_QUALITY: i64 = 100;
pub const MIN_ZOOM_LEVELS: i64 = 1;
pub const MAX_ZOOM_LEVELS: i64 = 99;
pub const MIN_TILE_SIZE: i64 = 16;
pub const MAX_TILE_SIZE: i64 = 2048;

pub const DEFAULT_QUALITY: u8 = 90;
pub const DEFAULT_ZOOM_LEVELS: u32 = 5;
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// 瓦片输出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    Jpg,
    Png,
}

impl TileFormat {
    /// 从外部字符串解析格式（忽略大小写与首尾空白）。
    ///
    /// # 示例
    /// ```rust
    /// use tile_pyramid::tiler::TileFormat;
    ///
    /// assert_eq!(TileFormat::parse(" PNG ")?, TileFormat::Png);
    /// # Ok::<(), tile_pyramid::tiler::TileError>(())
    /// ```
    pub fn parse(format: &str) -> Result<Self, TileError> {
        match format.trim().to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            other => Err(TileError::Config(format!(
                "未知输出格式：{}（可选：jpg / png）",
                other
            ))),
        }
    }

    /// 稳定字符串，同时也是文件扩展名。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    /// 瓦片超出栅格部分的填充色：JPEG 为不透明黑，PNG 为全透明。
    pub fn fill_color(self) -> FillColor {
        match self {
            Self::Jpg => Rgba([0, 0, 0, 255]),
            Self::Png => Rgba([0, 0, 0, 0]),
        }
    }
}

/// 导出配置。
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// 输出根目录。
    pub output_dir: PathBuf,
    pub format: TileFormat,
    /// JPEG 质量（1~100），PNG 忽略。
    pub quality: u8,
    /// 缩放级别数量（≥ 1）。
    pub zoom_levels: u32,
    /// 瓦片边长（像素）。
    pub tile_size: u32,
    /// 是否生成 Leaflet 预览页。
    pub leaflet: bool,
    /// Leaflet 模板路径。
    pub leaflet_template: PathBuf,
    /// 瓦片并行线程数，0 表示使用全部可用核心。
    pub workers: usize,
    /// 逐级降采样滤镜。
    pub resize_filter: FilterType,
    /// 输入文件体积上限（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 瓦片写入遇到瞬时错误时的最大重试次数。
    pub write_retries: u32,
    /// 首次重试的等待时间（毫秒），之后指数退避。
    pub write_retry_delay_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("tiles"),
            format: TileFormat::Jpg,
            quality: DEFAULT_QUALITY,
            zoom_levels: DEFAULT_ZOOM_LEVELS,
            tile_size: DEFAULT_TILE_SIZE,
            leaflet: false,
            leaflet_template: PathBuf::from("leaflet.html"),
            workers: 0,
            resize_filter: FilterType::Triangle,
            max_file_size: 1024 * 1024 * 1024,
            max_decoded_pixels: 1_000_000_000,
            write_retries: 3,
            write_retry_delay_ms: 50,
        }
    }
}

impl ExportConfig {
    /// 校验钳制后的配置。
    pub fn validate(&self) -> Result<(), TileError> {
        if self.zoom_levels == 0 {
            return Err(TileError::Config("缩放级别数必须 ≥ 1".to_string()));
        }
        if self.tile_size == 0 {
            return Err(TileError::Config("瓦片尺寸必须为正整数".to_string()));
        }
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&(self.quality as i64)) {
            return Err(TileError::Config(format!(
                "JPEG 质量必须在 {}~{} 之间：{}",
                MIN_QUALITY, MAX_QUALITY, self.quality
            )));
        }
        Ok(())
    }

    /// 最粗级别之外的最大缩放值，即 Leaflet 的 `maxZoom`。
    pub fn max_zoom(&self) -> u32 {
        self.zoom_levels.saturating_sub(1)
    }
}

pub fn clamp_quality(quality: i64) -> u8 {
    quality.clamp(MIN_QUALITY, MAX_QUALITY) as u8
}

pub fn clamp_zoom_levels(levels: i64) -> u32 {
    levels.clamp(MIN_ZOOM_LEVELS, MAX_ZOOM_LEVELS) as u32
}

pub fn clamp_tile_size(size: i64) -> u32 {
    size.clamp(MIN_TILE_SIZE, MAX_TILE_SIZE) as u32
}

/// 默认输出目录：`tiles/yyyy_MM_dd_HHmmss`。
pub fn default_output_dir(now: NaiveDateTime) -> PathBuf {
    Path::new("tiles").join(now.format("%Y_%m_%d_%H%M%S").to_string())
}
