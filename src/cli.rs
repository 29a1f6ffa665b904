//! # 命令行层
//!
//! ## 设计思路
//!
//! 命令行层只做参数接收、边界校验与数值钳制，不承载切片逻辑。
//! 所有实际处理交由 `TileExporter`，保持入口薄、稳定、易测试。
//!
//! ## 实现思路
//!
//! - 选项名与短别名保持兼容：`--input/--i`、`--output/--o`、`--format/--f`、
//!   `--quality/--q`、`--zoomlevels/--z`、`--tilesize/--s`、`--leaflet`。
//! - 数值按有符号整数解析，越界值钳制到文档范围而不是报错。
//! - `--config` 指向的 JSON 文件提供默认值，命令行显式给出的值优先。

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::Parser;
use serde::Deserialize;

use crate::error::AppError;
use crate::tiler::{
    CancelToken, DEFAULT_QUALITY, DEFAULT_TILE_SIZE, DEFAULT_ZOOM_LEVELS, ExportConfig,
    ExportSummary, TileExporter, TileFormat, clamp_quality, clamp_tile_size, clamp_zoom_levels,
    default_output_dir,
};

#[derive(Parser, Debug)]
#[command(name = "tile-pyramid", version)]
#[command(about = "Convert an image to Leaflet compatible map tiles.", long_about = None)]
pub struct Args {
    /// Input file
    #[arg(long = "input", visible_alias = "i", value_name = "PATH")]
    pub input: PathBuf,

    /// Output folder [default: tiles/<yyyy_MM_dd_HHmmss>]
    #[arg(long = "output", visible_alias = "o", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Output file format (jpg, png) [default: jpg]
    #[arg(long = "format", visible_alias = "f")]
    pub format: Option<String>,

    /// JPEG quality (1, 100) [default: 90]
    #[arg(long = "quality", visible_alias = "q", allow_negative_numbers = true)]
    pub quality: Option<i64>,

    /// Number of zoom levels (1, 99) [default: 5]
    #[arg(long = "zoomlevels", visible_alias = "z", allow_negative_numbers = true)]
    pub zoom_levels: Option<i64>,

    /// Tile size (min: 16, max: 2048) [default: 256]
    #[arg(long = "tilesize", visible_alias = "s", allow_negative_numbers = true)]
    pub tile_size: Option<i64>,

    /// Write a Leaflet index.html next to the tiles
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub leaflet: Option<bool>,

    /// Leaflet template file [default: leaflet.html]
    #[arg(long, value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Worker threads for tile encoding, 0 = all cores [default: 0]
    #[arg(long)]
    pub workers: Option<usize>,

    /// JSON file with default option values
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the export summary as JSON
    #[arg(long)]
    pub summary_json: bool,
}

/// `--config` 文件内容，字段与命令行选项同名。
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileOptions {
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub quality: Option<i64>,
    pub zoomlevels: Option<i64>,
    pub tilesize: Option<i64>,
    pub leaflet: Option<bool>,
    pub template: Option<PathBuf>,
    pub workers: Option<usize>,
}

pub fn load_file_options(path: &Path) -> Result<FileOptions, AppError> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::ConfigFile(format!("无法读取 {}：{}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::ConfigFile(format!("解析 {} 失败：{}", path.display(), e)))
}

impl Args {
    /// 合并命令行与配置文件，完成校验与钳制，得到输入路径与导出配置。
    pub fn resolve(
        &self,
        file: FileOptions,
        now: NaiveDateTime,
    ) -> Result<(PathBuf, ExportConfig), AppError> {
        if !self.input.is_file() {
            return Err(AppError::InputNotFound(self.input.display().to_string()));
        }

        let format = self
            .format
            .clone()
            .or(file.format)
            .map(|f| TileFormat::parse(&f))
            .transpose()?
            .unwrap_or(TileFormat::Jpg);

        let quality = self.quality.or(file.quality).unwrap_or(DEFAULT_QUALITY as i64);
        let zoom_levels = self
            .zoom_levels
            .or(file.zoomlevels)
            .unwrap_or(DEFAULT_ZOOM_LEVELS as i64);
        let tile_size = self
            .tile_size
            .or(file.tilesize)
            .unwrap_or(DEFAULT_TILE_SIZE as i64);

        let defaults = ExportConfig::default();
        let config = ExportConfig {
            output_dir: self
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| default_output_dir(now)),
            format,
            quality: clamp_quality(quality),
            zoom_levels: clamp_zoom_levels(zoom_levels),
            tile_size: clamp_tile_size(tile_size),
            leaflet: self.leaflet.or(file.leaflet).unwrap_or(false),
            leaflet_template: self
                .template
                .clone()
                .or(file.template)
                .unwrap_or(defaults.leaflet_template.clone()),
            workers: self.workers.or(file.workers).unwrap_or(defaults.workers),
            ..defaults
        };

        Ok((self.input.clone(), config))
    }
}

/// 执行一次完整导出。
///
/// 取消信号由调用方持有（通常在 `main` 中挂到 Ctrl-C 上）。
pub fn run(args: &Args, now: NaiveDateTime, cancel: &CancelToken) -> Result<ExportSummary, AppError> {
    let file_options = match &args.config {
        Some(path) => load_file_options(path)?,
        None => FileOptions::default(),
    };

    let (input, config) = args.resolve(file_options, now)?;
    log::info!(
        "⚙️ 导出参数 - format={} quality={} zoomlevels={} tilesize={} leaflet={}",
        config.format.as_str(),
        config.quality,
        config.zoom_levels,
        config.tile_size,
        config.leaflet
    );

    let exporter = TileExporter::new(config)?;
    let summary = exporter.export_with_hooks(&input, log_progress, cancel)?;
    Ok(summary)
}

/// 每跨过 10% 记录一次进度。
fn log_progress(done: u64, total: u64) {
    if total == 0 {
        return;
    }
    let step = (total / 10).max(1);
    if done % step == 0 || done == total {
        log::info!("⏳ 进度 {}/{}（{}%）", done, total, done * 100 / total);
    }
}
