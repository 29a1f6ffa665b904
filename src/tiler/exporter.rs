//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `TileExporter` 只负责流程编排，不直接与命令行绑定。
//! 处理链路固定为：
//! 1. 解码输入（失败时不产生任何输出）
//! 2. 预建输出根目录与所有级别目录
//! 3. 一次性构建整个金字塔
//! 4. 自细向粗逐级切片，级内瓦片并行编码写入
//! 5. 可选生成 Leaflet 预览页
//!
//! ## 实现思路
//!
//! - 级内使用 `rayon` 线程池并行；每个任务自行提取瓦片缓冲，不跨线程共享。
//! - 一个级别的所有写入返回后才进入下一级；任意瓦片失败即中止，错误携带坐标。
//! - `CancelToken` 在级别之间与每张瓦片之前检查，已写出的瓦片保持完整。
//! - 记录 `decode/pyramid/tiles/total` 阶段耗时，便于性能诊断。

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use super::leaflet;
use super::loader::load_raster;
use super::pyramid::build_pyramid;
use super::slicer::{TileGrid, padded_tile};
use super::source::{Tile, TileAddress};
use super::writer::TileWriter;
use super::{ExportConfig, TileError};

/// 协作式取消信号，可在线程间克隆共享。
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn check(&self, stage: &str) -> Result<(), TileError> {
        if self.is_cancelled() {
            return Err(TileError::Cancelled(format!("导出在{}阶段被取消", stage)));
        }
        Ok(())
    }
}

/// 单个级别的切片结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelSummary {
    pub level: u32,
    pub width: u32,
    pub height: u32,
    pub columns: u32,
    pub rows: u32,
}

/// 一次导出的汇总信息。
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub output_dir: String,
    pub format: &'static str,
    pub tile_size: u32,
    pub levels: Vec<LevelSummary>,
    pub tiles_written: u64,
    pub viewer: Option<String>,
    pub elapsed_ms: u128,
}

/// 导出器。
pub struct TileExporter {
    config: ExportConfig,
}

impl TileExporter {
    /// 根据配置创建导出器，配置非法时返回 `Config` 错误。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use std::path::Path;
    /// use tile_pyramid::tiler::{ExportConfig, TileExporter};
    ///
    /// let exporter = TileExporter::new(ExportConfig::default())?;
    /// let summary = exporter.export(Path::new("map.png"))?;
    /// println!("{} tiles", summary.tiles_written);
    /// # Ok::<(), tile_pyramid::tiler::TileError>(())
    /// ```
    pub fn new(config: ExportConfig) -> Result<Self, TileError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn export(&self, input: &Path) -> Result<ExportSummary, TileError> {
        self.export_with_hooks(input, |_, _| {}, &CancelToken::new())
    }

    /// 导出主入口，`on_progress(done, total)` 在每张瓦片写入后回调（可能来自工作线程）。
    pub fn export_with_hooks<P>(
        &self,
        input: &Path,
        on_progress: P,
        cancel: &CancelToken,
    ) -> Result<ExportSummary, TileError>
    where
        P: Fn(u64, u64) + Send + Sync,
    {
        let config = &self.config;
        let total_start = Instant::now();
        cancel.check("解码")?;

        let decode_start = Instant::now();
        let source = load_raster(input, config)?;
        let decode_elapsed = decode_start.elapsed();

        log::info!("📂 输出目录: {}", config.output_dir.display());
        let writer = TileWriter::from_config(config);
        writer.prepare_level_dirs(config.zoom_levels)?;

        cancel.check("降采样")?;
        let pyramid_start = Instant::now();
        let pyramid = build_pyramid(source, config.zoom_levels, config.resize_filter)?;
        let pyramid_elapsed = pyramid_start.elapsed();

        let mut levels = Vec::with_capacity(pyramid.len());
        let mut total_tiles: u64 = 0;
        for (level, raster) in pyramid.iter_finest_first() {
            let grid = TileGrid::for_raster(raster, config.tile_size)?;
            total_tiles += grid.tile_count();
            levels.push(LevelSummary {
                level,
                width: raster.width(),
                height: raster.height(),
                columns: grid.columns(),
                rows: grid.rows(),
            });
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| TileError::Config(format!("创建工作线程池失败：{}", e)))?;

        let fill = config.format.fill_color();
        let done = AtomicU64::new(0);
        let tiles_start = Instant::now();

        for (level, raster) in pyramid.iter_finest_first() {
            cancel.check("切片")?;

            let grid = TileGrid::for_raster(raster, config.tile_size)?;
            let addresses: Vec<TileAddress> = grid.addresses(level).collect();

            pool.install(|| {
                addresses.par_iter().try_for_each(|&address| {
                    cancel.check("切片")?;

                    let tile = Tile {
                        address,
                        pixels: padded_tile(raster, &grid, address.column, address.row, fill),
                    };
                    let path = writer.write(&tile)?;
                    log::debug!("🧱 瓦片已写入: {}", path.display());

                    let written = done.fetch_add(1, Ordering::Relaxed) + 1;
                    on_progress(written, total_tiles);
                    Ok::<(), TileError>(())
                })
            })
            .inspect_err(|err| {
                if let Some(address) = err.address() {
                    log::error!("❌ 瓦片 {} 处理失败，导出中止：{}", address, err);
                }
            })?;

            log::info!(
                "✅ 级别 {} 完成 - 尺寸: {}x{} 网格: {}x{}",
                level,
                raster.width(),
                raster.height(),
                grid.columns(),
                grid.rows()
            );
        }
        let tiles_elapsed = tiles_start.elapsed();

        let viewer = if config.leaflet {
            leaflet::write_viewer(
                &config.output_dir,
                &config.leaflet_template,
                config.max_zoom(),
                config.format,
                config.tile_size,
            )?
        } else {
            None
        };

        let total_elapsed = total_start.elapsed();
        log::info!(
            "✅ 导出完成 - decode={}ms pyramid={}ms tiles={}ms total={}ms",
            decode_elapsed.as_millis(),
            pyramid_elapsed.as_millis(),
            tiles_elapsed.as_millis(),
            total_elapsed.as_millis()
        );

        Ok(ExportSummary {
            output_dir: config.output_dir.display().to_string(),
            format: config.format.as_str(),
            tile_size: config.tile_size,
            levels,
            tiles_written: done.into_inner(),
            viewer: viewer.map(|path| path.display().to_string()),
            elapsed_ms: total_elapsed.as_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiler::TileFormat;
    use image::{ImageBuffer, ImageFormat, Rgba};

    fn write_input(dir: &Path, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join("input.png");
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
        })
        .save_with_format(&path, ImageFormat::Png)
        .expect("write input");
        path
    }

    #[test]
    fn cancelled_before_start_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = write_input(dir.path(), 64, 64);
        let output = dir.path().join("out");

        let exporter = TileExporter::new(ExportConfig {
            output_dir: output.clone(),
            tile_size: 16,
            zoom_levels: 2,
            ..ExportConfig::default()
        })
        .expect("exporter");

        let cancel = CancelToken::new();
        cancel.cancel();
        let result = exporter.export_with_hooks(&input, |_, _| {}, &cancel);

        assert!(matches!(result, Err(TileError::Cancelled(_))));
        assert!(!output.exists());
    }

    #[test]
    fn progress_reaches_total() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = write_input(dir.path(), 40, 24);
        let output = dir.path().join("out");

        let exporter = TileExporter::new(ExportConfig {
            output_dir: output,
            format: TileFormat::Png,
            tile_size: 16,
            zoom_levels: 2,
            workers: 2,
            ..ExportConfig::default()
        })
        .expect("exporter");

        let last = AtomicU64::new(0);
        let summary = exporter
            .export_with_hooks(
                &input,
                |done, total| {
                    assert!(done <= total);
                    last.fetch_max(done, Ordering::Relaxed);
                },
                &CancelToken::new(),
            )
            .expect("export");

        // 40x24 -> 3x2 = 6 张；20x12 -> 2x1 = 2 张
        assert_eq!(summary.tiles_written, 8);
        assert_eq!(last.into_inner(), 8);
        assert_eq!(
            summary.levels,
            vec![
                LevelSummary { level: 1, width: 40, height: 24, columns: 3, rows: 2 },
                LevelSummary { level: 0, width: 20, height: 12, columns: 2, rows: 1 },
            ]
        );
    }

    #[test]
    fn write_failure_aborts_with_failing_tile_address() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = write_input(dir.path(), 16, 32);
        let output = dir.path().join("out");
        // 第 1 级第 0 列的目录位置被普通文件占用
        std::fs::create_dir_all(output.join("1")).expect("level dir");
        std::fs::write(output.join("1").join("0"), b"blocker").expect("blocker");

        let exporter = TileExporter::new(ExportConfig {
            output_dir: output.clone(),
            format: TileFormat::Png,
            tile_size: 16,
            zoom_levels: 2,
            workers: 2,
            ..ExportConfig::default()
        })
        .expect("exporter");

        let err = exporter.export(&input).expect_err("export must fail");
        let address = err.address().expect("failure carries a tile address");

        assert!(matches!(err, TileError::Write { .. }));
        assert_eq!((address.level, address.column), (1, 0));
        assert!(address.row < 2);
        // 粗级别不会开始
        assert!(!output.join("0").join("0").exists());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let result = TileExporter::new(ExportConfig {
            zoom_levels: 0,
            ..ExportConfig::default()
        });
        assert!(matches!(result, Err(TileError::Config(_))));
    }

    #[test]
    fn missing_input_fails_before_output_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("out");
        let exporter = TileExporter::new(ExportConfig {
            output_dir: output.clone(),
            ..ExportConfig::default()
        })
        .expect("exporter");

        let result = exporter.export(&dir.path().join("missing.png"));
        assert!(matches!(result, Err(TileError::Decode(_))));
        assert!(!output.exists());
    }
}
