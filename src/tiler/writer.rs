//! # 瓦片写入模块
//!
//! ## 设计思路
//!
//! 把“像素 → 编码字节 → 磁盘文件”集中在这里，路径规则是对外契约：
//! `{root}/{level}/{column}/{row}.{ext}`，查看器只凭坐标与格式即可拼出地址。
//!
//! ## 实现思路
//!
//! - JPEG：先把 RGBA 合成到黑底得到 RGB，再按质量编码（质量钳制到 1~100）。
//! - PNG：无损保存 RGBA，忽略质量参数。
//! - 写入：确保父目录存在 → 写临时文件 → 重命名到最终路径，单文件粒度原子。
//! - 瞬时 I/O 错误（中断 / 忙 / 超时）有限次指数退避重试，其余错误立即返回。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};

use super::source::{Raster, Tile, TileAddress};
use super::{ExportConfig, TileError, TileFormat};

const RETRY_MAX_DELAY_MS: u64 = 2_000;

/// 瓦片文件路径。
pub fn tile_path(root: &Path, address: TileAddress, format: TileFormat) -> PathBuf {
    root.join(address.level.to_string())
        .join(address.column.to_string())
        .join(format!("{}.{}", address.row, format.extension()))
}

/// 按格式编码一张瓦片。
pub fn encode_tile(tile: &Tile, format: TileFormat, quality: u8) -> Result<Vec<u8>, TileError> {
    let (width, height) = tile.pixels.dimensions();
    let mut bytes = Vec::new();

    let result = match format {
        TileFormat::Jpg => {
            let rgb = flatten_onto_black(&tile.pixels);
            JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        TileFormat::Png => PngEncoder::new(&mut bytes).write_image(
            tile.pixels.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };

    result.map_err(|e| TileError::Encode {
        address: tile.address,
        message: e.to_string(),
    })?;

    Ok(bytes)
}

/// 将 RGBA 合成到不透明黑底。
fn flatten_onto_black(pixels: &Raster) -> RgbImage {
    RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b, a] = pixels.get_pixel(x, y).0;
        let scale = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
        Rgb([scale(r), scale(g), scale(b)])
    })
}

/// 瓦片写入器。
///
/// 不持有可变状态，可在多个工作线程间共享引用。
#[derive(Debug, Clone)]
pub struct TileWriter {
    root: PathBuf,
    format: TileFormat,
    quality: u8,
    retries: u32,
    retry_delay_ms: u64,
}

impl TileWriter {
    pub fn new(root: impl Into<PathBuf>, format: TileFormat, quality: u8) -> Self {
        Self {
            root: root.into(),
            format,
            quality,
            retries: 0,
            retry_delay_ms: 0,
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(&config.output_dir, config.format, config.quality)
            .with_retry(config.write_retries, config.write_retry_delay_ms)
    }

    pub fn with_retry(mut self, retries: u32, retry_delay_ms: u64) -> Self {
        self.retries = retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, address: TileAddress) -> PathBuf {
        tile_path(&self.root, address, self.format)
    }

    /// 预先创建输出根目录与每个级别目录（即使某级最终没有瓦片）。
    pub fn prepare_level_dirs(&self, levels: u32) -> Result<(), TileError> {
        for level in 0..levels {
            let dir = self.root.join(level.to_string());
            fs::create_dir_all(&dir)
                .map_err(|e| TileError::write(None, &dir, format!("创建级别目录失败：{}", e)))?;
        }
        Ok(())
    }

    /// 编码并写入一张瓦片，返回最终路径。
    pub fn write(&self, tile: &Tile) -> Result<PathBuf, TileError> {
        let bytes = encode_tile(tile, self.format, self.quality)?;
        let path = self.path_for(tile.address);
        self.write_with_retry(tile.address, path, &bytes, write_atomically)
    }

    /// 执行写入步骤，瞬时错误按退避策略重试，其余错误立即返回。
    fn write_with_retry<F>(
        &self,
        address: TileAddress,
        path: PathBuf,
        bytes: &[u8],
        mut write_step: F,
    ) -> Result<PathBuf, TileError>
    where
        F: FnMut(&Path, &[u8]) -> io::Result<()>,
    {
        let mut attempt: u32 = 0;
        loop {
            match write_step(&path, bytes) {
                Ok(()) => return Ok(path),
                Err(err) if attempt < self.retries && is_transient(&err) => {
                    attempt += 1;
                    let delay_ms = backoff_delay(self.retry_delay_ms, attempt);
                    log::warn!(
                        "⚠️ 瓦片 {} 写入失败（第 {}/{} 次，可重试）：{}；{}ms 后重试",
                        address,
                        attempt,
                        self.retries,
                        err,
                        delay_ms
                    );
                    thread::sleep(Duration::from_millis(delay_ms));
                }
                Err(err) => {
                    return Err(TileError::write(Some(address), &path, err.to_string()));
                }
            }
        }
    }
}

/// 先写临时文件再重命名，避免留下半截瓦片。
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = fs::write(&tmp_path, bytes).and_then(|_| fs::rename(&tmp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::ResourceBusy
    )
}

fn backoff_delay(base_delay_ms: u64, attempt: u32) -> u64 {
    base_delay_ms
        .saturating_mul(1_u64 << attempt.saturating_sub(1).min(8))
        .min(RETRY_MAX_DELAY_MS.max(base_delay_ms))
}
