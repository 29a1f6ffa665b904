//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 负责把输入文件变成全分辨率 `Raster`，并在“尽可能早”的阶段执行输入校验。
//! 目标是尽快失败：任何解码问题都发生在写出第一张瓦片之前。
//!
//! ## 实现思路
//!
//! 1. 存在性 + metadata 体积限制
//! 2. 读取字节，`infer` 识别出非图片签名时直接拒绝
//! 3. 只读 header 取尺寸，按像素上限快速拒绝
//! 4. 完整解码并转换为 RGBA

use std::io::Cursor;
use std::path::Path;

use super::source::Raster;
use super::{ExportConfig, TileError};

/// 从本地路径加载并解码输入图片。
pub fn load_raster(path: &Path, config: &ExportConfig) -> Result<Raster, TileError> {
    log::info!("📁 开始读取输入图片 - 路径: {}", path.display());

    if !path.is_file() {
        return Err(TileError::Decode(format!("文件不存在：{}", path.display())));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| TileError::Decode(format!("无法读取文件信息：{}", e)))?;

    if metadata.len() > config.max_file_size {
        return Err(TileError::Decode(format!(
            "文件过大：{:.2} MB（限制：{:.2} MB）",
            metadata.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let bytes =
        std::fs::read(path).map_err(|e| TileError::Decode(format!("无法读取图片文件：{}", e)))?;

    decode_raster(&bytes, config)
}

/// 将内存中的图片字节解码为 RGBA 栅格。
pub fn decode_raster(bytes: &[u8], config: &ExportConfig) -> Result<Raster, TileError> {
    validate_image_signature(bytes)?;

    let (header_width, header_height) = inspect_dimensions(bytes)?;
    validate_pixel_limits(config, header_width, header_height)?;

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| TileError::Decode(format!("图片解码失败：{}", e)))?;
    let raster = decoded.to_rgba8();

    let (width, height) = raster.dimensions();
    if width == 0 || height == 0 {
        return Err(TileError::Decode(format!("图片尺寸无效：{}x{}", width, height)));
    }

    log::info!("✅ 图片解码成功 - 尺寸: {}x{}", width, height);
    Ok(raster)
}

fn validate_image_signature(bytes: &[u8]) -> Result<(), TileError> {
    if bytes.is_empty() {
        return Err(TileError::Decode("图片内容为空".to_string()));
    }

    // `infer` 不认识的签名（PNM、QOI 等）交给 `image` 自行识别格式。
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() != infer::MatcherType::Image => Err(TileError::Decode(
            format!("文件签名不是图片类型：{}", kind.mime_type()),
        )),
        _ => Ok(()),
    }
}

/// 仅通过图片头信息读取宽高。
fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), TileError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| TileError::Decode(format!("无法识别图片格式：{}", e)))?;

    reader
        .into_dimensions()
        .map_err(|e| TileError::Decode(format!("无法读取图片尺寸：{}", e)))
}

fn validate_pixel_limits(config: &ExportConfig, width: u32, height: u32) -> Result<(), TileError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| TileError::Decode("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(TileError::Decode(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}
