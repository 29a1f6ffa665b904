//! # 金字塔构建模块
//!
//! ## 设计思路
//!
//! 金字塔是一个纯函数的产物：输入全分辨率栅格与级别数，输出按级别排列的栅格序列。
//! 每一级都由更细一级“向上取整减半”得到，且每次降采样都生成新的缓冲，
//! 不在共享画布上原地修改。
//!
//! ## 实现思路
//!
//! 1. 最细级别直接移动源栅格，不做拷贝
//! 2. 自细向粗逐级计算 `ceil(w/2) × ceil(h/2)`
//! 3. 使用 `fast_image_resize` 卷积降采样（默认双线性，含 alpha 预乘）
//! 4. 快速路径失败时回退 `image::imageops::resize`
//! 5. 尺寸已触底（1×1 或单边为 1 且不再变化）时直接克隆

use fast_image_resize as fr;
use image::imageops::FilterType;

use super::TileError;
use super::source::{Pyramid, Raster};

/// 计算各级别尺寸，索引即缩放级别（0 为最粗）。
///
/// `levels` 为 0 时返回空序列。
pub fn level_dimensions(width: u32, height: u32, levels: u32) -> Vec<(u32, u32)> {
    let mut dims = Vec::with_capacity(levels as usize);
    let mut current = (width, height);
    for _ in 0..levels {
        dims.push(current);
        current = (current.0.div_ceil(2), current.1.div_ceil(2));
    }
    dims.reverse();
    dims
}

/// 从全分辨率栅格构建 `levels` 级金字塔。
pub fn build_pyramid(
    source: Raster,
    levels: u32,
    filter: FilterType,
) -> Result<Pyramid, TileError> {
    if levels == 0 {
        return Err(TileError::Config("缩放级别数必须 ≥ 1".to_string()));
    }

    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(TileError::Decode(format!("源图尺寸无效：{}x{}", width, height)));
    }

    // 自细向粗收集，最后反转为按级别升序。
    let mut finest_first: Vec<Raster> = Vec::with_capacity(levels as usize);
    finest_first.push(source);

    for level in (0..levels - 1).rev() {
        let finer = &finest_first[finest_first.len() - 1];
        let (finer_width, finer_height) = finer.dimensions();
        let target_width = finer_width.div_ceil(2);
        let target_height = finer_height.div_ceil(2);

        let coarser = if (target_width, target_height) == (finer_width, finer_height) {
            finer.clone()
        } else {
            downsample(finer, target_width, target_height, filter)?
        };

        log::debug!(
            "🧩 级别 {}：{}x{} -> {}x{}",
            level,
            finer_width,
            finer_height,
            target_width,
            target_height
        );
        finest_first.push(coarser);
    }

    finest_first.reverse();
    Ok(Pyramid {
        levels: finest_first,
    })
}

/// 将栅格缩放到目标尺寸，优先走 `fast_image_resize`。
fn downsample(
    raster: &Raster,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<Raster, TileError> {
    match resize_with_fast_image_resize(raster, target_width, target_height, filter) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!(
                "⚠️ fast_image_resize 降采样失败，回退 image::imageops::resize：{}",
                err
            );
            Ok(image::imageops::resize(
                raster,
                target_width,
                target_height,
                filter,
            ))
        }
    }
}

fn resize_with_fast_image_resize(
    raster: &Raster,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<Raster, TileError> {
    let (src_width, src_height) = raster.dimensions();

    let src_image = fr::images::ImageRef::new(
        src_width,
        src_height,
        raster.as_raw(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| TileError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| TileError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    Raster::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| TileError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}
