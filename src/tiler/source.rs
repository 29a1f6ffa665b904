//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“流水线中间结果”显式建模：
//! - `Raster` 表示某一缩放级别的 RGBA 像素缓冲，创建后不再修改
//! - `Pyramid` 表示按级别排列的整组 `Raster`
//! - `TileAddress` / `Tile` 表示单张瓦片的坐标与像素

use std::fmt;

use image::{Rgba, RgbaImage};

/// 单个缩放级别的像素缓冲（每通道 8 位 RGBA）。
pub type Raster = RgbaImage;

/// 瓦片边界外的填充色。
pub type FillColor = Rgba<u8>;

/// 按缩放级别排列的栅格序列。
///
/// 索引 0 为最粗级别，最后一个元素为原始分辨率。
#[derive(Debug)]
pub struct Pyramid {
    pub(crate) levels: Vec<Raster>,
}

impl Pyramid {
    /// 级别数量。
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// 获取指定级别的栅格。
    pub fn level(&self, level: usize) -> Option<&Raster> {
        self.levels.get(level)
    }

    /// 各级别尺寸，按级别升序。
    pub fn dimensions(&self) -> Vec<(u32, u32)> {
        self.levels.iter().map(|raster| raster.dimensions()).collect()
    }

    /// 从最细到最粗遍历 `(level, raster)`。
    pub fn iter_finest_first(&self) -> impl Iterator<Item = (u32, &Raster)> {
        self.levels
            .iter()
            .enumerate()
            .rev()
            .map(|(level, raster)| (level as u32, raster))
    }

    pub fn into_levels(self) -> Vec<Raster> {
        self.levels
    }
}

/// 瓦片坐标：`(level, column, row)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    pub level: u32,
    pub column: u32,
    pub row: u32,
}

impl TileAddress {
    pub fn new(level: u32, column: u32, row: u32) -> Self {
        Self { level, column, row }
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.column, self.row)
    }
}

/// 切片阶段输出：坐标 + 恰好 `tile_size × tile_size` 的像素。
pub struct Tile {
    pub address: TileAddress,
    pub pixels: Raster,
}
