//! # 切片模块
//!
//! ## 设计思路
//!
//! 给定某一级的栅格和瓦片边长 `S`，网格为 `ceil(W/S) × ceil(H/S)`。
//! 每个格子 `(x, y)` 对应源像素矩形 `[x·S, (x+1)·S) × [y·S, (y+1)·S)`，
//! 并裁剪到栅格范围内；瓦片中落在栅格之外的部分用填充色补齐，
//! 因此输出瓦片永远是恰好 `S × S`。
//!
//! 遍历顺序为行优先（先第 0 行的所有列，再第 1 行）。
//! 路径只依赖 `(column, row)`，与遍历顺序无关。
//!
//! 本模块不做任何 I/O。

use super::TileError;
use super::source::{FillColor, Raster, Tile, TileAddress};

/// 源栅格中被某张瓦片覆盖的矩形（已裁剪）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// 单个级别的瓦片网格。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_size: u32,
    columns: u32,
    rows: u32,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, tile_size: u32) -> Result<Self, TileError> {
        if tile_size == 0 {
            return Err(TileError::Config("瓦片尺寸必须为正整数".to_string()));
        }

        Ok(Self {
            width,
            height,
            tile_size,
            columns: width.div_ceil(tile_size),
            rows: height.div_ceil(tile_size),
        })
    }

    pub fn for_raster(raster: &Raster, tile_size: u32) -> Result<Self, TileError> {
        let (width, height) = raster.dimensions();
        Self::new(width, height, tile_size)
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn tile_count(&self) -> u64 {
        self.columns as u64 * self.rows as u64
    }

    /// 瓦片覆盖的源矩形；坐标超出网格时返回 `None`。
    pub fn source_rect(&self, column: u32, row: u32) -> Option<PixelRect> {
        if column >= self.columns || row >= self.rows {
            return None;
        }

        let x = column * self.tile_size;
        let y = row * self.tile_size;
        Some(PixelRect {
            x,
            y,
            width: self.tile_size.min(self.width - x),
            height: self.tile_size.min(self.height - y),
        })
    }

    /// 行优先遍历本级所有瓦片坐标。
    pub fn addresses(&self, level: u32) -> impl Iterator<Item = TileAddress> + use<> {
        let columns = self.columns;
        (0..self.rows)
            .flat_map(move |row| (0..columns).map(move |column| TileAddress::new(level, column, row)))
    }

    /// 网格是否按该栅格的尺寸建立。
    pub fn matches(&self, raster: &Raster) -> bool {
        raster.dimensions() == (self.width, self.height)
    }
}

/// 从栅格中提取一张 `tile_size × tile_size` 的瓦片。
///
/// 超出栅格的像素为 `fill`；坐标完全在网格外时得到一张纯填充色瓦片。
/// 网格必须由同尺寸的栅格建立，否则返回 `TileError::Config`。
pub fn extract_tile(
    raster: &Raster,
    grid: &TileGrid,
    column: u32,
    row: u32,
    fill: FillColor,
) -> Result<Raster, TileError> {
    if !grid.matches(raster) {
        let (width, height) = raster.dimensions();
        return Err(TileError::Config(format!(
            "瓦片网格（{}x{}）与栅格尺寸（{}x{}）不一致",
            grid.width, grid.height, width, height
        )));
    }

    Ok(padded_tile(raster, grid, column, row, fill))
}

/// 调用方保证 `grid` 与 `raster` 尺寸一致。
pub(crate) fn padded_tile(
    raster: &Raster,
    grid: &TileGrid,
    column: u32,
    row: u32,
    fill: FillColor,
) -> Raster {
    let size = grid.tile_size();
    let mut tile = Raster::from_pixel(size, size, fill);

    let Some(rect) = grid.source_rect(column, row) else {
        return tile;
    };

    let src = raster.as_raw();
    let src_stride = raster.width() as usize * 4;
    let dst_stride = size as usize * 4;
    let span = rect.width as usize * 4;
    let dst: &mut [u8] = &mut tile;

    for dy in 0..rect.height as usize {
        let src_start = (rect.y as usize + dy) * src_stride + rect.x as usize * 4;
        let dst_start = dy * dst_stride;
        dst[dst_start..dst_start + span].copy_from_slice(&src[src_start..src_start + span]);
    }

    tile
}

/// 惰性地按行优先顺序产出本级所有瓦片。
pub fn tiles_for(
    raster: &Raster,
    level: u32,
    tile_size: u32,
    fill: FillColor,
) -> Result<impl Iterator<Item = Tile> + '_, TileError> {
    let grid = TileGrid::for_raster(raster, tile_size)?;
    Ok(grid.addresses(level).map(move |address| Tile {
        address,
        pixels: padded_tile(raster, &grid, address.column, address.row, fill),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn gradient(width: u32, height: u32) -> Raster {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 7, 255])
        })
    }

    const BLACK: FillColor = Rgba([0, 0, 0, 255]);
    const CLEAR: FillColor = Rgba([0, 0, 0, 0]);

    #[test]
    fn grid_uses_ceiling_division() {
        let grid = TileGrid::new(300, 200, 256).expect("grid");
        assert_eq!((grid.columns(), grid.rows()), (2, 1));

        let grid = TileGrid::new(150, 100, 256).expect("grid");
        assert_eq!((grid.columns(), grid.rows()), (1, 1));

        let grid = TileGrid::new(512, 513, 256).expect("grid");
        assert_eq!((grid.columns(), grid.rows()), (2, 3));
    }

    #[test]
    fn zero_tile_size_is_rejected() {
        assert!(matches!(TileGrid::new(10, 10, 0), Err(TileError::Config(_))));
    }

    #[test]
    fn addresses_are_row_major() {
        let grid = TileGrid::new(40, 30, 16).expect("grid");
        let order: Vec<(u32, u32)> = grid.addresses(3).map(|a| (a.column, a.row)).collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn every_tile_is_full_size_and_count_matches() {
        let raster = gradient(70, 33);
        let tiles: Vec<Tile> = tiles_for(&raster, 0, 16, BLACK).expect("tiles").collect();

        assert_eq!(tiles.len(), 5 * 3);
        for tile in &tiles {
            assert_eq!(tile.pixels.dimensions(), (16, 16));
            assert_eq!(tile.address.level, 0);
        }
    }

    #[test]
    fn every_source_pixel_is_covered_exactly_once() {
        let (width, height) = (70u32, 33u32);
        let grid = TileGrid::new(width, height, 16).expect("grid");
        let mut hits = vec![0u8; (width * height) as usize];

        for address in grid.addresses(0) {
            let rect = grid.source_rect(address.column, address.row).expect("rect");
            for y in rect.y..rect.y + rect.height {
                for x in rect.x..rect.x + rect.width {
                    hits[(y * width + x) as usize] += 1;
                }
            }
        }

        assert!(hits.iter().all(|&h| h == 1));
    }

    #[test]
    fn interior_pixels_match_source() {
        let raster = gradient(300, 200);
        let grid = TileGrid::for_raster(&raster, 256).expect("grid");

        let tile = extract_tile(&raster, &grid, 1, 0, BLACK).expect("extract");
        // 第 1 列瓦片的 (0, 0) 对应源图 (256, 0)
        assert_eq!(tile.get_pixel(0, 0), raster.get_pixel(256, 0));
        assert_eq!(tile.get_pixel(43, 199), raster.get_pixel(299, 199));
    }

    #[test]
    fn edge_tiles_are_padded_with_fill_color() {
        let raster = gradient(300, 200);
        let grid = TileGrid::for_raster(&raster, 256).expect("grid");

        let tile = extract_tile(&raster, &grid, 1, 0, BLACK).expect("extract");
        // 源图只有 300 列，瓦片第 44 列起为填充
        assert_eq!(tile.get_pixel(44, 0), &BLACK);
        assert_eq!(tile.get_pixel(255, 255), &BLACK);
        // 源图只有 200 行
        assert_eq!(tile.get_pixel(0, 200), &BLACK);

        let tile = extract_tile(&raster, &grid, 1, 0, CLEAR).expect("extract");
        assert_eq!(tile.get_pixel(100, 10), &CLEAR);
    }

    #[test]
    fn out_of_grid_tile_is_pure_fill() {
        let raster = gradient(20, 20);
        let grid = TileGrid::for_raster(&raster, 16).expect("grid");

        let tile = extract_tile(&raster, &grid, 5, 5, CLEAR).expect("extract");
        assert!(tile.pixels().all(|p| *p == CLEAR));
    }

    #[test]
    fn grid_built_for_another_raster_is_rejected() {
        let raster = gradient(20, 20);
        let grid = TileGrid::new(300, 200, 16).expect("grid");
        assert!(!grid.matches(&raster));

        let result = extract_tile(&raster, &grid, 1, 1, CLEAR);
        assert!(matches!(result, Err(TileError::Config(_))));
    }

    #[test]
    fn single_pixel_raster_yields_one_padded_tile() {
        let raster = Raster::from_pixel(1, 1, Rgba([9, 8, 7, 255]));
        let tiles: Vec<Tile> = tiles_for(&raster, 0, 16, CLEAR).expect("tiles").collect();

        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].pixels.get_pixel(0, 0), &Rgba([9, 8, 7, 255]));
        assert_eq!(tiles[0].pixels.get_pixel(1, 0), &CLEAR);
    }
}
