//! Leaflet 预览页生成。
//!
//! 模板中的 `{maxZoom}`、`{format}`、`{tileSize}` 会被替换，结果写到 `{output}/index.html`。
//! 模板缺失或不可读时只记录警告，不中断导出。

use std::fs;
use std::path::{Path, PathBuf};

use super::{TileError, TileFormat};

pub const VIEWER_FILE_NAME: &str = "index.html";

/// 替换模板占位符（所有出现处）。
pub fn render_viewer(template: &str, max_zoom: u32, format: TileFormat, tile_size: u32) -> String {
    template
        .replace("{maxZoom}", &max_zoom.to_string())
        .replace("{format}", format.as_str())
        .replace("{tileSize}", &tile_size.to_string())
}

/// 读取模板并写出预览页；模板不可用时返回 `Ok(None)`。
pub fn write_viewer(
    output_dir: &Path,
    template_path: &Path,
    max_zoom: u32,
    format: TileFormat,
    tile_size: u32,
) -> Result<Option<PathBuf>, TileError> {
    let template = match fs::read_to_string(template_path) {
        Ok(template) => template,
        Err(err) => {
            log::warn!(
                "⚠️ 无法读取 Leaflet 模板 {}，跳过生成预览页：{}",
                template_path.display(),
                err
            );
            return Ok(None);
        }
    };

    let html = render_viewer(&template, max_zoom, format, tile_size);
    let path = output_dir.join(VIEWER_FILE_NAME);
    fs::write(&path, html)
        .map_err(|e| TileError::write(None, &path, format!("写入预览页失败：{}", e)))?;

    log::info!("🗺️ 已生成预览页: {}", path.display());
    Ok(Some(path))
}
