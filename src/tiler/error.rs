//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载切片链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 单张瓦片的编码/写入失败会携带 `TileAddress`，便于定位是哪一张瓦片出错。

use super::source::TileAddress;

/// 切片处理统一错误类型。
///
/// 该类型会在入口层被上转为 `AppError`，并映射为进程退出码。
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("配置错误：{0}")]
    Config(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：瓦片 {address}：{message}")]
    Encode { address: TileAddress, message: String },

    #[error("写入错误：{path}：{message}")]
    Write {
        address: Option<TileAddress>,
        path: String,
        message: String,
    },

    #[error("已取消：{0}")]
    Cancelled(String),
}

impl TileError {
    /// 稳定的错误码，供日志检索与摘要输出。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Decode(_) => "decode",
            Self::Encode { .. } => "encode",
            Self::Write { .. } => "write",
            Self::Cancelled(_) => "cancelled",
        }
    }

    /// 出错的瓦片坐标（若有）。
    pub fn address(&self) -> Option<TileAddress> {
        match self {
            Self::Encode { address, .. } => Some(*address),
            Self::Write { address, .. } => *address,
            _ => None,
        }
    }

    pub(crate) fn write(
        address: Option<TileAddress>,
        path: &std::path::Path,
        message: impl Into<String>,
    ) -> Self {
        Self::Write {
            address,
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}
