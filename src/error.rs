//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义进程级统一的 `AppError` 枚举，命令行入口的所有失败都收敛到这里，
//! 再按失败类别映射为不同的非零退出码，而不是“出错也返回 0”。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `TileError` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，供 `--summary-json` 输出。

use serde::Serialize;

use crate::tiler::TileError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_DECODE: i32 = 3;
pub const EXIT_ENCODE: i32 = 4;
pub const EXIT_WRITE: i32 = 5;
pub const EXIT_CANCELLED: i32 = 130;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 切片流水线错误（配置 / 解码 / 编码 / 写入 / 取消）
    #[error("{0}")]
    Tile(#[from] TileError),

    /// 输入文件不存在
    #[error("文件不存在：{0}")]
    InputNotFound(String),

    /// 配置文件不可读或格式错误
    #[error("配置文件错误：{0}")]
    ConfigFile(String),

    /// 无法注册 Ctrl-C 处理器
    #[error("信号处理初始化失败：{0}")]
    Signal(String),
}

impl AppError {
    /// 按失败类别映射进程退出码。
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Tile(TileError::Config(_)) => EXIT_CONFIG,
            Self::Tile(TileError::Decode(_)) => EXIT_DECODE,
            Self::Tile(TileError::Encode { .. }) => EXIT_ENCODE,
            Self::Tile(TileError::Write { .. }) => EXIT_WRITE,
            Self::Tile(TileError::Cancelled(_)) => EXIT_CANCELLED,
            Self::InputNotFound(_) | Self::ConfigFile(_) | Self::Signal(_) => EXIT_CONFIG,
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
