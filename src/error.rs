//! 统一错误类型
//! Unified error type for the wobble monitor

use thiserror::Error;

/// 摆动监测错误
#[derive(Debug, Error)]
pub enum WobbleError {
    /// 像素缓冲区与宽高/通道数不一致 (InputError)
    #[error("invalid frame {width}x{height} ({channels} ch): expected {expected} bytes, got {actual}")]
    InvalidFrame {
        width: u32,
        height: u32,
        channels: usize,
        expected: usize,
        actual: usize,
    },

    /// 配置参数越界 (ConfigurationError)
    #[error("invalid setting `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// 远程诊断失败
    #[error("diagnosis failed: {0}")]
    Advisory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl WobbleError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WobbleError>;
