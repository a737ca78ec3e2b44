/// 视频输入系统 (Video Input System)
///
/// 运行在独立采集线程,负责逐帧提供像素数据
/// - SyntheticSource:     合成旋转车轮标记 (调试/演示)
/// - ImageSequenceSource: 目录中的图片序列
pub mod image_sequence;
pub mod synthetic;

pub use image_sequence::ImageSequenceSource;
pub use synthetic::{SyntheticSource, SyntheticWheel};

use crate::detection::OwnedFrame;
use crate::error::Result;

/// 帧源接口
pub trait FrameSource: Send {
    /// 下一帧; `Ok(None)` 表示流结束
    fn next_frame(&mut self) -> Result<Option<OwnedFrame>>;

    /// 输入源名称 (日志用)
    fn name(&self) -> &str;
}

/// 按帧率换算时间戳 (毫秒)
pub(crate) fn frame_timestamp(frame_id: u64, fps: f64) -> u64 {
    if fps <= 0.0 {
        return 0;
    }
    (frame_id as f64 * 1000.0 / fps).round() as u64
}
