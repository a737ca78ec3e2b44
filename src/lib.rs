// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod advisory; // 远程诊断
pub mod config; // 监测参数配置
pub mod detection; // 检测、跟踪、摆动分析
pub mod error; // 错误类型
pub mod input; // 视频输入系统
pub mod pipeline; // 逐帧处理流水线
pub mod renderer; // 叠加绘制

pub use crate::config::WobbleSettings;
pub use crate::detection::{
    AssignmentPolicy, BlobDetector, Frame, OwnedFrame, PixelFormat, Point, TargetResult, Track,
    TrackManager, WheelStatus, WobbleAnalyzer,
};
pub use crate::error::{Result, WobbleError};
pub use crate::pipeline::{FrameReport, WobblePipeline};

/// 带分隔符的时间字符串 (用于输出文件名)
pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%3f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}
