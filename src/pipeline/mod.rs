/// 视频处理流水线 (Video Processing Pipeline)
///
/// 双线程架构,通过crossbeam通道通信:
/// - Acquisition: 帧采集 (独立线程)
/// - Detector:    检测 → 跟踪 → 摆动分析 (逐帧同步执行)
pub mod detector;
pub mod report;

pub use detector::WobblePipeline;
pub use report::status_board;

use serde::Serialize;

use crate::detection::{OwnedFrame, TargetResult};

// ========== 线程消息类型定义 ==========

/// 采集事件 (采集线程 → 检测线程)
#[derive(Debug)]
pub enum AcquisitionEvent {
    Frame(OwnedFrame),
    EndOfStream,
    Error(String),
}

/// 单帧处理结果
#[derive(Clone, Debug, Serialize)]
pub struct FrameReport {
    pub frame_id: u64, // 对应的帧序号
    pub blob_count: usize, // 检测到的亮斑数
    pub targets: Vec<TargetResult>, // 按ID排序
    pub process_ms: f64,
}
