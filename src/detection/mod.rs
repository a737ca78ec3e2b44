/// 检测系统 (Detection System)
///
/// 每帧同步执行, 负责反光标记的检测、跟踪与摆动分析
/// - BlobDetector:   亮斑检测
/// - TrackManager:   标记跟踪
/// - WobbleAnalyzer: 摆动分析
pub mod blob;
pub mod tracker;
pub mod types;
pub mod wobble;

pub use blob::BlobDetector;
pub use tracker::{AssignmentPolicy, Track, TrackManager};
pub use types::{Frame, OwnedFrame, PixelFormat, Point};
pub use wobble::{TargetResult, WheelStatus, WobbleAnalyzer};
