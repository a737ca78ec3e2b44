//! 检测器 (Detector)
//! 职责: 像素帧 → 亮斑检测 → 标记跟踪 → 摆动分析 → FrameReport

use std::time::Instant;

use tracing::{debug, info, warn};

use super::FrameReport;
use crate::config::WobbleSettings;
use crate::detection::{
    AssignmentPolicy, BlobDetector, Frame, TargetResult, TrackManager, WobbleAnalyzer,
};
use crate::error::Result;

/// 摆动检测流水线 (轨迹状态的唯一持有者)
pub struct WobblePipeline {
    settings: WobbleSettings,
    detector: BlobDetector,
    tracks: TrackManager,
    analyzer: WobbleAnalyzer,

    // 统计
    frame_count: u64,
}

impl WobblePipeline {
    pub fn new(settings: WobbleSettings) -> Result<Self> {
        Self::with_policy(settings, AssignmentPolicy::default())
    }

    pub fn with_policy(settings: WobbleSettings, policy: AssignmentPolicy) -> Result<Self> {
        settings.validate()?;
        info!("🎯 跟踪策略: {:?}", policy);
        Ok(Self {
            detector: BlobDetector::new(settings.brightness_threshold),
            tracks: TrackManager::with_policy(settings.max_wheels, settings.history_length, policy),
            analyzer: WobbleAnalyzer::new(settings.pixels_per_mm, settings.wobble_tolerance_mm),
            settings,
            frame_count: 0,
        })
    }

    pub fn settings(&self) -> &WobbleSettings {
        &self.settings
    }

    pub fn track_count(&self) -> usize {
        self.tracks.track_count()
    }

    /// 应用新配置 (校验失败时保留旧配置继续运行)
    pub fn apply_settings(&mut self, settings: WobbleSettings) -> Result<()> {
        if let Err(e) = settings.validate() {
            warn!("⚠️  配置被拒绝, 继续使用旧配置: {}", e);
            return Err(e);
        }

        self.detector.set_threshold(settings.brightness_threshold);
        self.tracks.set_max_tracks(settings.max_wheels);
        self.tracks.set_history_length(settings.history_length);
        self.analyzer = WobbleAnalyzer::new(settings.pixels_per_mm, settings.wobble_tolerance_mm);
        self.settings = settings;
        info!("✅ 新配置已生效");
        Ok(())
    }

    /// 清除所有轨迹 (停止监测)
    pub fn reset(&mut self) {
        self.tracks.reset();
        info!("🔄 轨迹已清空");
    }

    /// 处理一帧
    ///
    /// # 参数
    /// - `frame`: 像素帧视图
    /// - `now_ms`: 当前时间 (毫秒), 用于轨迹过期判定
    pub fn process_frame(&mut self, frame: &Frame, now_ms: u64) -> FrameReport {
        let start = Instant::now();

        // 1. 亮斑检测
        let centroids = self.detector.detect(frame);

        // 2. 跟踪
        let tracks = self.tracks.update(&centroids, now_ms);

        // 3. 摆动分析
        let mut targets: Vec<TargetResult> =
            tracks.iter().map(|t| self.analyzer.analyze(t)).collect();
        targets.sort_by_key(|t| t.id);

        let process_ms = start.elapsed().as_secs_f64() * 1000.0;
        let frame_id = self.frame_count;
        self.frame_count += 1;

        debug!(
            "🧮 帧 #{}: 亮斑 {} | 轨迹 {} | 耗时 {:.2}ms",
            frame_id,
            centroids.len(),
            targets.len(),
            process_ms
        );

        FrameReport {
            frame_id,
            blob_count: centroids.len(),
            targets,
            process_ms,
        }
    }

    /// 处理原始缓冲区 (先校验尺寸, 不合法时不修改任何状态)
    pub fn process_buffer(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        format: crate::detection::PixelFormat,
        now_ms: u64,
    ) -> Result<FrameReport> {
        let frame = Frame::new(data, width, height, format)?;
        Ok(self.process_frame(&frame, now_ms))
    }
}
