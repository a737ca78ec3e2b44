//! 摆动分析
//! Wobble (radial run-out) analysis of a tracked marker path
//!
//! 标记随车轮旋转, 轨迹近似一个圆. 以轨迹点的算术平均为圆心,
//! 各点到圆心距离的极差 (max - min) 即为摆动量.

use serde::Serialize;

use super::tracker::Track;
use super::types::Point;

/// 计算摆动所需的最少轨迹点数 (需严格大于此值)
pub const MIN_HISTORY: usize = 10;

/// 预警比例: 摆动超过容差的 60% 即预警
pub const WARN_RATIO: f32 = 0.6;

/// 车轮状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WheelStatus {
    Ok,
    Warn,
    Alert,
}

impl WheelStatus {
    /// 按摆动量分级 (阈值有序: alert > warn > ok)
    pub fn classify(wobble_mm: f32, tolerance_mm: f32) -> Self {
        if wobble_mm > tolerance_mm {
            WheelStatus::Alert
        } else if wobble_mm > tolerance_mm * WARN_RATIO {
            WheelStatus::Warn
        } else {
            WheelStatus::Ok
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WheelStatus::Ok => "Stable",
            WheelStatus::Warn => "Warning",
            WheelStatus::Alert => "Alert",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelStatus::Ok => "ok",
            WheelStatus::Warn => "warn",
            WheelStatus::Alert => "alert",
        }
    }

    /// 状态显示颜色
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            WheelStatus::Ok => (0x23, 0x86, 0x36),
            WheelStatus::Warn => (0xD2, 0x99, 0x22),
            WheelStatus::Alert => (0xDA, 0x36, 0x33),
        }
    }
}

/// 单个车轮的分析结果 (每帧快照, 与轨迹无引用关系)
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TargetResult {
    pub id: u32,
    pub wobble_mm: f32,
    pub status: WheelStatus,
    pub trajectory: Vec<Point>,
    /// 历史不足时为 None
    pub center: Option<Point>,
    pub avg_radius: f32,
}

impl TargetResult {
    /// 当前标记位置
    pub fn current_position(&self) -> Option<Point> {
        self.trajectory.last().copied()
    }
}

/// 摆动分析器
#[derive(Clone, Copy, Debug)]
pub struct WobbleAnalyzer {
    pixels_per_mm: f32,
    tolerance_mm: f32,
}

impl WobbleAnalyzer {
    pub fn new(pixels_per_mm: f32, tolerance_mm: f32) -> Self {
        Self {
            pixels_per_mm,
            tolerance_mm,
        }
    }

    /// 分析一条轨迹 (纯函数, 不修改轨迹)
    pub fn analyze(&self, track: &Track) -> TargetResult {
        let trajectory: Vec<Point> = track.path().iter().copied().collect();

        let (wobble_mm, center, avg_radius) = if trajectory.len() > MIN_HISTORY {
            let geometry = circle_geometry(&trajectory);
            (
                geometry.wobble_px / self.pixels_per_mm,
                Some(geometry.center),
                geometry.avg_radius,
            )
        } else {
            (0.0, None, 0.0)
        };

        TargetResult {
            id: track.id(),
            wobble_mm,
            status: WheelStatus::classify(wobble_mm, self.tolerance_mm),
            trajectory,
            center,
            avg_radius,
        }
    }
}

/// 轨迹的圆几何量
#[derive(Clone, Copy, Debug)]
struct CircleGeometry {
    center: Point,
    avg_radius: f32,
    wobble_px: f32,
}

fn circle_geometry(points: &[Point]) -> CircleGeometry {
    let center = Point::mean(points.iter().copied()).unwrap_or_default();

    let mut sum = 0.0f64;
    let mut min_r = f32::INFINITY;
    let mut max_r = f32::NEG_INFINITY;
    for p in points {
        let r = p.distance(&center);
        sum += r as f64;
        min_r = min_r.min(r);
        max_r = max_r.max(r);
    }

    CircleGeometry {
        center,
        avg_radius: (sum / points.len() as f64) as f32,
        wobble_px: max_r - min_r,
    }
}
