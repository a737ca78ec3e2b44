//! 反光标记检测 (亮斑连通域)
//! Bright-blob detection for reflective wheel markers
//!
//! 流程:
//! 1. 亮度阈值: 三通道平均值 > 阈值 的像素视为亮点
//! 2. 连通域: BFS生长, 坐标差在 ±LINK_RADIUS 以内即视为相邻
//!    (反光贴纸光照不均, 亮点常呈斑点状, 严格8邻域会把一个标记拆碎)
//! 3. 噪声过滤: 像素数不超过5的连通域丢弃
//! 4. 输出每个连通域的质心

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::types::{Frame, Point};
use crate::error::Result;

/// 邻接半径 (像素), 两个亮点坐标在每个轴上相差不超过此值即连通
pub const LINK_RADIUS: i32 = 5;

/// 有效连通域最少像素数
pub const MIN_BLOB_PIXELS: usize = 6;

/// 亮斑检测器
#[derive(Clone, Debug)]
pub struct BlobDetector {
    threshold: f32,
    link_radius: i32,
    min_pixels: usize,
}

impl BlobDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            link_radius: LINK_RADIUS,
            min_pixels: MIN_BLOB_PIXELS,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// 检测当前帧中的所有亮斑质心 (顺序不保证)
    pub fn detect(&self, frame: &Frame) -> Vec<Point> {
        if frame.is_empty() {
            return Vec::new();
        }
        let bright = self.bright_pixels(frame);
        if bright.is_empty() {
            return Vec::new();
        }

        // 空间索引: 尚未访问的亮点集合, 入队即移除 (兼作visited标记)
        let mut unvisited: HashSet<(i32, i32)> = bright.iter().copied().collect();
        let mut queue = VecDeque::new();
        let mut centroids = Vec::new();
        let r = self.link_radius;

        for &seed in &bright {
            if !unvisited.remove(&seed) {
                continue;
            }

            queue.push_back(seed);
            let (mut sum_x, mut sum_y, mut count) = (0u64, 0u64, 0usize);

            while let Some((x, y)) = queue.pop_front() {
                sum_x += x as u64;
                sum_y += y as u64;
                count += 1;

                for dy in -r..=r {
                    for dx in -r..=r {
                        let neighbor = (x + dx, y + dy);
                        if unvisited.remove(&neighbor) {
                            queue.push_back(neighbor);
                        }
                    }
                }
            }

            if count >= self.min_pixels {
                centroids.push(Point::new(
                    (sum_x as f64 / count as f64) as f32,
                    (sum_y as f64 / count as f64) as f32,
                ));
            }
        }

        debug!(
            "🔦 亮点 {} 个 → 亮斑 {} 个 (阈值 {})",
            bright.len(),
            centroids.len(),
            self.threshold
        );
        centroids
    }

    /// 扫描亮度超过阈值的像素 (行优先顺序)
    ///
    /// 通道和为整数, `sum > floor(3t)` 与 `sum / 3 > t` 等价
    fn bright_pixels(&self, frame: &Frame) -> Vec<(i32, i32)> {
        let limit = (3.0 * self.threshold).floor().max(0.0) as u16;
        let mut bright = Vec::new();
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                if frame.channel_sum(x, y) > limit {
                    bright.push((x as i32, y as i32));
                }
            }
        }
        bright
    }
}

/// 便捷接口: 直接对原始缓冲区检测
pub fn detect(
    data: &[u8],
    width: u32,
    height: u32,
    format: super::types::PixelFormat,
    threshold: f32,
) -> Result<Vec<Point>> {
    let frame = Frame::new(data, width, height, format)?;
    Ok(BlobDetector::new(threshold).detect(&frame))
}
