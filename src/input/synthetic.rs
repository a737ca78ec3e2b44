//! 合成输入源 - 模拟旋转车轮上的反光标记
//!
//! 每个车轮在暗背景上绘制一个亮方块, 绕各自圆心匀速旋转;
//! 半径按 cos(2θ) 调制, 峰峰值即为设定的摆动量 (像素).

use std::f32::consts::TAU;

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{frame_timestamp, FrameSource};
use crate::detection::{OwnedFrame, Point};
use crate::error::Result;

const BACKGROUND: u8 = 18;
const MARKER: u8 = 250;

/// 合成车轮参数
#[derive(Clone, Debug)]
pub struct SyntheticWheel {
    pub center: Point,
    pub radius: f32,
    /// 径向摆动峰峰值 (像素)
    pub wobble_px: f32,
    /// 转一圈所需帧数
    pub period_frames: f32,
    pub phase: f32,
}

impl SyntheticWheel {
    /// 第 `frame_id` 帧时标记的位置
    pub fn marker_position(&self, frame_id: u64) -> Point {
        let theta = self.phase + TAU * frame_id as f32 / self.period_frames.max(1.0);
        let r = self.radius + 0.5 * self.wobble_px * (2.0 * theta).cos();
        Point::new(
            self.center.x + r * theta.cos(),
            self.center.y + r * theta.sin(),
        )
    }
}

/// 合成帧源
pub struct SyntheticSource {
    width: u32,
    height: u32,
    wheels: Vec<SyntheticWheel>,
    fps: f64,
    frame_id: u64,
    frame_limit: Option<u64>,
    marker_size: u32,
    speckle: usize,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, wheels: Vec<SyntheticWheel>, fps: f64) -> Self {
        Self {
            width,
            height,
            wheels,
            fps,
            frame_id: 0,
            frame_limit: None,
            marker_size: 4,
            speckle: 0,
            rng: StdRng::seed_from_u64(0x5EED),
        }
    }

    /// 水平等距排列 `count` 个车轮
    pub fn row(width: u32, height: u32, count: usize, wobble_px: f32, fps: f64) -> Self {
        let count = count.max(1);
        let spacing = width as f32 / count as f32;
        let radius = (spacing * 0.3).min(height as f32 * 0.3);
        let wheels = (0..count)
            .map(|i| SyntheticWheel {
                center: Point::new(spacing * (i as f32 + 0.5), height as f32 * 0.5),
                radius,
                wobble_px,
                period_frames: 48.0,
                phase: i as f32 * 0.7,
            })
            .collect();
        Self::new(width, height, wheels, fps)
    }

    /// 限制总帧数
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// 每帧随机噪点数
    pub fn with_speckle(mut self, speckle: usize, seed: u64) -> Self {
        self.speckle = speckle;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn render(&mut self) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, Rgb([BACKGROUND; 3]));
        let half = self.marker_size as i32 / 2;

        for wheel in &self.wheels {
            let p = wheel.marker_position(self.frame_id);
            let (cx, cy) = (p.x.round() as i32, p.y.round() as i32);
            for y in cy - half..cy - half + self.marker_size as i32 {
                for x in cx - half..cx - half + self.marker_size as i32 {
                    if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
                        img.put_pixel(x as u32, y as u32, Rgb([MARKER; 3]));
                    }
                }
            }
        }

        // 孤立噪点 (单像素, 会被噪声过滤剔除)
        if self.width > 0 && self.height > 0 {
            for _ in 0..self.speckle {
                let x = self.rng.gen_range(0..self.width);
                let y = self.rng.gen_range(0..self.height);
                img.put_pixel(x, y, Rgb([MARKER; 3]));
            }
        }

        img
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<OwnedFrame>> {
        if self.frame_limit.is_some_and(|limit| self.frame_id >= limit) {
            return Ok(None);
        }
        let img = self.render();
        let frame = OwnedFrame::from_rgb_image(
            img,
            self.frame_id,
            frame_timestamp(self.frame_id, self.fps),
        );
        self.frame_id += 1;
        Ok(Some(frame))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BlobDetector;

    #[test]
    fn test_frame_limit_and_timestamps() {
        let mut source = SyntheticSource::row(320, 240, 2, 0.0, 25.0).with_frame_limit(3);
        let mut stamps = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.data.len(), 320 * 240 * 3);
            stamps.push(frame.timestamp_ms);
        }
        assert_eq!(stamps, vec![0, 40, 80]);
    }

    #[test]
    fn test_markers_are_detected() {
        let mut source = SyntheticSource::row(480, 240, 3, 0.0, 30.0).with_speckle(40, 7);
        let frame = source.next_frame().unwrap().unwrap();
        let blobs = BlobDetector::new(220.0).detect(&frame.as_frame().unwrap());
        assert_eq!(blobs.len(), 3);
    }

    #[test]
    fn test_wobble_amplitude() {
        let wheel = SyntheticWheel {
            center: Point::new(100.0, 100.0),
            radius: 30.0,
            wobble_px: 6.0,
            period_frames: 40.0,
            phase: 0.0,
        };
        let radii: Vec<f32> = (0..40)
            .map(|i| wheel.marker_position(i).distance(&wheel.center))
            .collect();
        let max = radii.iter().cloned().fold(f32::MIN, f32::max);
        let min = radii.iter().cloned().fold(f32::MAX, f32::min);
        assert!((max - min - 6.0).abs() < 1e-3);
    }
}
