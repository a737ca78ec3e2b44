/// 摆动检测系统数据结构定义
/// Data structures for the wobble detection system
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WobbleError};

// ========== 数据结构 ==========

/// 像素坐标点 (Pixel-space point)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// 欧氏距离
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// 点集算术平均 (空集返回 None)
    pub fn mean(points: impl IntoIterator<Item = Point>) -> Option<Point> {
        let (mut sx, mut sy, mut n) = (0.0f64, 0.0f64, 0usize);
        for p in points {
            sx += p.x as f64;
            sy += p.y as f64;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(Point::new((sx / n as f64) as f32, (sy / n as f64) as f32))
    }
}

/// 像素格式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Luma8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Luma8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// 帧视图 (借用像素数据, 不复制)
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl<'a> Frame<'a> {
    /// 创建帧视图, 校验缓冲区长度与宽高是否一致
    pub fn new(data: &'a [u8], width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let channels = format.channels();
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(channels));
        match expected {
            Some(expected) if expected == data.len() => Ok(Self {
                data,
                width,
                height,
                format,
            }),
            _ => Err(WobbleError::InvalidFrame {
                width,
                height,
                channels,
                expected: expected.unwrap_or(usize::MAX),
                actual: data.len(),
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 颜色通道之和 (忽略alpha)
    ///
    /// 亮度 = 通道和 / 3, 比较时用 `sum > 3 * threshold` 避免浮点误差.
    /// 单通道灰度按三通道等值处理.
    #[inline]
    pub fn channel_sum(&self, x: u32, y: u32) -> u16 {
        let idx = (y as usize * self.width as usize + x as usize) * self.format.channels();
        match self.format {
            PixelFormat::Luma8 => self.data[idx] as u16 * 3,
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => {
                self.data[idx] as u16 + self.data[idx + 1] as u16 + self.data[idx + 2] as u16
            }
        }
    }

    /// 像素亮度 (三通道无权平均)
    pub fn brightness(&self, x: u32, y: u32) -> f32 {
        self.channel_sum(x, y) as f32 / 3.0
    }
}

/// 已解码帧 (采集线程 → 检测线程)
#[derive(Clone, Debug)]
pub struct OwnedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub frame_id: u64, // 帧序号
    pub timestamp_ms: u64, // 采集时间戳 (毫秒)
}

impl OwnedFrame {
    pub fn from_rgb_image(image: RgbImage, frame_id: u64, timestamp_ms: u64) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            format: PixelFormat::Rgb8,
            frame_id,
            timestamp_ms,
        }
    }

    pub fn as_frame(&self) -> Result<Frame<'_>> {
        Frame::new(&self.data, self.width, self.height, self.format)
    }

    /// 转为RGB图像 (用于叠加绘制)
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        let rgb: Vec<u8> = match self.format {
            PixelFormat::Rgb8 => self.data.clone(),
            PixelFormat::Rgba8 => self
                .data
                .chunks_exact(4)
                .flat_map(|p| [p[0], p[1], p[2]])
                .collect(),
            PixelFormat::Luma8 => self.data.iter().flat_map(|&v| [v, v, v]).collect(),
        };
        RgbImage::from_raw(self.width, self.height, rgb)
    }
}
