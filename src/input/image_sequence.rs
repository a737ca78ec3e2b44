//! 图片序列输入 - 按文件名顺序读取目录中的帧

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{frame_timestamp, FrameSource};
use crate::detection::OwnedFrame;
use crate::error::Result;

const EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// 图片序列帧源
pub struct ImageSequenceSource {
    name: String,
    files: Vec<PathBuf>,
    cursor: usize,
    fps: f64,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>, fps: f64) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        if files.is_empty() {
            warn!("⚠️  目录中没有图片: {}", dir.display());
        } else {
            info!("🖼️  图片序列: {} 帧 ({})", files.len(), dir.display());
        }

        Ok(Self {
            name: dir.display().to_string(),
            files,
            cursor: 0,
            fps,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<OwnedFrame>> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        let img = image::open(path)?.to_rgb8();
        let frame_id = self.cursor as u64;
        self.cursor += 1;
        Ok(Some(OwnedFrame::from_rgb_image(
            img,
            frame_id,
            frame_timestamp(frame_id, self.fps),
        )))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_reads_images_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for (i, shade) in [(1u8, 10u8), (0, 200)] {
            let img = RgbImage::from_pixel(8, 6, Rgb([shade; 3]));
            img.save(dir.path().join(format!("frame_{:03}.png", i))).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), 10.0).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!((first.width, first.height), (8, 6));
        assert_eq!(first.data[0], 200);
        assert_eq!(first.timestamp_ms, 0);

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.data[0], 10);
        assert_eq!(second.timestamp_ms, 100);

        assert!(source.next_frame().unwrap().is_none());
    }
}
