//! 监测参数配置 - 通过JSON文件调整参数
//! Monitor settings, persisted as JSON

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, WobbleError};

/// 车轮摆动监测参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WobbleSettings {
    // === 检测参数 ===
    pub brightness_threshold: f32, // 反光标记亮度阈值 (0-255, 越高越严格)

    // === 摆动判定 ===
    pub wobble_tolerance_mm: f32, // 摆动容差 (mm), 超出即报警
    pub pixels_per_mm: f32, // 标定值: 每毫米像素数

    // === 跟踪参数 ===
    pub max_wheels: usize, // 同时跟踪的最大车轮数
    pub history_length: usize, // 轨迹历史长度 (帧)
}

impl Default for WobbleSettings {
    fn default() -> Self {
        Self {
            brightness_threshold: 220.0,
            wobble_tolerance_mm: 1.5,
            pixels_per_mm: 3.0,
            max_wheels: 3,
            history_length: 50,
        }
    }
}

impl WobbleSettings {
    /// 校验参数范围, 返回第一个不合法的字段
    pub fn validate(&self) -> Result<()> {
        let t = self.brightness_threshold;
        if !t.is_finite() || !(0.0..=255.0).contains(&t) {
            return Err(WobbleError::config(
                "brightness_threshold",
                format!("{} is outside [0, 255]", t),
            ));
        }
        if !self.wobble_tolerance_mm.is_finite() || self.wobble_tolerance_mm <= 0.0 {
            return Err(WobbleError::config(
                "wobble_tolerance_mm",
                format!("{} must be positive", self.wobble_tolerance_mm),
            ));
        }
        if !self.pixels_per_mm.is_finite() || self.pixels_per_mm <= 0.0 {
            return Err(WobbleError::config(
                "pixels_per_mm",
                format!("{} must be positive", self.pixels_per_mm),
            ));
        }
        if self.max_wheels == 0 {
            return Err(WobbleError::config("max_wheels", "must be at least 1"));
        }
        if self.history_length == 0 {
            return Err(WobbleError::config("history_length", "must be at least 1"));
        }
        Ok(())
    }

    /// 从JSON文件加载配置
    ///
    /// 文件不存在时写入默认配置并返回; 文件损坏或参数越界时返回错误,
    /// 由调用方决定是否继续使用旧配置.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("📝 配置文件不存在,创建默认配置: {}", path.display());
            let settings = Self::default();
            settings.save(path)?;
            return Ok(settings);
        }

        let json = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;
        info!("✅ 配置已从 {} 加载", path.display());
        Ok(settings)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    /// 默认配置路径: <config_dir>/wobble-sentinel/settings.json
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wobble-sentinel")
            .join("settings.json")
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️  当前监测配置:");
        info!("  亮度阈值: {:.0}", self.brightness_threshold);
        info!("  摆动容差: {:.2} mm", self.wobble_tolerance_mm);
        info!("  标定: {:.2} px/mm", self.pixels_per_mm);
        info!("  最大车轮数: {}", self.max_wheels);
        info!("  轨迹长度: {}", self.history_length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = WobbleSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.brightness_threshold, 220.0);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut settings = WobbleSettings::default();
        settings.brightness_threshold = 300.0;
        match settings.validate() {
            Err(WobbleError::InvalidConfig { field, .. }) => {
                assert_eq!(field, "brightness_threshold")
            }
            other => panic!("unexpected: {:?}", other),
        }

        let mut settings = WobbleSettings::default();
        settings.pixels_per_mm = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = WobbleSettings::default();
        settings.wobble_tolerance_mm = f32::NAN;
        assert!(settings.validate().is_err());

        let mut settings = WobbleSettings::default();
        settings.max_wheels = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = WobbleSettings::load(&path).unwrap();
        assert_eq!(settings, WobbleSettings::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = WobbleSettings {
            brightness_threshold: 180.0,
            max_wheels: 5,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(WobbleSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "pixels_per_mm": -1.0 }"#).unwrap();
        assert!(matches!(
            WobbleSettings::load(&path),
            Err(WobbleError::InvalidConfig { field: "pixels_per_mm", .. })
        ));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            WobbleSettings::load(&path),
            Err(WobbleError::Json(_))
        ));
    }
}
