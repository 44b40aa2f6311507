//! 持久化设置（TOML）
//!
//! 保存串口、模拟开关和两个限位属性。调焦器位置从不持久化。

use dreamfocuser_driver::{FocuserBuilder, Limits, MAX_LIMIT, MIN_LIMIT};
use dreamfocuser_protocol::{DEFAULT_BAUD_RATE, DEFAULT_PORT, RESPONSE_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::controller::DEFAULT_RELATIVE_STEP;

/// 默认轮询周期
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// 读取截止时间上限（毫秒）
pub const MAX_READ_TIMEOUT_MS: u64 = 60_000;

/// 设置错误
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// 调焦器设置
///
/// 文件中缺少的键使用默认值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocuserSettings {
    /// 串口设备路径
    pub port: String,
    pub baud_rate: u32,
    /// 使用内存模拟设备
    pub simulation: bool,
    /// 模拟设备是否报告绝对模式
    pub simulated_absolute: bool,
    pub max_absolute: u32,
    pub max_relative: u32,
    /// 默认相对移动步数
    pub relative_step: u32,
    pub poll_interval_ms: u64,
    pub read_timeout_ms: u64,
}

impl Default for FocuserSettings {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            simulation: false,
            simulated_absolute: true,
            max_absolute: limits.max_absolute,
            max_relative: limits.max_relative,
            relative_step: DEFAULT_RELATIVE_STEP,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            read_timeout_ms: RESPONSE_TIMEOUT.as_millis() as u64,
        }
    }
}

impl FocuserSettings {
    /// 从 TOML 文件加载并校验
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = toml::from_str(&content)?;
        settings.validate()?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// 文件不存在时返回默认设置
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// 保存为 TOML（必要时创建父目录）
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        self.validate()?;
        let io_error = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_error)?;
        debug!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.port.trim().is_empty() && !self.simulation {
            return Err(invalid("port", "must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(invalid("baud_rate", "must be positive".to_string()));
        }
        for (field, value) in [
            ("max_absolute", self.max_absolute),
            ("max_relative", self.max_relative),
        ] {
            if !(MIN_LIMIT..=MAX_LIMIT).contains(&value) {
                return Err(invalid(
                    field,
                    format!("{} outside [{}, {}]", value, MIN_LIMIT, MAX_LIMIT),
                ));
            }
        }
        if self.relative_step > self.max_relative {
            return Err(invalid(
                "relative_step",
                format!("{} exceeds max_relative {}", self.relative_step, self.max_relative),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be positive".to_string()));
        }
        if !(1..=MAX_READ_TIMEOUT_MS).contains(&self.read_timeout_ms) {
            return Err(invalid(
                "read_timeout_ms",
                format!("{} outside [1, {}]", self.read_timeout_ms, MAX_READ_TIMEOUT_MS),
            ));
        }
        Ok(())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_absolute: self.max_absolute,
            max_relative: self.max_relative,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// 按设置构造 Builder
    pub fn builder(&self) -> FocuserBuilder {
        FocuserBuilder::new()
            .port(self.port.clone())
            .baud_rate(self.baud_rate)
            .read_timeout(self.read_timeout())
            .simulation(self.simulation)
            .simulated_absolute(self.simulated_absolute)
            .limits(self.limits())
    }
}

fn invalid(field: &'static str, reason: String) -> SettingsError {
    SettingsError::Invalid { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = FocuserSettings::default();
        assert_eq!(settings.port, "/dev/ttyACM0");
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.max_absolute, 300_000);
        assert_eq!(settings.relative_step, 160);
        assert_eq!(settings.poll_interval(), Duration::from_millis(500));
        assert_eq!(settings.read_timeout(), Duration::from_secs(5));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let settings = FocuserSettings {
            port: "/dev/ttyUSB3".to_string(),
            max_absolute: 120_000,
            simulation: true,
            ..FocuserSettings::default()
        };
        settings.save(&path).unwrap();

        assert_eq!(FocuserSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = \"/dev/ttyS1\"\nmax_relative = 1000\n").unwrap();

        let settings = FocuserSettings::load(&path).unwrap();
        assert_eq!(settings.port, "/dev/ttyS1");
        assert_eq!(settings.max_relative, 1000);
        assert_eq!(settings.max_absolute, 300_000);
        assert_eq!(settings.poll_interval_ms, 500);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = TempDir::new().unwrap();
        let settings = FocuserSettings::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, FocuserSettings::default());
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_absolute = 600000\n").unwrap();

        assert!(matches!(
            FocuserSettings::load(&path),
            Err(SettingsError::Invalid {
                field: "max_absolute",
                ..
            })
        ));

        let settings = FocuserSettings {
            relative_step: 400_000,
            ..FocuserSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_read_timeout_bounds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "read_timeout_ms = 3600000\n").unwrap();

        assert!(matches!(
            FocuserSettings::load(&path),
            Err(SettingsError::Invalid {
                field: "read_timeout_ms",
                ..
            })
        ));

        let settings = FocuserSettings {
            read_timeout_ms: MAX_READ_TIMEOUT_MS,
            ..FocuserSettings::default()
        };
        assert!(settings.validate().is_ok());

        let settings = FocuserSettings {
            read_timeout_ms: 0,
            ..FocuserSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_absolute = \"lots\"\n").unwrap();

        assert!(matches!(
            FocuserSettings::load(&path),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_builder_from_settings() {
        let settings = FocuserSettings {
            simulation: true,
            simulated_absolute: false,
            ..FocuserSettings::default()
        };
        let focuser = settings.builder().build().unwrap();
        assert!(!focuser.state().is_absolute);
    }
}
