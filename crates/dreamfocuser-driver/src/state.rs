//! 设备缓存状态与限位

use crate::error::DriverError;
use dreamfocuser_protocol::{EnvironmentFeedback, FirmwareVersion};

/// 限位属性的允许范围下限
pub const MIN_LIMIT: u32 = 1;
/// 限位属性的允许范围上限
pub const MAX_LIMIT: u32 = 500_000;
/// 限位属性默认值
pub const DEFAULT_LIMIT: u32 = 300_000;

/// 设备缓存状态
///
/// 只由设备模型的操作更新，且只在交换成功后更新。
/// `None` 表示连接以来尚未成功读取。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocuserState {
    /// 最近一次 'P' 读到的位置（从不根据命令目标预测）
    pub position: Option<i32>,
    /// 最近一次 'I' 的结果
    pub is_moving: bool,
    /// 最近一次 'W' 的结果
    pub is_absolute: bool,
    /// 温度（K）
    pub temperature_kelvin: Option<f64>,
    /// 相对湿度（%）
    pub humidity_percent: Option<f64>,
    pub firmware: Option<FirmwareVersion>,
}

impl FocuserState {
    pub(crate) fn apply_environment(&mut self, environment: &EnvironmentFeedback) {
        self.temperature_kelvin = Some(environment.temperature_kelvin());
        self.humidity_percent = Some(environment.humidity_percent());
    }
}

/// 位置限位
///
/// - `max_absolute`: 绝对位置范围 `[-max, +max]`
/// - `max_relative`: 相对移动步数范围 `[0, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_absolute: u32,
    pub max_relative: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_absolute: DEFAULT_LIMIT,
            max_relative: DEFAULT_LIMIT,
        }
    }
}

impl Limits {
    /// 创建限位（两个值都必须在 `[1, 500000]` 内）
    pub fn new(max_absolute: u32, max_relative: u32) -> Result<Self, DriverError> {
        Ok(Self {
            max_absolute: validate_limit("max_absolute", max_absolute)?,
            max_relative: validate_limit("max_relative", max_relative)?,
        })
    }

    /// 绝对位置下界
    pub fn min_position(&self) -> i64 {
        -i64::from(self.max_absolute)
    }

    /// 绝对位置上界
    pub fn max_position(&self) -> i64 {
        i64::from(self.max_absolute)
    }

    pub fn check_absolute(&self, target: i64) -> Result<(), DriverError> {
        if target.unsigned_abs() > u64::from(self.max_absolute) {
            return Err(DriverError::OutOfRange {
                target,
                limit: self.max_absolute,
            });
        }
        Ok(())
    }

    pub fn check_relative(&self, ticks: u32) -> Result<(), DriverError> {
        if ticks > self.max_relative {
            return Err(DriverError::RelativeOutOfRange {
                ticks,
                limit: self.max_relative,
            });
        }
        Ok(())
    }
}

/// 校验单个限位值
pub fn validate_limit(name: &'static str, value: u32) -> Result<u32, DriverError> {
    if (MIN_LIMIT..=MAX_LIMIT).contains(&value) {
        Ok(value)
    } else {
        Err(DriverError::InvalidLimit {
            name,
            value,
            min: MIN_LIMIT,
            max: MAX_LIMIT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_absolute, 300_000);
        assert_eq!(limits.max_relative, 300_000);
        assert_eq!(limits.min_position(), -300_000);
    }

    #[test]
    fn test_absolute_bounds_inclusive() {
        let limits = Limits::new(1000, 500).unwrap();
        assert!(limits.check_absolute(1000).is_ok());
        assert!(limits.check_absolute(-1000).is_ok());
        assert!(matches!(
            limits.check_absolute(1001),
            Err(DriverError::OutOfRange {
                target: 1001,
                limit: 1000
            })
        ));
        assert!(limits.check_absolute(-1001).is_err());
    }

    #[test]
    fn test_relative_bounds() {
        let limits = Limits::new(1000, 500).unwrap();
        assert!(limits.check_relative(0).is_ok());
        assert!(limits.check_relative(500).is_ok());
        assert!(limits.check_relative(501).is_err());
    }

    #[test]
    fn test_limit_range() {
        assert!(Limits::new(0, 100).is_err());
        assert!(Limits::new(100, 500_001).is_err());
        assert!(Limits::new(1, 500_000).is_ok());
    }

    #[test]
    fn test_initial_state_unread() {
        let state = FocuserState::default();
        assert_eq!(state.position, None);
        assert!(!state.is_moving);
        assert_eq!(state.temperature_kelvin, None);
    }
}
