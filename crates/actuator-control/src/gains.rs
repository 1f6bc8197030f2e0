//! PID 增益与输出范围

use crate::error::ControlError;

/// 默认输出限幅（V）
pub const DEFAULT_OUTPUT_LIMIT: f64 = 12.0;

/// PID 增益
///
/// # 默认参数
///
/// - kP = kI = kD = 0
/// - 积分区 = +∞（积分永不因误差过大而清零）
/// - 输出范围 = [-12, 12] V
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// 积分区阈值：|e| 超过该值时积分清零
    pub i_zone: f64,
    pub min_output: f64,
    pub max_output: f64,
}

impl Default for Gains {
    fn default() -> Self {
        Gains {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            i_zone: f64::INFINITY,
            min_output: -DEFAULT_OUTPUT_LIMIT,
            max_output: DEFAULT_OUTPUT_LIMIT,
        }
    }
}

impl Gains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Gains {
            kp,
            ki,
            kd,
            ..Gains::default()
        }
    }

    pub fn with_i_zone(mut self, i_zone: f64) -> Self {
        self.i_zone = i_zone;
        self
    }

    pub fn with_output_range(mut self, min: f64, max: f64) -> Self {
        self.min_output = min;
        self.max_output = max;
        self
    }

    /// 检查参数
    ///
    /// - kP / kI / kD 必须有限
    /// - 积分区不能是 NaN（允许 +∞）
    /// - `min <= max`，NaN 同样视为非法
    pub fn validate(&self) -> Result<(), ControlError> {
        for (name, value) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !value.is_finite() {
                return Err(ControlError::InvalidGain { name, value });
            }
        }
        if self.i_zone.is_nan() {
            return Err(ControlError::InvalidGain {
                name: "i_zone",
                value: self.i_zone,
            });
        }
        if self.min_output <= self.max_output {
            Ok(())
        } else {
            Err(ControlError::InvalidOutputRange {
                min: self.min_output,
                max: self.max_output,
            })
        }
    }

    /// 钳位到输出范围，NaN 映射为范围内最接近 0 的值
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0_f64.clamp(self.min_output, self.max_output);
        }
        value.clamp(self.min_output, self.max_output)
    }
}
