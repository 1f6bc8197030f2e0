//! 控制层错误类型定义

use thiserror::Error;

/// 控制层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// 输出范围非法（min > max）
    #[error("Invalid output range: min {min} > max {max}")]
    InvalidOutputRange { min: f64, max: f64 },

    /// 增益非法（NaN 或无穷大）
    #[error("Invalid gain {name}: {value} (must be finite)")]
    InvalidGain { name: &'static str, value: f64 },

    /// 容差非法（负数或 NaN）
    #[error("Invalid tolerance: {0} (must be >= 0)")]
    InvalidTolerance(f64),
}
