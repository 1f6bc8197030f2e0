//! 机构层错误类型定义

use crate::telemetry::TuningKey;
use actuator_control::ControlError;
use actuator_hal::HalError;
use thiserror::Error;

/// 机构层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MechanismError {
    /// 硬件绑定错误
    #[error("Hardware error: {0}")]
    Hal(#[from] HalError),

    /// 控制律参数错误
    #[error("Control law error: {0}")]
    Control(#[from] ControlError),

    /// 尚未配置（UNCONFIGURED 状态下设置参考值）
    #[error("Mechanism '{0}' is not configured")]
    NotConfigured(String),

    /// 配置非法
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// 调度器中不存在该机构
    #[error("Unknown mechanism: {0}")]
    UnknownMechanism(String),

    /// 该机构不支持此调参项
    #[error("Tuning key '{key}' does not apply to mechanism '{mechanism}'")]
    UnsupportedTuning { mechanism: String, key: TuningKey },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mechanism_error_display() {
        let err = MechanismError::NotConfigured("shooter".to_string());
        assert_eq!(format!("{}", err), "Mechanism 'shooter' is not configured");

        let err = MechanismError::UnknownMechanism("intake".to_string());
        assert_eq!(format!("{}", err), "Unknown mechanism: intake");

        let err = MechanismError::UnsupportedTuning {
            mechanism: "roller".to_string(),
            key: TuningKey::Kp,
        };
        assert_eq!(
            format!("{}", err),
            "Tuning key 'kp' does not apply to mechanism 'roller'"
        );
    }

    #[test]
    fn test_from_hal_error() {
        let err: MechanismError = HalError::Transient("bus".to_string()).into();
        assert!(matches!(err, MechanismError::Hal(_)));
        assert!(format!("{}", err).contains("bus"));
    }

    #[test]
    fn test_from_control_error() {
        let err: MechanismError = ControlError::InvalidTolerance(-1.0).into();
        assert!(matches!(err, MechanismError::Control(_)));
    }
}
