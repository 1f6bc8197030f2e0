//! 硬件绑定错误类型定义

use thiserror::Error;

/// 硬件绑定错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HalError {
    /// 绑定不提供该能力（不重试）
    #[error("{capability} unsupported for this actuator ({actuator})")]
    Unsupported {
        capability: &'static str,
        actuator: String,
    },

    /// 配置写入失败（可重试）
    #[error("Configuration '{operation}' failed on {actuator}: {reason}")]
    ConfigFailed {
        operation: &'static str,
        actuator: String,
        reason: String,
    },

    /// 总线 / 设备暂时不可用
    #[error("Transient hardware error: {0}")]
    Transient(String),

    /// 无效输入
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl HalError {
    pub fn unsupported(capability: &'static str, actuator: impl Into<String>) -> Self {
        HalError::Unsupported {
            capability,
            actuator: actuator.into(),
        }
    }

    /// 是否值得重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, HalError::ConfigFailed { .. } | HalError::Transient(_))
    }
}
