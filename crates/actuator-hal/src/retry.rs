//! 有界重试与粘滞故障标志
//!
//! 硬件配置写入（编码器零点、电流限制等）偶尔会因为总线繁忙而失败。
//! 这类失败按固定次数重试；次数耗尽后不向上抛错，而是置位一个
//! 粘滞的 [`FaultFlag`]，控制循环继续以最后一次成功的配置运行。
//!
//! 不可重试的错误（如 [`HalError::Unsupported`]）立即返回，不消耗重试次数。

use crate::error::HalError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 配置写入的最大尝试次数
pub const MAX_CONFIG_ATTEMPTS: u32 = 5;

#[derive(Debug, Default)]
struct FaultInner {
    raised: AtomicBool,
    message: Mutex<Option<String>>,
}

/// 粘滞故障标志
///
/// 一旦置位，直到显式 [`clear`](FaultFlag::clear) 之前一直保持。
/// 克隆共享同一个标志，遥测线程可以无锁读取 `is_raised()`。
#[derive(Debug, Clone, Default)]
pub struct FaultFlag {
    inner: Arc<FaultInner>,
}

impl FaultFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 置位并记录原因（保留第一次的原因）
    pub fn raise(&self, message: impl Into<String>) {
        let mut slot = self.inner.message.lock();
        if slot.is_none() {
            *slot = Some(message.into());
        }
        self.inner.raised.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::Acquire)
    }

    pub fn message(&self) -> Option<String> {
        self.inner.message.lock().clone()
    }

    pub fn clear(&self) {
        *self.inner.message.lock() = None;
        self.inner.raised.store(false, Ordering::Release);
    }
}

/// 有界重试执行一次配置写入
///
/// # 参数
///
/// - `operation`: 操作名（用于日志和故障信息）
/// - `fault`: 重试耗尽时置位的标志
/// - `write`: 配置写入闭包，参数为当前尝试序号（从 1 开始）
///
/// # 返回
///
/// - `Ok(true)`: 写入成功
/// - `Ok(false)`: 重试耗尽，`fault` 已置位
/// - `Err(e)`: 不可重试的错误，原样返回
pub fn configure_with_retry<F>(
    operation: &'static str,
    fault: &FaultFlag,
    mut write: F,
) -> Result<bool, HalError>
where
    F: FnMut(u32) -> Result<(), HalError>,
{
    let mut last_error = None;

    for attempt in 1..=MAX_CONFIG_ATTEMPTS {
        match write(attempt) {
            Ok(()) => {
                if attempt > 1 {
                    tracing::debug!("{} succeeded on attempt {}", operation, attempt);
                }
                return Ok(true);
            },
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                tracing::debug!(
                    "{} attempt {}/{} failed: {}",
                    operation,
                    attempt,
                    MAX_CONFIG_ATTEMPTS,
                    err
                );
                last_error = Some(err);
            },
        }
    }

    let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
    tracing::warn!(
        "{} failed after {} attempts, raising fault: {}",
        operation,
        MAX_CONFIG_ATTEMPTS,
        reason
    );
    fault.raise(format!(
        "{} failed after {} attempts: {}",
        operation, MAX_CONFIG_ATTEMPTS, reason
    ));
    Ok(false)
}
