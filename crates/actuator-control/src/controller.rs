//! Controller trait - 控制器通用接口
//!
//! # 设计理念
//!
//! - **Tick 模式**: 调度器负责循环，控制器只负责计算
//! - **时间感知**: 显式传入 `dt`，便于单元测试
//!
//! # 时间跳变处理
//!
//! 调度器检测到异常大的 `dt`（线程被抢占、调试器暂停）时会先调用
//! `on_time_jump()`：
//!
//! - ✅ **必须重置**: 微分项历史，否则 `Δe / dt` 失真
//! - ❌ **不要清零**: 积分项，摆臂依赖它抵抗重力

use crate::mode::Reference;
use actuator_plant::Volts;
use std::time::Duration;

/// 控制器通用接口
pub trait Controller {
    /// 控制器错误类型
    type Error: std::error::Error + Send + 'static;

    /// 计算一步 effort
    ///
    /// # 参数
    ///
    /// - `reference`: 当前参考值
    /// - `measurement`: 当前测量值（与参考值同单位）
    /// - `dt`: 距上次 `tick` 的时间（可能已被钳位）
    fn tick(
        &mut self,
        reference: Reference,
        measurement: f64,
        dt: Duration,
    ) -> Result<Volts, Self::Error>;

    /// 处理时间跳变
    ///
    /// 默认实现不做任何事情。
    fn on_time_jump(&mut self, dt: Duration) -> Result<(), Self::Error> {
        let _ = dt;
        Ok(())
    }

    /// 完全重置内部状态
    fn reset(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
