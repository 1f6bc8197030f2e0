//! # Actuator HAL
//!
//! 硬件绑定层：控制核心与具体电机控制器之间的端口级契约。
//!
//! - [`MotorBinding`]: 占空比写入、编码器读取、电流限制、反向、跟随
//! - [`NativeClosedLoop`]: 控制器内置闭环（增益寄存器透传），可选能力
//! - [`SimulatedBinding`]: 无硬件时的内存实现
//! - [`MockBinding`]: 可编排故障的测试实现（`mock` feature）
//! - [`configure_with_retry`] / [`FaultFlag`]: 有界重试 + 粘滞故障标志
//!
//! 核心从不假设硬件支持闭环；请求绑定未提供的能力会在第一次使用时返回
//! [`HalError::Unsupported`]，且不会重试。

mod binding;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod retry;
pub mod sim;

pub use binding::{MotorBinding, NativeClosedLoop};
pub use error::HalError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBinding, MockHandle, MockOp};
pub use retry::{FaultFlag, MAX_CONFIG_ATTEMPTS, configure_with_retry};
pub use sim::SimulatedBinding;
