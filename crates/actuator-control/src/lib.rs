//! # Actuator Control
//!
//! 所有闭环机构共用的控制律：PID + 前馈。
//!
//! ```text
//! effort = clamp(kP·e + kI·∫e dt + kD·Δe/dt + ff, min, max)
//! ```
//!
//! - 误差超出积分区（integral zone）时积分清零
//! - 构造或重置后的第一次计算微分项为 0
//! - 前馈按控制模式选择：百分比模式为 0，速度模式 `kS·sgn(r) + kV·r + kA·a`，
//!   位置模式 `kS·sgn(r) + kG·cos(θ) + kV·r`
//!
//! # 示例
//!
//! ```rust
//! use actuator_control::{ControlLaw, Gains, Reference};
//! use std::time::Duration;
//!
//! let mut law = ControlLaw::new(Gains::new(0.4, 0.0, 0.1)).unwrap();
//! let out = law.calculate(Reference::velocity(3500.0), 0.0, Duration::from_millis(20));
//! assert_eq!(out.effort.0, 12.0); // 饱和到默认输出上限
//! ```

mod controller;
mod error;
pub mod feedforward;
pub mod gains;
pub mod law;
pub mod mode;

pub use controller::Controller;
pub use error::ControlError;
pub use feedforward::FeedforwardModel;
pub use gains::Gains;
pub use law::{ControlLaw, LawOutput};
pub use mode::{ControlMode, Reference};
