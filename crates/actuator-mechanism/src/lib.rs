//! # Actuator Mechanism
//!
//! 三种机构变体共享同一套组合：
//!
//! ```text
//! Mechanism = ControlLaw + PlantModel + ActuationBackend + 可视化
//! ```
//!
//! - [`PercentMechanism`]: 开环占空比，控制律从不参与
//! - [`VelocityMechanism`]: 速度闭环（飞轮模型）
//! - [`AngularMechanism`]: 位置闭环 + 重力补偿（摆臂模型），带 advisory 边界查询
//!
//! 后端（真实硬件 / 仿真）在构造时一次性选定，之后所有调用与后端无关。
//!
//! # 生命周期
//!
//! ```text
//! UNCONFIGURED --configure()--> CONFIGURED --set_reference()--> ACTIVE
//! ```
//!
//! # 调度
//!
//! [`Scheduler`] 每个周期依次：排空调参收件箱 → `update()` → `draw()` →
//! （仅仿真）`simulation_step()`。
//!
//! 仿真场景可以由 TOML 描述，见 [`ScenarioConfig`]。

pub mod actuator;
pub mod allocators;
pub mod angular;
pub mod backend;
pub mod config;
mod error;
pub mod lifecycle;
pub mod percent;
pub mod scenario;
pub mod scheduler;
pub mod telemetry;
pub mod velocity;

pub use actuator::Actuator;
pub use allocators::{Allocators, ColorAllocator, SimPortAllocator};
pub use angular::AngularMechanism;
pub use backend::{ActuationBackend, ClosedLoopSource, Measurement};
pub use config::{
    AngularConfig, FollowConfig, HardLimits, HardwareOptions, MechanismBounds, MountPoint,
    PercentConfig, VelocityConfig,
};
pub use error::MechanismError;
pub use lifecycle::Lifecycle;
pub use percent::PercentMechanism;
pub use scenario::{
    MechanismKind, MechanismSpec, MotorPreset, ScenarioConfig, ScheduledCommand, ScheduledTuning,
    SimulationRun,
};
pub use scheduler::{LoopConfig, Scheduler, TickReport};
pub use telemetry::{
    Canvas, Color, LatestFrames, Ligament, RecordingSink, Root, TelemetryFrame, TelemetryHub,
    TelemetrySink, TelemetryValue, TracingSink, TuningInbox, TuningKey, TuningSender, TuningUpdate,
    Visual, tuning_channel,
};
pub use velocity::VelocityMechanism;

use actuator_control::Reference;
use actuator_hal::FaultFlag;
use std::time::Duration;

/// 调度器眼中的机构
///
/// 三种变体都实现该 trait，调度器以 `Box<dyn Mechanism>` 统一管理。
pub trait Mechanism: Send {
    fn name(&self) -> &str;

    fn lifecycle(&self) -> Lifecycle;

    /// 设定参考值
    ///
    /// 百分比机构把它当作占空比，闭环机构当作设定点。
    fn command(&mut self, value: f64) -> Result<(), MechanismError>;

    /// 当前参考值
    fn reference(&self) -> Option<Reference>;

    /// 读取测量并计算、施加 effort
    fn update(&mut self, dt: Duration) -> Result<(), MechanismError>;

    /// 生成可视化帧（不修改控制状态）
    fn draw(&self) -> TelemetryFrame;

    /// 推进物理模型（真实硬件时为空操作）
    fn simulation_step(&mut self, dt: Duration);

    fn is_simulated(&self) -> bool;

    /// 应用一条调参更新
    fn apply_tuning(&mut self, key: TuningKey, value: f64) -> Result<(), MechanismError>;

    /// 调度器检测到时间跳变
    fn on_time_jump(&mut self, dt: Duration);

    /// 粘滞故障标志
    fn faults(&self) -> &FaultFlag;
}
