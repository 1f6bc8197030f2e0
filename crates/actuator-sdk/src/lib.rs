//! Actuator SDK - 执行器机构控制与仿真
//!
//! 为飞轮、单关节摆臂、开环电机提供统一的控制抽象，同一份代码既可以驱动
//! 真实电机控制器，也可以在没有硬件时用物理模型仿真。
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **模型层** (`plant`): 单位类型、直流电机、惯性负载、单关节摆臂、供电母线
//! - **控制层** (`control`): PID + 前馈控制律
//! - **硬件层** (`hal`): 电机控制器绑定契约、仿真绑定、有界重试
//! - **机构层** (`mechanism`): 三种机构变体、生命周期、遥测、调度器
//!
//! # 快速开始
//!
//! ```rust
//! use actuator_sdk::prelude::*;
//!
//! let mut allocators = Allocators::new();
//! let supply = SupplyRail::default();
//! let backend = ActuationBackend::simulated(
//!     allocators.ports.allocate(),
//!     DcMotor::neo(1),
//!     supply,
//! );
//!
//! let mut flywheel = VelocityMechanism::new("flywheel", backend);
//! let config = VelocityConfig {
//!     moment_of_inertia: 0.004,
//!     gains: Gains::new(0.01, 0.0, 0.0),
//!     ..VelocityConfig::default()
//! };
//! flywheel.configure(&config, &mut allocators, &Canvas::default()).unwrap();
//! flywheel.set_reference(2000.0).unwrap();
//! assert_eq!(flywheel.lifecycle(), Lifecycle::Active);
//! ```

pub mod prelude;

pub use actuator_control as control;
pub use actuator_hal as hal;
pub use actuator_mechanism as mechanism;
pub use actuator_plant as plant;

pub use actuator_control::{ControlError, ControlLaw, FeedforwardModel, Gains, Reference};
pub use actuator_hal::{FaultFlag, HalError, MotorBinding, NativeClosedLoop};
pub use actuator_mechanism::{
    AngularMechanism, Lifecycle, Mechanism, MechanismError, PercentMechanism, ScenarioConfig,
    Scheduler, VelocityMechanism,
};

use tracing_subscriber::EnvFilter;

/// 默认日志过滤（`RUST_LOG` 未设置时使用）
pub const DEFAULT_LOG_FILTER: &str = "info";

/// 初始化日志
///
/// 读取 `RUST_LOG`，未设置时使用 [`DEFAULT_LOG_FILTER`]；同时把 `log` crate 的
/// 记录桥接到 `tracing`。日志写到 stderr，stdout 留给遥测输出。重复调用是安全的。
///
/// # 返回
///
/// 本次调用是否安装了全局 subscriber。
pub fn init_logger() -> bool {
    init_logger_with(DEFAULT_LOG_FILTER)
}

/// 以指定的默认过滤初始化日志（`RUST_LOG` 优先）
pub fn init_logger_with(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    // log -> tracing 桥接失败只说明已有 logger
    if let Err(err) = tracing_log::LogTracer::init() {
        tracing::debug!("log bridge not installed: {}", err);
    }
    true
}
