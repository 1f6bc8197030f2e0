//! # Actuator Plant
//!
//! 执行器仿真的物理模型层：
//!
//! - **单位类型**: `Rad` / `Deg` / `Volts` / `Amps`（NewType，防止单位混淆）
//! - **直流电机模型**: `DcMotor`（含反电动势，内置 NEO / NEO 550 参数）
//! - **惯性负载（飞轮）**: `InertialPlant`，显式欧拉积分
//! - **单关节摆臂**: `SingleJointPlant`，重力 + RK4 积分 + 硬限位
//! - **供电母线**: `SupplyRail`，根据总电流估算电池压降
//!
//! 所有模型只在没有真实硬件时使用；由上层的 Actuation Backend 以固定
//! 20 ms 步长推进。
//!
//! # 示例
//!
//! ```rust
//! use actuator_plant::{DcMotor, InertialPlant, PlantModel, Volts, SIM_STEP};
//!
//! let mut plant = PlantModel::Inertial(InertialPlant::new(DcMotor::neo(1), 1.0, 0.01));
//! plant.set_input(Volts(6.0));
//! plant.step(SIM_STEP);
//! assert!(plant.velocity() > 0.0);
//! ```

pub mod inertial;
pub mod motor;
pub mod plant;
pub mod single_joint;
pub mod supply;
pub mod units;

pub use inertial::InertialPlant;
pub use motor::DcMotor;
pub use plant::{PlantModel, PlantState};
pub use single_joint::{MAX_SUBSTEPS, SingleJointParams, SingleJointPlant};
pub use supply::{BatteryModel, SupplyRail};
pub use units::{Amps, Deg, Rad, Volts, rad_per_sec_to_rpm, rpm_to_rad_per_sec};

use std::time::Duration;

/// 固定仿真步长（20 ms）
pub const SIM_STEP: Duration = Duration::from_millis(20);

/// 重力加速度（m/s²）
pub const GRAVITY: f64 = 9.81;
