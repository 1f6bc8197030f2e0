//! 惯性负载（飞轮）模型
//!
//! 单状态：输出轴角速度 ω（rad/s）。每步显式欧拉积分：
//!
//! ```text
//! I   = (V - ω·G / Kv) / R           // 反电动势随转速上升
//! τ   = G · Kt · I - b · ω           // b 为粘滞摩擦系数
//! ω  += τ / J · dt
//! ```
//!
//! 对外以 RPM 报告速度，角度以度累积（仅供可视化）。

use crate::motor::DcMotor;
use crate::units::{Amps, Deg, Volts, rad_per_sec_to_rpm, rpm_to_rad_per_sec};
use std::time::Duration;

/// 飞轮仿真
#[derive(Debug, Clone)]
pub struct InertialPlant {
    motor: DcMotor,
    /// 减速比（电机转速 / 输出转速）
    gearing: f64,
    /// 转动惯量（kg·m²）
    moment_of_inertia: f64,
    /// 粘滞摩擦（N·m per rad/s）
    friction: f64,
    /// 输出轴角度（rad）
    angle: f64,
    /// 输出轴角速度（rad/s）
    velocity: f64,
    input: Volts,
    current: Amps,
}

impl InertialPlant {
    /// 创建静止的飞轮
    ///
    /// 惯量与减速比不做校验，非正值会导致 NaN。
    pub fn new(motor: DcMotor, gearing: f64, moment_of_inertia: f64) -> Self {
        InertialPlant {
            motor,
            gearing,
            moment_of_inertia,
            friction: 0.0,
            angle: 0.0,
            velocity: 0.0,
            input: Volts::ZERO,
            current: Amps(0.0),
        }
    }

    /// 设置粘滞摩擦系数
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn motor(&self) -> &DcMotor {
        &self.motor
    }

    pub fn gearing(&self) -> f64 {
        self.gearing
    }

    pub fn set_input(&mut self, voltage: Volts) {
        self.input = voltage;
    }

    pub fn input(&self) -> Volts {
        self.input
    }

    /// 推进 `dt`
    pub fn step(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        let current = self.motor.current(self.velocity * self.gearing, self.input);
        let torque = self.gearing * self.motor.torque(current) - self.friction * self.velocity;
        let accel = torque / self.moment_of_inertia;

        self.angle += self.velocity * dt;
        self.velocity += accel * dt;
        self.current = current;
    }

    /// 输出轴速度（RPM）
    pub fn velocity_rpm(&self) -> f64 {
        rad_per_sec_to_rpm(self.velocity)
    }

    /// 输出轴累积角度
    pub fn position(&self) -> Deg {
        Deg(self.angle.to_degrees())
    }

    /// 上一步的电流（绝对值）
    pub fn current_draw(&self) -> Amps {
        self.current.abs()
    }

    /// 直接设置状态（RPM / 度）
    pub fn set_state(&mut self, position: Deg, velocity_rpm: f64) {
        self.angle = position.0.to_radians();
        self.velocity = rpm_to_rad_per_sec(velocity_rpm);
    }
}
