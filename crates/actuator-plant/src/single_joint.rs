//! 单关节摆臂模型
//!
//! 状态 `x = [θ, ω]`（rad, rad/s），电机经减速比 `G` 驱动一根均匀细杆：
//!
//! ```text
//! J   = m · L² / 3
//! I   = (V - ω·G / Kv) / R
//! α   = (G · Kt · I - m · g · L · cos θ) / J      // 重力项可关闭
//! ```
//!
//! 使用 RK4 积分。电机电气阻尼 `λ = G²·Kt / (Kv·R·J)` 在大减速比、小惯量时
//! 很“硬”，因此按 `ceil(dt·λ / 2)` 自动细分子步，保证每个子步 `h·λ ≤ 2`。
//! 子步数上限为 [`MAX_SUBSTEPS`]；质量或臂长为 0 时 λ 非有限，只走一步，状态变为 NaN。
//!
//! 积分角度被夹在硬限位 `[min, max]` 内，撞限位时角速度清零。
//! 这是仿真的物理限位，与机构层的 advisory 边界相互独立。

use crate::motor::DcMotor;
use crate::units::{Amps, Deg, Volts, rad_per_sec_to_rpm};
use crate::GRAVITY;
use nalgebra::Vector2;
use std::time::Duration;

/// 单次 `step()` 的最大子步数
pub const MAX_SUBSTEPS: usize = 1000;

/// 摆臂物理参数
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SingleJointParams {
    /// 减速比
    pub gearing: f64,
    /// 臂质量（kg）
    pub mass: f64,
    /// 臂长（m）
    pub arm_length: f64,
    /// 硬限位下限
    pub min_angle: Deg,
    /// 硬限位上限
    pub max_angle: Deg,
    /// 是否模拟重力
    pub simulate_gravity: bool,
    /// 初始角度
    pub starting_angle: Deg,
}

impl SingleJointParams {
    /// 细杆绕端点的转动惯量
    pub fn moment_of_inertia(&self) -> f64 {
        self.mass * self.arm_length * self.arm_length / 3.0
    }
}

/// 摆臂仿真
#[derive(Debug, Clone)]
pub struct SingleJointPlant {
    motor: DcMotor,
    params: SingleJointParams,
    moment_of_inertia: f64,
    min: f64,
    max: f64,
    state: Vector2<f64>,
    input: Volts,
    current: Amps,
}

impl SingleJointPlant {
    pub fn new(motor: DcMotor, params: SingleJointParams) -> Self {
        let min = params.min_angle.to_rad().0;
        let max = params.max_angle.to_rad().0;
        let start = params.starting_angle.to_rad().0.clamp(min.min(max), max.max(min));

        SingleJointPlant {
            motor,
            moment_of_inertia: params.moment_of_inertia(),
            params,
            min,
            max,
            state: Vector2::new(start, 0.0),
            input: Volts::ZERO,
            current: Amps(0.0),
        }
    }

    pub fn params(&self) -> &SingleJointParams {
        &self.params
    }

    pub fn motor(&self) -> &DcMotor {
        &self.motor
    }

    pub fn set_input(&mut self, voltage: Volts) {
        self.input = voltage;
    }

    pub fn input(&self) -> Volts {
        self.input
    }

    /// 电气阻尼特征值（1/s）
    fn stiffness(&self) -> f64 {
        let g = self.params.gearing;
        g * g * self.motor.kt / (self.motor.kv * self.motor.resistance * self.moment_of_inertia)
    }

    /// 推进 `dt` 所需的子步数，范围 `[1, MAX_SUBSTEPS]`
    fn substeps(&self, dt: f64) -> usize {
        let stiffness = self.stiffness();
        if !stiffness.is_finite() {
            return 1;
        }
        // NaN 与负数转换为 0
        ((dt * stiffness / 2.0).ceil() as usize).clamp(1, MAX_SUBSTEPS)
    }

    fn derivative(&self, x: &Vector2<f64>) -> Vector2<f64> {
        let g = self.params.gearing;
        let current = self.motor.current(x[1] * g, self.input);
        let mut torque = g * self.motor.torque(current);
        if self.params.simulate_gravity {
            torque -= self.params.mass * GRAVITY * self.params.arm_length * x[0].cos();
        }
        Vector2::new(x[1], torque / self.moment_of_inertia)
    }

    fn clamp_to_limits(&mut self) {
        if self.state[0] < self.min {
            self.state = Vector2::new(self.min, 0.0);
        } else if self.state[0] > self.max {
            self.state = Vector2::new(self.max, 0.0);
        }
    }

    /// 推进 `dt`
    pub fn step(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        let substeps = self.substeps(dt);
        let h = dt / substeps as f64;

        for _ in 0..substeps {
            let x = self.state;
            let k1 = self.derivative(&x);
            let k2 = self.derivative(&(x + k1 * (h / 2.0)));
            let k3 = self.derivative(&(x + k2 * (h / 2.0)));
            let k4 = self.derivative(&(x + k3 * h));
            self.state = x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0);
            self.clamp_to_limits();
        }

        self.current = self.motor.current(self.state[1] * self.params.gearing, self.input);
    }

    /// 当前角度
    pub fn angle(&self) -> Deg {
        Deg(self.state[0].to_degrees())
    }

    /// 当前角速度（RPM）
    pub fn velocity_rpm(&self) -> f64 {
        rad_per_sec_to_rpm(self.state[1])
    }

    /// 当前角速度（rad/s）
    pub fn velocity_rad_per_sec(&self) -> f64 {
        self.state[1]
    }

    pub fn current_draw(&self) -> Amps {
        self.current.abs()
    }

    pub fn has_hit_lower_limit(&self) -> bool {
        self.state[0] <= self.min
    }

    pub fn has_hit_upper_limit(&self) -> bool {
        self.state[0] >= self.max
    }

    pub fn set_state(&mut self, angle: Deg, velocity_rad_per_sec: f64) {
        self.state = Vector2::new(angle.to_rad().0, velocity_rad_per_sec);
        self.clamp_to_limits();
    }
}
