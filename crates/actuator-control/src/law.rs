//! PID + 前馈控制律
//!
//! # 算法
//!
//! ```text
//! e      = r - m
//! ∫      = 0                 若 |e| > i_zone
//!        = ∫ + e·dt          否则
//! D      = 0                 第一次计算
//!        = (e - e_prev) / dt 之后
//! effort = clamp(kP·e + kI·∫ + kD·D + ff, min, max)
//! ```
//!
//! 速度模式的加速度估计取参考值的变化率 `(r - r_prev) / dt`，第一次为 0。

use crate::controller::Controller;
use crate::error::ControlError;
use crate::feedforward::FeedforwardModel;
use crate::gains::Gains;
use crate::mode::{ControlMode, Reference};
use actuator_plant::{Deg, Volts};
use std::time::Duration;

/// 单次计算的分项结果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LawOutput {
    /// 钳位后的 effort
    pub effort: Volts,
    pub error: f64,
    pub proportional: f64,
    pub integral: f64,
    pub derivative: f64,
    pub feedforward: f64,
}

/// 控制律
#[derive(Debug, Clone)]
pub struct ControlLaw {
    gains: Gains,
    feedforward: FeedforwardModel,
    tolerance: f64,
    integral: f64,
    prev_error: Option<f64>,
    prev_reference: Option<f64>,
    evaluations: u64,
    last_output: LawOutput,
}

impl ControlLaw {
    /// 创建控制律
    ///
    /// # 错误
    ///
    /// 输出范围 `min > max` 时返回 [`ControlError::InvalidOutputRange`]。
    pub fn new(gains: Gains) -> Result<Self, ControlError> {
        gains.validate()?;
        Ok(ControlLaw {
            gains,
            feedforward: FeedforwardModel::default(),
            tolerance: 0.0,
            integral: 0.0,
            prev_error: None,
            prev_reference: None,
            evaluations: 0,
            last_output: LawOutput::default(),
        })
    }

    pub fn with_feedforward(mut self, feedforward: FeedforwardModel) -> Self {
        self.feedforward = feedforward;
        self
    }

    /// 设置到位容差
    ///
    /// 负数或 NaN 按 0 处理，即永远不判定到位。
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = if tolerance >= 0.0 { tolerance } else { 0.0 };
        self
    }

    pub fn gains(&self) -> &Gains {
        &self.gains
    }

    /// 替换增益（保留积分与微分历史）
    pub fn set_gains(&mut self, gains: Gains) -> Result<(), ControlError> {
        gains.validate()?;
        self.gains = gains;
        Ok(())
    }

    pub fn feedforward_model(&self) -> &FeedforwardModel {
        &self.feedforward
    }

    pub fn set_feedforward(&mut self, feedforward: FeedforwardModel) {
        self.feedforward = feedforward;
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f64) -> Result<(), ControlError> {
        if tolerance >= 0.0 {
            self.tolerance = tolerance;
            Ok(())
        } else {
            Err(ControlError::InvalidTolerance(tolerance))
        }
    }

    /// 当前积分累积值
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// `calculate()` 被调用的次数
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn last_output(&self) -> LawOutput {
        self.last_output
    }

    /// `|r - m| < tolerance`
    pub fn is_at_target(&self, reference: f64, measurement: f64) -> bool {
        (reference - measurement).abs() < self.tolerance
    }

    /// 计算前馈项并推进参考值历史
    ///
    /// 原生闭环硬件只需要这一项，PID 部分由硬件寄存器完成。
    pub fn calculate_feedforward(
        &mut self,
        reference: Reference,
        measurement: f64,
        dt: Duration,
    ) -> f64 {
        let dt_sec = dt.as_secs_f64();
        let value = match reference.mode {
            ControlMode::Percent => 0.0,
            ControlMode::Velocity => {
                let acceleration = match self.prev_reference {
                    Some(prev) if dt_sec > 0.0 => (reference.value - prev) / dt_sec,
                    _ => 0.0,
                };
                self.feedforward.velocity(reference.value, acceleration)
            },
            ControlMode::Position => self.feedforward.angular(reference.value, Deg(measurement)),
        };
        self.prev_reference = Some(reference.value);
        value
    }

    /// 计算 effort
    ///
    /// `dt <= 0` 时返回零输出并告警，内部状态不变。
    pub fn calculate(
        &mut self,
        reference: Reference,
        measurement: f64,
        dt: Duration,
    ) -> LawOutput {
        self.evaluations += 1;

        let dt_sec = dt.as_secs_f64();
        if dt_sec <= 0.0 {
            tracing::warn!(
                "Control law received zero dt: {:?}, returning zero output",
                dt
            );
            self.last_output = LawOutput::default();
            return self.last_output;
        }

        let error = reference.value - measurement;

        if error.abs() > self.gains.i_zone {
            self.integral = 0.0;
        } else {
            self.integral += error * dt_sec;
        }
        if !self.integral.is_finite() {
            self.integral = 0.0;
        }

        let derivative = match self.prev_error {
            Some(prev) => (error - prev) / dt_sec,
            None => 0.0,
        };
        self.prev_error = Some(error);

        let feedforward = self.calculate_feedforward(reference, measurement, dt);

        let proportional = self.gains.kp * error;
        let integral = self.gains.ki * self.integral;
        let derivative = self.gains.kd * derivative;
        let raw = proportional + integral + derivative + feedforward;
        if raw.is_nan() {
            tracing::warn!(
                "Control law produced NaN (error: {}, feedforward: {}), clamping into output range",
                error,
                feedforward
            );
        }
        let effort = self.gains.clamp(raw);

        self.last_output = LawOutput {
            effort: Volts(effort),
            error,
            proportional,
            integral,
            derivative,
            feedforward,
        };
        self.last_output
    }
}

impl Controller for ControlLaw {
    type Error = ControlError;

    fn tick(
        &mut self,
        reference: Reference,
        measurement: f64,
        dt: Duration,
    ) -> Result<Volts, Self::Error> {
        Ok(self.calculate(reference, measurement, dt).effort)
    }

    fn on_time_jump(&mut self, dt: Duration) -> Result<(), Self::Error> {
        tracing::warn!(
            "Control law detected time jump: {:?}, resetting derivative term only",
            dt
        );

        // ✅ 只重置微分项与加速度估计
        self.prev_error = None;
        self.prev_reference = None;

        // ❌ 积分保留
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.integral = 0.0;
        self.prev_error = None;
        self.prev_reference = None;
        self.last_output = LawOutput::default();
        Ok(())
    }
}
