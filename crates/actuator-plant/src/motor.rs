//! 直流电机模型
//!
//! 由四个铭牌参数（额定电压、堵转扭矩、堵转电流、空载电流、空载转速）
//! 推导出电阻 `R`、扭矩常数 `Kt` 与速度常数 `Kv`：
//!
//! ```text
//! R  = V_nominal / I_stall
//! Kt = τ_stall / I_stall
//! Kv = ω_free / (V_nominal - R · I_free)
//!
//! I(V, ω) = (V - ω / Kv) / R        // ω 为电机轴转速
//! τ(I)    = Kt · I
//! ```
//!
//! 多个电机并联驱动同一负载时，扭矩和电流按数量线性放大，转速不变。

use crate::units::{Amps, Volts, rpm_to_rad_per_sec};

/// 直流电机
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DcMotor {
    /// 额定电压（V）
    pub nominal_voltage: f64,
    /// 堵转扭矩（N·m）
    pub stall_torque: f64,
    /// 堵转电流（A）
    pub stall_current: f64,
    /// 空载电流（A）
    pub free_current: f64,
    /// 空载转速（rad/s）
    pub free_speed: f64,
    /// 绕组电阻（Ω）
    pub resistance: f64,
    /// 速度常数（rad/s per V）
    pub kv: f64,
    /// 扭矩常数（N·m per A）
    pub kt: f64,
}

impl DcMotor {
    /// 由铭牌参数构造
    ///
    /// # 参数
    ///
    /// - `nominal_voltage`: 额定电压（V）
    /// - `stall_torque`: 单个电机堵转扭矩（N·m）
    /// - `stall_current`: 单个电机堵转电流（A）
    /// - `free_current`: 单个电机空载电流（A）
    /// - `free_speed_rpm`: 空载转速（RPM）
    /// - `num_motors`: 并联电机数量
    ///
    /// 参数不做合法性校验，零或负值会传播为 NaN / inf。
    pub fn new(
        nominal_voltage: f64,
        stall_torque: f64,
        stall_current: f64,
        free_current: f64,
        free_speed_rpm: f64,
        num_motors: u32,
    ) -> Self {
        let n = f64::from(num_motors);
        let stall_torque = stall_torque * n;
        let stall_current = stall_current * n;
        let free_current = free_current * n;
        let free_speed = rpm_to_rad_per_sec(free_speed_rpm);

        let resistance = nominal_voltage / stall_current;
        let kv = free_speed / (nominal_voltage - resistance * free_current);
        let kt = stall_torque / stall_current;

        DcMotor {
            nominal_voltage,
            stall_torque,
            stall_current,
            free_current,
            free_speed,
            resistance,
            kv,
            kt,
        }
    }

    /// REV NEO 无刷电机
    pub fn neo(num_motors: u32) -> Self {
        DcMotor::new(12.0, 2.6, 105.0, 1.8, 5676.0, num_motors)
    }

    /// REV NEO 550 无刷电机
    pub fn neo550(num_motors: u32) -> Self {
        DcMotor::new(12.0, 0.97, 100.0, 1.4, 11000.0, num_motors)
    }

    /// 空载转速（RPM）
    ///
    /// 速度仪表盘的满量程。
    pub fn free_speed_rpm(&self) -> f64 {
        crate::units::rad_per_sec_to_rpm(self.free_speed)
    }

    /// 给定端电压与电机轴转速时的电流
    #[inline]
    pub fn current(&self, speed_rad_per_sec: f64, voltage: Volts) -> Amps {
        Amps((voltage.0 - speed_rad_per_sec / self.kv) / self.resistance)
    }

    /// 给定电流产生的扭矩（N·m）
    #[inline]
    pub fn torque(&self, current: Amps) -> f64 {
        self.kt * current.0
    }

    /// 产生指定扭矩所需的端电压
    pub fn voltage_for(&self, torque: f64, speed_rad_per_sec: f64) -> Volts {
        Volts(torque / self.kt * self.resistance + speed_rad_per_sec / self.kv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neo_constants() {
        let neo = DcMotor::neo(1);
        assert!((neo.resistance - 12.0 / 105.0).abs() < 1e-12);
        assert!((neo.kt - 2.6 / 105.0).abs() < 1e-12);
        assert!((neo.free_speed_rpm() - 5676.0).abs() < 1e-9);
    }

    #[test]
    fn test_stall_current_at_zero_speed() {
        let neo = DcMotor::neo(1);
        let current = neo.current(0.0, Volts(12.0));
        assert!((current.0 - 105.0).abs() < 1e-9);
        assert!((neo.torque(current) - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_free_speed_draws_free_current() {
        let motor = DcMotor::neo550(1);
        let current = motor.current(motor.free_speed, Volts(12.0));
        assert!((current.0 - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_motors_scale_torque() {
        let one = DcMotor::neo(1);
        let two = DcMotor::neo(2);
        assert!((two.stall_torque - 2.0 * one.stall_torque).abs() < 1e-12);
        assert!((two.free_speed - one.free_speed).abs() < 1e-12);
    }

    #[test]
    fn test_voltage_for_inverts_torque() {
        let neo = DcMotor::neo(1);
        let speed = 100.0;
        let v = neo.voltage_for(1.0, speed);
        let torque = neo.torque(neo.current(speed, v));
        assert!((torque - 1.0).abs() < 1e-9);
    }
}
