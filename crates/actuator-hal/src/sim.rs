//! 仿真绑定
//!
//! 无硬件时代替电机控制器 + 编码器。占空比仅被记录，
//! 真正的物理推进由上层的 Plant Model 完成，步进后通过
//! [`SimulatedBinding::sync_encoder`] 把积分器状态写回编码器。

use crate::binding::{MotorBinding, sanitize_duty};
use crate::error::HalError;
use actuator_plant::{Amps, DcMotor, Deg, Volts};

/// 仿真电机控制器
#[derive(Debug, Clone)]
pub struct SimulatedBinding {
    name: String,
    port: u32,
    motor: DcMotor,
    duty: f64,
    inverted: bool,
    current_limit: Option<Amps>,
    leader: Option<(u32, bool)>,
    encoder_offset: Deg,
    position: Deg,
    velocity: f64,
    bus_voltage: Volts,
}

impl SimulatedBinding {
    pub fn new(port: u32, motor: DcMotor) -> Self {
        SimulatedBinding {
            name: format!("sim#{}", port),
            port,
            motor,
            duty: 0.0,
            inverted: false,
            current_limit: None,
            leader: None,
            encoder_offset: Deg::ZERO,
            position: Deg::ZERO,
            velocity: 0.0,
            bus_voltage: Volts(12.0),
        }
    }

    /// 占空比折算到电机端的电压（含反向）
    pub fn applied_voltage(&self, supply: Volts) -> Volts {
        let sign = if self.inverted { -1.0 } else { 1.0 };
        Volts(self.duty * supply.0 * sign)
    }

    /// 用积分器状态刷新编码器
    pub fn sync_encoder(&mut self, position: Deg, velocity_rpm: f64) {
        self.position = position;
        self.velocity = velocity_rpm;
    }

    /// 刷新母线电压（由供电模型提供）
    pub fn set_bus_voltage(&mut self, voltage: Volts) {
        self.bus_voltage = voltage;
    }

    pub fn current_limit(&self) -> Option<Amps> {
        self.current_limit
    }

    pub fn leader(&self) -> Option<(u32, bool)> {
        self.leader
    }

    pub fn encoder_offset(&self) -> Deg {
        self.encoder_offset
    }
}

impl MotorBinding for SimulatedBinding {
    fn name(&self) -> &str {
        &self.name
    }

    fn port(&self) -> u32 {
        self.port
    }

    fn set_duty_cycle(&mut self, duty: f64) -> Result<(), HalError> {
        self.duty = sanitize_duty(&self.name, duty)?;
        Ok(())
    }

    fn duty_cycle(&self) -> f64 {
        self.duty
    }

    fn position(&self) -> Deg {
        self.position - self.encoder_offset
    }

    fn velocity(&self) -> f64 {
        self.velocity
    }

    fn bus_voltage(&self) -> Volts {
        self.bus_voltage
    }

    fn motor(&self) -> Result<DcMotor, HalError> {
        Ok(self.motor)
    }

    fn set_current_limit(&mut self, limit: Amps) -> Result<(), HalError> {
        if limit.0.is_nan() || limit.0 <= 0.0 {
            return Err(HalError::InvalidInput(format!(
                "current limit must be positive, got {}",
                limit
            )));
        }
        self.current_limit = Some(limit);
        Ok(())
    }

    fn set_inverted(&mut self, inverted: bool) -> Result<(), HalError> {
        self.inverted = inverted;
        Ok(())
    }

    fn is_inverted(&self) -> bool {
        self.inverted
    }

    fn follow(&mut self, leader_port: u32, inverted: bool) -> Result<(), HalError> {
        if leader_port == self.port {
            return Err(HalError::InvalidInput(format!(
                "{} cannot follow itself",
                self.name
            )));
        }
        self.leader = Some((leader_port, inverted));
        Ok(())
    }

    fn set_encoder_offset(&mut self, offset: Deg) -> Result<(), HalError> {
        self.encoder_offset = offset;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applied_voltage_respects_inversion() {
        let mut binding = SimulatedBinding::new(0, DcMotor::neo(1));
        binding.set_duty_cycle(0.5).unwrap();
        assert_eq!(binding.applied_voltage(Volts(12.0)), Volts(6.0));
        binding.set_inverted(true).unwrap();
        assert_eq!(binding.applied_voltage(Volts(12.0)), Volts(-6.0));
    }

    #[test]
    fn test_sync_encoder_with_offset() {
        let mut binding = SimulatedBinding::new(1, DcMotor::neo(1));
        binding.sync_encoder(Deg(100.0), 42.0);
        binding.set_encoder_offset(Deg(10.0)).unwrap();
        assert_eq!(binding.position(), Deg(90.0));
        assert_eq!(binding.velocity(), 42.0);
    }

    #[test]
    fn test_native_closed_loop_unsupported() {
        let mut binding = SimulatedBinding::new(2, DcMotor::neo550(1));
        let err = binding.native_closed_loop().err();
        assert!(matches!(err, Some(HalError::Unsupported { .. })));
    }

    #[test]
    fn test_follow_and_current_limit() {
        let mut binding = SimulatedBinding::new(3, DcMotor::neo(1));
        assert!(binding.follow(3, false).is_err());
        binding.follow(4, true).unwrap();
        assert_eq!(binding.leader(), Some((4, true)));

        assert!(binding.set_current_limit(Amps(0.0)).is_err());
        binding.set_current_limit(Amps(40.0)).unwrap();
        assert_eq!(binding.current_limit(), Some(Amps(40.0)));
    }

    #[test]
    fn test_name_and_motor() {
        let binding = SimulatedBinding::new(7, DcMotor::neo(1));
        assert_eq!(binding.name(), "sim#7");
        assert_eq!(binding.motor().ok(), Some(DcMotor::neo(1)));
    }
}
