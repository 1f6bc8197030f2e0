//! Mock 绑定
//!
//! 用于在没有硬件的情况下测试 Real 后端：
//!
//! - 可选的“原生闭环”能力，记录增益写入与参考值
//! - 按操作编排若干次可重试失败
//! - 测试侧通过 [`MockHandle`] 设置测量值、检查写入
//!
//! ```rust
//! use actuator_hal::{MockBinding, MockOp, MotorBinding};
//!
//! let (mut binding, handle) = MockBinding::new(4);
//! handle.fail_next(MockOp::EncoderOffset, 2);
//! binding.set_duty_cycle(0.25).unwrap();
//! assert_eq!(handle.duty(), 0.25);
//! ```

use crate::binding::{MotorBinding, NativeClosedLoop, sanitize_duty};
use crate::error::HalError;
use actuator_control::{Gains, Reference};
use actuator_plant::{Amps, DcMotor, Deg, Volts};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// 可编排失败的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    CurrentLimit,
    Inverted,
    Follow,
    EncoderOffset,
    WriteGains,
    SetReference,
    DutyCycle,
}

impl MockOp {
    fn as_str(self) -> &'static str {
        match self {
            MockOp::CurrentLimit => "current limit",
            MockOp::Inverted => "inverted",
            MockOp::Follow => "follow",
            MockOp::EncoderOffset => "encoder offset",
            MockOp::WriteGains => "write gains",
            MockOp::SetReference => "set reference",
            MockOp::DutyCycle => "duty cycle",
        }
    }
}

/// 模拟硬件状态
#[derive(Debug, Clone)]
pub struct MockState {
    pub duty: f64,
    pub position: Deg,
    pub velocity: f64,
    pub bus_voltage: Volts,
    pub inverted: bool,
    pub current_limit: Option<Amps>,
    pub leader: Option<(u32, bool)>,
    pub encoder_offset: Option<Deg>,
    pub motor: Option<DcMotor>,
    /// 是否提供原生闭环
    pub native: bool,
    pub written_gains: Vec<Gains>,
    pub references: Vec<(Reference, f64)>,
    pending_failures: HashMap<MockOp, u32>,
    attempts: HashMap<MockOp, u32>,
}

impl Default for MockState {
    fn default() -> Self {
        MockState {
            duty: 0.0,
            position: Deg::ZERO,
            velocity: 0.0,
            bus_voltage: Volts(12.0),
            inverted: false,
            current_limit: None,
            leader: None,
            encoder_offset: None,
            motor: None,
            native: false,
            written_gains: Vec::new(),
            references: Vec::new(),
            pending_failures: HashMap::new(),
            attempts: HashMap::new(),
        }
    }
}

impl MockState {
    /// 记录一次尝试，若仍有编排的失败则返回错误
    fn attempt(&mut self, op: MockOp, actuator: &str) -> Result<(), HalError> {
        *self.attempts.entry(op).or_insert(0) += 1;
        if let Some(remaining) = self.pending_failures.get_mut(&op)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(HalError::ConfigFailed {
                operation: op.as_str(),
                actuator: actuator.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

/// 测试侧句柄
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// 让接下来 `times` 次 `op` 失败
    pub fn fail_next(&self, op: MockOp, times: u32) {
        self.state.lock().pending_failures.insert(op, times);
    }

    pub fn attempts(&self, op: MockOp) -> u32 {
        self.state.lock().attempts.get(&op).copied().unwrap_or(0)
    }

    pub fn set_measurement(&self, position: Deg, velocity: f64) {
        let mut state = self.state.lock();
        state.position = position;
        state.velocity = velocity;
    }

    pub fn set_bus_voltage(&self, voltage: Volts) {
        self.state.lock().bus_voltage = voltage;
    }

    pub fn duty(&self) -> f64 {
        self.state.lock().duty
    }

    pub fn snapshot(&self) -> MockState {
        self.state.lock().clone()
    }
}

/// Mock 电机控制器
#[derive(Debug)]
pub struct MockBinding {
    name: String,
    port: u32,
    state: Arc<Mutex<MockState>>,
    native: MockNativeLoop,
}

/// 原生闭环的 mock 实现
#[derive(Debug)]
struct MockNativeLoop {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockBinding {
    /// 创建 mock 绑定与对应句柄
    pub fn new(port: u32) -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let name = format!("mock#{}", port);
        let binding = MockBinding {
            native: MockNativeLoop {
                name: name.clone(),
                state: Arc::clone(&state),
            },
            name,
            port,
            state: Arc::clone(&state),
        };
        (binding, MockHandle { state })
    }

    /// 提供原生闭环能力
    pub fn with_native_closed_loop(self) -> Self {
        self.state.lock().native = true;
        self
    }

    /// 报告电机参数
    pub fn with_motor(self, motor: DcMotor) -> Self {
        self.state.lock().motor = Some(motor);
        self
    }
}

impl NativeClosedLoop for MockNativeLoop {
    fn write_gains(&mut self, gains: &Gains) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.attempt(MockOp::WriteGains, &self.name)?;
        state.written_gains.push(*gains);
        Ok(())
    }

    fn set_reference(&mut self, reference: Reference, feedforward: f64) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.attempt(MockOp::SetReference, &self.name)?;
        state.references.push((reference, feedforward));
        Ok(())
    }
}

impl MotorBinding for MockBinding {
    fn name(&self) -> &str {
        &self.name
    }

    fn port(&self) -> u32 {
        self.port
    }

    fn set_duty_cycle(&mut self, duty: f64) -> Result<(), HalError> {
        let duty = sanitize_duty(&self.name, duty)?;
        let mut state = self.state.lock();
        state.attempt(MockOp::DutyCycle, &self.name)?;
        state.duty = duty;
        Ok(())
    }

    fn duty_cycle(&self) -> f64 {
        self.state.lock().duty
    }

    fn position(&self) -> Deg {
        self.state.lock().position
    }

    fn velocity(&self) -> f64 {
        self.state.lock().velocity
    }

    fn bus_voltage(&self) -> Volts {
        self.state.lock().bus_voltage
    }

    fn motor(&self) -> Result<DcMotor, HalError> {
        self.state
            .lock()
            .motor
            .ok_or_else(|| HalError::unsupported("motor constants", self.name.as_str()))
    }

    fn native_closed_loop(&mut self) -> Result<&mut dyn NativeClosedLoop, HalError> {
        if self.state.lock().native {
            Ok(&mut self.native as &mut dyn NativeClosedLoop)
        } else {
            Err(HalError::unsupported("native closed loop", self.name.as_str()))
        }
    }

    fn set_current_limit(&mut self, limit: Amps) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.attempt(MockOp::CurrentLimit, &self.name)?;
        state.current_limit = Some(limit);
        Ok(())
    }

    fn set_inverted(&mut self, inverted: bool) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.attempt(MockOp::Inverted, &self.name)?;
        state.inverted = inverted;
        Ok(())
    }

    fn is_inverted(&self) -> bool {
        self.state.lock().inverted
    }

    fn follow(&mut self, leader_port: u32, inverted: bool) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.attempt(MockOp::Follow, &self.name)?;
        state.leader = Some((leader_port, inverted));
        Ok(())
    }

    fn set_encoder_offset(&mut self, offset: Deg) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.attempt(MockOp::EncoderOffset, &self.name)?;
        state.encoder_offset = Some(offset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_failures_then_success() {
        let (mut binding, handle) = MockBinding::new(1);
        handle.fail_next(MockOp::EncoderOffset, 2);
        assert!(binding.set_encoder_offset(Deg(5.0)).is_err());
        assert!(binding.set_encoder_offset(Deg(5.0)).is_err());
        binding.set_encoder_offset(Deg(5.0)).unwrap();
        assert_eq!(handle.attempts(MockOp::EncoderOffset), 3);
        assert_eq!(handle.snapshot().encoder_offset, Some(Deg(5.0)));
    }

    #[test]
    fn test_native_loop_records_writes() {
        let (binding, handle) = MockBinding::new(2);
        let mut binding = binding.with_native_closed_loop();
        let native = binding.native_closed_loop().unwrap();
        native.write_gains(&Gains::new(1.0, 0.0, 0.0)).unwrap();
        native.set_reference(Reference::velocity(100.0), 0.3).unwrap();

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.written_gains.len(), 1);
        assert_eq!(snapshot.references, vec![(Reference::velocity(100.0), 0.3)]);
    }

    #[test]
    fn test_without_native_loop_is_unsupported() {
        let (mut binding, _handle) = MockBinding::new(3);
        assert!(matches!(
            binding.native_closed_loop().err(),
            Some(HalError::Unsupported { .. })
        ));
        assert!(binding.motor().is_err());
    }

    #[test]
    fn test_measurement_from_handle() {
        let (binding, handle) = MockBinding::new(4);
        handle.set_measurement(Deg(270.0), 120.0);
        handle.set_bus_voltage(Volts(11.0));
        assert_eq!(binding.position(), Deg(270.0));
        assert_eq!(binding.velocity(), 120.0);
        assert_eq!(binding.bus_voltage(), Volts(11.0));
    }
}
