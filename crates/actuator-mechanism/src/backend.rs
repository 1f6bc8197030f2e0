//! Actuation Backend
//!
//! 构造时一次性选定测量与 effort 的来源，之后的调用点不再区分真实/仿真：
//!
//! | 后端 | 测量来源 | effort |
//! |------|----------|--------|
//! | `Real` + `Native` | 绑定编码器 | 增益写入控制器寄存器，每周期只下发参考值 + 前馈 |
//! | `Real` + `Local` | 绑定编码器 | 本地计算，`duty = effort / bus_voltage` |
//! | `Simulated` | Plant Model | 本地计算，`duty = effort / supply_voltage`，电压施加给模型 |
//!
//! 真实硬件的角度读数折返到 (-180°, 180°]。

use actuator_control::{ControlLaw, Gains, LawOutput, Reference};
use actuator_hal::{
    FaultFlag, HalError, MotorBinding, SimulatedBinding, configure_with_retry,
};
use actuator_plant::{DcMotor, PlantModel, SupplyRail, Volts};
use std::time::Duration;

/// 真实硬件上闭环的计算位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedLoopSource {
    /// 控制器内置闭环（增益寄存器透传）
    Native,
    /// 本地计算后写占空比
    Local,
}

/// 测量量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    /// 速度（RPM）
    Velocity,
    /// 位置（度）
    Position,
}

/// 执行后端
pub enum ActuationBackend {
    Real {
        binding: Box<dyn MotorBinding>,
        closed_loop: ClosedLoopSource,
        /// 绑定拒绝原生闭环后记住该错误，之后直接失败
        native_refusal: Option<HalError>,
    },
    Simulated {
        binding: SimulatedBinding,
        supply: SupplyRail,
    },
}

/// effort（V）折算为占空比，母线掉电时输出 0
fn duty_for(effort: Volts, supply: Volts) -> f64 {
    if supply.0.abs() < 1e-9 { 0.0 } else { effort.0 / supply.0 }
}

impl ActuationBackend {
    pub fn real(binding: Box<dyn MotorBinding>, closed_loop: ClosedLoopSource) -> Self {
        ActuationBackend::Real {
            binding,
            closed_loop,
            native_refusal: None,
        }
    }

    /// 仿真后端，端口号应来自 [`SimPortAllocator`](crate::SimPortAllocator)
    pub fn simulated(port: u32, motor: DcMotor, supply: SupplyRail) -> Self {
        ActuationBackend::Simulated {
            binding: SimulatedBinding::new(port, motor),
            supply,
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, ActuationBackend::Simulated { .. })
    }

    pub fn binding(&self) -> &dyn MotorBinding {
        match self {
            ActuationBackend::Real { binding, .. } => binding.as_ref(),
            ActuationBackend::Simulated { binding, .. } => binding,
        }
    }

    pub fn binding_mut(&mut self) -> &mut dyn MotorBinding {
        match self {
            ActuationBackend::Real { binding, .. } => binding.as_mut(),
            ActuationBackend::Simulated { binding, .. } => binding,
        }
    }

    /// 仿真用电机参数（真实后端为 `None`）
    pub fn simulation_motor(&self) -> Option<DcMotor> {
        match self {
            ActuationBackend::Simulated { binding, .. } => binding.motor().ok(),
            ActuationBackend::Real { .. } => None,
        }
    }

    /// 电机参数（若绑定提供）
    pub fn motor(&self) -> Option<DcMotor> {
        self.binding().motor().ok()
    }

    pub fn measure(&self, plant: &PlantModel, what: Measurement) -> f64 {
        match (self, what) {
            (ActuationBackend::Simulated { .. }, Measurement::Velocity) => plant.velocity(),
            (ActuationBackend::Simulated { .. }, Measurement::Position) => plant.position().0,
            (ActuationBackend::Real { binding, .. }, Measurement::Velocity) => binding.velocity(),
            (ActuationBackend::Real { binding, .. }, Measurement::Position) => {
                binding.position().wrap_signed().0
            },
        }
    }

    /// 配置阶段准备闭环
    ///
    /// 原生闭环时把增益写入寄存器（有界重试）；绑定不支持时立即失败，
    /// 并记住拒绝，之后不再询问绑定。
    pub fn prepare_closed_loop(&mut self, gains: &Gains, fault: &FaultFlag) -> Result<(), HalError> {
        let ActuationBackend::Real {
            binding,
            closed_loop: ClosedLoopSource::Native,
            native_refusal,
        } = self
        else {
            return Ok(());
        };

        if let Some(err) = native_refusal {
            return Err(err.clone());
        }

        let native = match binding.native_closed_loop() {
            Ok(native) => native,
            Err(err) => {
                tracing::warn!("{}: native closed loop refused: {}", binding.name(), err);
                *native_refusal = Some(err.clone());
                return Err(err);
            },
        };

        configure_with_retry("write gains", fault, |_| native.write_gains(gains))?;
        Ok(())
    }

    /// 一个周期的闭环施加
    pub fn apply_closed_loop(
        &mut self,
        law: &mut ControlLaw,
        plant: &mut PlantModel,
        reference: Reference,
        measurement: f64,
        dt: Duration,
    ) -> Result<LawOutput, HalError> {
        match self {
            ActuationBackend::Real {
                binding,
                closed_loop: ClosedLoopSource::Native,
                native_refusal,
            } => {
                if let Some(err) = native_refusal {
                    return Err(err.clone());
                }
                let native = match binding.native_closed_loop() {
                    Ok(native) => native,
                    Err(err) => {
                        *native_refusal = Some(err.clone());
                        return Err(err);
                    },
                };
                let feedforward = law.calculate_feedforward(reference, measurement, dt);
                native.set_reference(reference, feedforward)?;
                Ok(LawOutput {
                    error: reference.value - measurement,
                    feedforward,
                    ..LawOutput::default()
                })
            },
            ActuationBackend::Real {
                binding,
                closed_loop: ClosedLoopSource::Local,
                ..
            } => {
                let output = law.calculate(reference, measurement, dt);
                let bus = binding.bus_voltage();
                binding.set_duty_cycle(duty_for(output.effort, bus))?;
                Ok(output)
            },
            ActuationBackend::Simulated { binding, supply } => {
                let output = law.calculate(reference, measurement, dt);
                let voltage = supply.voltage();
                binding.set_bus_voltage(voltage);
                binding.set_duty_cycle(duty_for(output.effort, voltage))?;
                plant.set_input(output.effort);
                Ok(output)
            },
        }
    }

    /// 开环占空比
    pub fn apply_percent(&mut self, plant: &mut PlantModel, duty: f64) -> Result<(), HalError> {
        match self {
            ActuationBackend::Real { binding, .. } => binding.set_duty_cycle(duty),
            ActuationBackend::Simulated { binding, supply } => {
                binding.set_duty_cycle(duty)?;
                let voltage = supply.voltage();
                binding.set_bus_voltage(voltage);
                plant.set_input(binding.applied_voltage(voltage));
                Ok(())
            },
        }
    }

    /// 推进物理模型并回写编码器、上报电流（真实后端为空操作）
    pub fn step(&mut self, plant: &mut PlantModel, dt: Duration) {
        if let ActuationBackend::Simulated { binding, supply } = self {
            plant.step(dt);
            binding.sync_encoder(plant.position(), plant.velocity());
            supply.report(binding.port(), plant.current_draw());
        }
    }

    /// 停止输出
    pub fn stop(&mut self, plant: &mut PlantModel) -> Result<(), HalError> {
        plant.set_input(Volts::ZERO);
        self.binding_mut().stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actuator_control::FeedforwardModel;
    use actuator_hal::{MockBinding, MockOp};
    use actuator_plant::{Deg, InertialPlant, SIM_STEP};

    const DT: Duration = Duration::from_millis(20);

    fn law() -> ControlLaw {
        ControlLaw::new(Gains::new(0.1, 0.0, 0.0)).unwrap()
    }

    #[test]
    fn test_duty_for_guards_dead_supply() {
        assert_eq!(duty_for(Volts(6.0), Volts(12.0)), 0.5);
        assert_eq!(duty_for(Volts(6.0), Volts(0.0)), 0.0);
    }

    #[test]
    fn test_simulated_applies_effort_to_plant() {
        let supply = SupplyRail::default();
        let mut backend = ActuationBackend::simulated(0, DcMotor::neo(1), supply.clone());
        let mut plant = PlantModel::Inertial(InertialPlant::new(DcMotor::neo(1), 1.0, 0.01));
        let mut law = law();

        let out = backend
            .apply_closed_loop(&mut law, &mut plant, Reference::velocity(30.0), 0.0, DT)
            .unwrap();
        assert_eq!(out.effort, Volts(3.0));
        assert_eq!(plant.input(), Volts(3.0));
        assert_eq!(backend.binding().duty_cycle(), 0.25);

        backend.step(&mut plant, SIM_STEP);
        assert!(backend.binding().velocity() > 0.0);
        assert!(supply.total_current().0 > 0.0);
    }

    #[test]
    fn test_real_local_writes_duty_from_bus_voltage() {
        let (binding, handle) = MockBinding::new(1);
        handle.set_bus_voltage(Volts(10.0));
        handle.set_measurement(Deg(0.0), 0.0);
        let mut backend = ActuationBackend::real(Box::new(binding), ClosedLoopSource::Local);
        let mut plant = PlantModel::None;
        let mut law = law();

        backend
            .apply_closed_loop(&mut law, &mut plant, Reference::velocity(50.0), 0.0, DT)
            .unwrap();
        assert!((handle.duty() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_real_native_forwards_reference_and_feedforward() {
        let (binding, handle) = MockBinding::new(2);
        let binding = binding.with_native_closed_loop();
        let mut backend = ActuationBackend::real(Box::new(binding), ClosedLoopSource::Native);
        let mut plant = PlantModel::None;
        let fault = FaultFlag::new();
        let mut law = law().with_feedforward(FeedforwardModel::new(0.0, 0.0, 0.0, 2.0));

        backend.prepare_closed_loop(law.gains(), &fault).unwrap();
        let out = backend
            .apply_closed_loop(&mut law, &mut plant, Reference::position(45.0), 0.0, DT)
            .unwrap();

        assert_eq!(out.feedforward, 2.0);
        assert_eq!(law.evaluations(), 0);
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.written_gains, vec![*law.gains()]);
        assert_eq!(snapshot.references, vec![(Reference::position(45.0), 2.0)]);
    }

    #[test]
    fn test_native_refusal_is_sticky() {
        let (binding, _handle) = MockBinding::new(3);
        let mut backend = ActuationBackend::real(Box::new(binding), ClosedLoopSource::Native);
        let fault = FaultFlag::new();

        let first = backend.prepare_closed_loop(&Gains::default(), &fault);
        assert!(matches!(first, Err(HalError::Unsupported { .. })));
        let ActuationBackend::Real { native_refusal, .. } = &backend else {
            panic!("expected real backend");
        };
        assert!(native_refusal.is_some());

        let mut plant = PlantModel::None;
        let mut law = law();
        let again = backend.apply_closed_loop(&mut law, &mut plant, Reference::velocity(1.0), 0.0, DT);
        assert!(matches!(again, Err(HalError::Unsupported { .. })));
        // 拒绝不是瞬时故障，不置位故障标志
        assert!(!fault.is_raised());
    }

    #[test]
    fn test_write_gains_retry_exhaustion_raises_fault() {
        let (binding, handle) = MockBinding::new(4);
        let binding = binding.with_native_closed_loop();
        handle.fail_next(MockOp::WriteGains, 10);
        let mut backend = ActuationBackend::real(Box::new(binding), ClosedLoopSource::Native);
        let fault = FaultFlag::new();

        backend.prepare_closed_loop(&Gains::default(), &fault).unwrap();
        assert!(fault.is_raised());
        assert_eq!(handle.attempts(MockOp::WriteGains), actuator_hal::MAX_CONFIG_ATTEMPTS);
    }

    #[test]
    fn test_real_position_wraps() {
        let (binding, handle) = MockBinding::new(5);
        handle.set_measurement(Deg(270.0), 0.0);
        let backend = ActuationBackend::real(Box::new(binding), ClosedLoopSource::Local);
        let measured = backend.measure(&PlantModel::None, Measurement::Position);
        assert!((measured + 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_simulated_percent_uses_supply_and_inversion() {
        let supply = SupplyRail::default();
        let mut backend = ActuationBackend::simulated(6, DcMotor::neo(1), supply);
        backend.binding_mut().set_inverted(true).unwrap();
        let mut plant = PlantModel::Inertial(InertialPlant::new(DcMotor::neo(1), 1.0, 0.01));

        backend.apply_percent(&mut plant, 0.5).unwrap();
        assert_eq!(plant.input(), Volts(-6.0));

        backend.stop(&mut plant).unwrap();
        assert_eq!(plant.input(), Volts::ZERO);
        assert_eq!(backend.binding().duty_cycle(), 0.0);
    }
}
