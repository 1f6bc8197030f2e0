//! 位置闭环机构（单关节摆臂）
//!
//! 前馈：`kS·sgn(r) + kG·cos(θ_measured) + kV·r`。
//!
//! 边界只用于 advisory 查询，`set_reference` 从不被钳位或拒绝：
//!
//! | 查询 | 条件 |
//! |------|------|
//! | `is_at_maximum` | `θ ≥ max` |
//! | `is_at_minimum` | `θ ≤ min` |
//! | `is_at_starting_position` | `|θ - start| < tolerance` |
//! | `is_at_target` | `|r - θ| < tolerance` |
//!
//! 真实后端的角度被折叠到 (-180°, 180°]，因此配置时要求边界落在 [-180°, 180°] 内，
//! 否则 `is_at_maximum` / `is_at_minimum` 永远不会成立。

use crate::Mechanism;
use crate::actuator::Actuator;
use crate::allocators::Allocators;
use crate::backend::{ActuationBackend, Measurement};
use crate::config::{AngularConfig, MechanismBounds};
use crate::error::MechanismError;
use crate::lifecycle::Lifecycle;
use crate::telemetry::{Canvas, Root, TelemetryFrame, TelemetryValue, TuningKey, Visual};
use actuator_control::{ControlLaw, Reference};
use actuator_hal::FaultFlag;
use actuator_plant::{Deg, PlantModel, SingleJointParams, SingleJointPlant, Volts};
use smallvec::smallvec;
use std::time::Duration;

pub struct AngularMechanism {
    core: Actuator,
    bounds: Option<MechanismBounds>,
    arm_length: f64,
}

impl AngularMechanism {
    pub fn new(name: impl Into<String>, backend: ActuationBackend) -> Self {
        AngularMechanism {
            core: Actuator::new(name, backend),
            bounds: None,
            arm_length: 0.0,
        }
    }

    pub fn configure(
        &mut self,
        config: &AngularConfig,
        allocators: &mut Allocators,
        canvas: &Canvas,
    ) -> Result<(), MechanismError> {
        let law = ControlLaw::new(config.gains)?
            .with_feedforward(config.feedforward)
            .with_tolerance(config.tolerance);

        if !self.core.is_simulated() {
            let bounds = &config.bounds;
            if bounds.max_position > 180.0 || bounds.min_position < -180.0 {
                return Err(MechanismError::Config(format!(
                    "{}: bounds [{}, {}] exceed the wrapped range of a real encoder [-180, 180]",
                    self.core.name(),
                    bounds.min_position,
                    bounds.max_position
                )));
            }
        }

        self.core.apply_hardware_options(&config.hardware)?;

        let plant = match self.core.backend().simulation_motor() {
            Some(motor) => {
                let limits = config.effective_hard_limits();
                PlantModel::SingleJoint(SingleJointPlant::new(
                    motor,
                    SingleJointParams {
                        gearing: config.gearing,
                        mass: config.mass,
                        arm_length: config.arm_length,
                        min_angle: Deg(limits.min),
                        max_angle: Deg(limits.max),
                        simulate_gravity: config.simulate_gravity,
                        starting_angle: Deg(config.bounds.starting_position),
                    },
                ))
            },
            None => PlantModel::None,
        };
        let visual = Visual {
            root: Root::closed_loop(self.core.name(), &config.mount, canvas),
            primary: allocators.colors.next_color(),
            secondary: allocators.colors.next_color(),
        };

        self.core.attach(plant, Some(law), visual)?;
        self.bounds = Some(config.bounds);
        self.arm_length = config.arm_length;
        Ok(())
    }

    /// 设定目标角度（度），不受 advisory 边界约束
    pub fn set_reference(&mut self, degrees: f64) -> Result<(), MechanismError> {
        self.core.set_reference(Reference::position(degrees))
    }

    /// 测量角度
    pub fn position(&self) -> Deg {
        Deg(self.core.measure(Measurement::Position))
    }

    pub fn is_at_maximum(&self) -> bool {
        self.bounds
            .is_some_and(|bounds| self.position().0 >= bounds.max_position)
    }

    pub fn is_at_minimum(&self) -> bool {
        self.bounds
            .is_some_and(|bounds| self.position().0 <= bounds.min_position)
    }

    pub fn is_at_starting_position(&self) -> bool {
        match (self.bounds, self.core.law()) {
            (Some(bounds), Some(law)) => law.is_at_target(bounds.starting_position, self.position().0),
            _ => false,
        }
    }

    pub fn is_at_target(&self) -> bool {
        match (self.core.reference(), self.core.law()) {
            (Some(reference), Some(law)) => law.is_at_target(reference.value, self.position().0),
            _ => false,
        }
    }

    pub fn bounds(&self) -> Option<MechanismBounds> {
        self.bounds
    }

    pub fn effort(&self) -> Volts {
        self.core.effort()
    }

    pub fn core(&self) -> &Actuator {
        &self.core
    }
}

impl Mechanism for AngularMechanism {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.core.lifecycle()
    }

    fn command(&mut self, value: f64) -> Result<(), MechanismError> {
        self.set_reference(value)
    }

    fn reference(&self) -> Option<Reference> {
        self.core.reference()
    }

    fn update(&mut self, dt: Duration) -> Result<(), MechanismError> {
        self.core.update_closed_loop(Measurement::Position, dt)
    }

    fn draw(&self) -> TelemetryFrame {
        let measurement = self.position().0;
        let setpoint = self.core.reference().map(|r| r.value).unwrap_or_else(|| {
            self.bounds.map_or(measurement, |bounds| bounds.starting_position)
        });
        let output = self.core.output();

        let ligaments = match self.core.visual() {
            Some(visual) => smallvec![
                visual.ligament("arm", self.arm_length, measurement, visual.primary),
                visual.ligament("setpoint", self.arm_length, setpoint, visual.secondary),
            ],
            None => smallvec![],
        };
        let values = smallvec![
            TelemetryValue {
                name: "reference",
                value: setpoint,
            },
            TelemetryValue {
                name: "measurement",
                value: measurement,
            },
            TelemetryValue {
                name: "effort",
                value: output.effort.0,
            },
            TelemetryValue {
                name: "feedforward",
                value: output.feedforward,
            },
        ];
        self.core.frame(ligaments, values)
    }

    fn simulation_step(&mut self, dt: Duration) {
        self.core.simulation_step(dt);
    }

    fn is_simulated(&self) -> bool {
        self.core.is_simulated()
    }

    fn apply_tuning(&mut self, key: TuningKey, value: f64) -> Result<(), MechanismError> {
        if key == TuningKey::Ka {
            return Err(MechanismError::UnsupportedTuning {
                mechanism: self.core.name().to_string(),
                key,
            });
        }
        self.core.apply_law_tuning(key, value)
    }

    fn on_time_jump(&mut self, dt: Duration) {
        self.core.on_time_jump(dt);
    }

    fn faults(&self) -> &FaultFlag {
        self.core.faults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ClosedLoopSource;
    use crate::config::HardLimits;
    use actuator_control::{FeedforwardModel, Gains};
    use actuator_hal::{MockBinding, MockOp};
    use actuator_plant::{DcMotor, SIM_STEP, SupplyRail};

    fn arm_config() -> AngularConfig {
        AngularConfig {
            gearing: 20.0,
            mass: 2.0,
            arm_length: 0.5,
            bounds: MechanismBounds {
                min_position: -90.0,
                max_position: 180.0,
                starting_position: 0.0,
            },
            hard_limits: Some(HardLimits { min: -90.0, max: 180.0 }),
            gains: Gains::new(0.3, 0.0, 0.01),
            feedforward: FeedforwardModel::new(0.0, 0.0, 0.0, 2.26),
            ..AngularConfig::default()
        }
    }

    fn sim_arm() -> AngularMechanism {
        AngularMechanism::new(
            "arm",
            ActuationBackend::simulated(0, DcMotor::neo(1), SupplyRail::default()),
        )
    }

    #[test]
    fn test_reaches_reference() {
        let mut arm = sim_arm();
        let mut allocators = Allocators::new();
        arm.configure(&arm_config(), &mut allocators, &Canvas::default())
            .unwrap();
        arm.set_reference(90.0).unwrap();

        for _ in 0..150 {
            arm.update(SIM_STEP).unwrap();
            arm.simulation_step(SIM_STEP);
        }
        assert!((arm.position().0 - 90.0).abs() < 2.0, "{}", arm.position());
        assert!(arm.is_at_target());
    }

    #[test]
    fn test_bounds_are_advisory() {
        let mut arm = sim_arm();
        let mut allocators = Allocators::new();
        arm.configure(&arm_config(), &mut allocators, &Canvas::default())
            .unwrap();

        // 超出 advisory 上限的参考值照常接受
        arm.set_reference(250.0).unwrap();
        assert_eq!(arm.reference().map(|r| r.value), Some(250.0));
    }

    #[test]
    fn test_boundary_queries_independent_of_lifecycle() {
        let (binding, handle) = MockBinding::new(41);
        let mut arm = AngularMechanism::new(
            "arm",
            ActuationBackend::real(Box::new(binding), ClosedLoopSource::Local),
        );
        let mut allocators = Allocators::new();
        arm.configure(&arm_config(), &mut allocators, &Canvas::default())
            .unwrap();
        assert_eq!(arm.lifecycle(), Lifecycle::Configured);

        handle.set_measurement(Deg(180.0), 0.0);
        assert!(arm.is_at_maximum());
        assert!(!arm.is_at_minimum());

        handle.set_measurement(Deg(-90.0), 0.0);
        assert!(arm.is_at_minimum());

        handle.set_measurement(Deg(1.0), 0.0);
        assert!(arm.is_at_starting_position());

        arm.set_reference(45.0).unwrap();
        handle.set_measurement(Deg(180.0), 0.0);
        assert!(arm.is_at_maximum());
    }

    #[test]
    fn test_real_backend_rejects_unreachable_bounds() {
        let mut allocators = Allocators::new();
        for (min, max) in [(-90.0, 270.0), (-200.0, 90.0)] {
            let (binding, _handle) = MockBinding::new(43);
            let mut arm = AngularMechanism::new(
                "arm",
                ActuationBackend::real(Box::new(binding), ClosedLoopSource::Local),
            );
            let config = AngularConfig {
                bounds: MechanismBounds {
                    min_position: min,
                    max_position: max,
                    starting_position: 0.0,
                },
                ..arm_config()
            };
            let err = arm
                .configure(&config, &mut allocators, &Canvas::default())
                .unwrap_err();
            assert!(matches!(err, MechanismError::Config(_)));
            assert_eq!(arm.lifecycle(), Lifecycle::Unconfigured);
        }

        // 仿真角度不折叠，同样的边界可用
        let mut arm = sim_arm();
        let config = AngularConfig {
            bounds: MechanismBounds {
                min_position: -90.0,
                max_position: 270.0,
                starting_position: 0.0,
            },
            hard_limits: None,
            ..arm_config()
        };
        arm.configure(&config, &mut allocators, &Canvas::default())
            .unwrap();
        assert_eq!(arm.lifecycle(), Lifecycle::Configured);
    }

    #[test]
    fn test_real_angle_is_wrapped() {
        let (binding, handle) = MockBinding::new(42);
        let mut arm = AngularMechanism::new(
            "arm",
            ActuationBackend::real(Box::new(binding), ClosedLoopSource::Local),
        );
        let mut allocators = Allocators::new();
        arm.configure(&arm_config(), &mut allocators, &Canvas::default())
            .unwrap();
        handle.set_measurement(Deg(350.0), 0.0);
        assert!((arm.position().0 + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_encoder_offset_retried() {
        let (binding, handle) = MockBinding::new(43);
        handle.fail_next(MockOp::EncoderOffset, 3);
        let mut arm = AngularMechanism::new(
            "arm",
            ActuationBackend::real(Box::new(binding), ClosedLoopSource::Local),
        );
        let mut config = arm_config();
        config.hardware.encoder_offset = Some(37.5);
        let mut allocators = Allocators::new();
        arm.configure(&config, &mut allocators, &Canvas::default())
            .unwrap();

        assert_eq!(handle.attempts(MockOp::EncoderOffset), 4);
        assert_eq!(handle.snapshot().encoder_offset, Some(Deg(37.5)));
        assert!(!arm.faults().is_raised());
    }

    #[test]
    fn test_draw_uses_arm_length() {
        let mut arm = sim_arm();
        let mut allocators = Allocators::new();
        arm.configure(&arm_config(), &mut allocators, &Canvas::default())
            .unwrap();
        arm.set_reference(60.0).unwrap();

        let frame = arm.draw();
        let setpoint = frame.ligament("-setpoint").unwrap();
        assert_eq!(setpoint.name, "arm-setpoint");
        assert_eq!(setpoint.length, 0.5);
        assert_eq!(setpoint.angle, 60.0);
        assert_eq!(frame.ligament("-arm").map(|l| l.angle), Some(0.0));
    }

    #[test]
    fn test_unconfigured_queries_are_false() {
        let arm = sim_arm();
        assert!(!arm.is_at_maximum());
        assert!(!arm.is_at_minimum());
        assert!(!arm.is_at_target());
        assert!(arm.draw().ligaments.is_empty());
    }
}
