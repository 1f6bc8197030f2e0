//! 速度闭环机构（飞轮）

use crate::Mechanism;
use crate::actuator::Actuator;
use crate::allocators::Allocators;
use crate::backend::{ActuationBackend, Measurement};
use crate::config::VelocityConfig;
use crate::error::MechanismError;
use crate::lifecycle::Lifecycle;
use crate::telemetry::{
    Canvas, DIAL_LENGTH, Root, TelemetryFrame, TelemetryValue, TuningKey, Visual, dial_angle,
};
use actuator_control::{ControlLaw, Reference};
use actuator_hal::FaultFlag;
use actuator_plant::{InertialPlant, PlantModel, Volts};
use smallvec::smallvec;
use std::time::Duration;

pub struct VelocityMechanism {
    core: Actuator,
    /// 速度表满量程（RPM）
    max_rpm: f64,
}

impl VelocityMechanism {
    pub fn new(name: impl Into<String>, backend: ActuationBackend) -> Self {
        VelocityMechanism {
            core: Actuator::new(name, backend),
            max_rpm: 0.0,
        }
    }

    /// 配置
    ///
    /// 速度表满量程依次取 `config.max_rpm`、仿真模型空载转速、绑定报告的电机；
    /// 都没有，或结果不是有限正数（例如减速比为 0）时返回 [`MechanismError::Config`]。
    pub fn configure(
        &mut self,
        config: &VelocityConfig,
        allocators: &mut Allocators,
        canvas: &Canvas,
    ) -> Result<(), MechanismError> {
        let law = ControlLaw::new(config.gains)?
            .with_feedforward(config.feedforward)
            .with_tolerance(config.tolerance);

        self.core.apply_hardware_options(&config.hardware)?;

        let plant = match self.core.backend().simulation_motor() {
            Some(motor) => PlantModel::Inertial(
                InertialPlant::new(motor, config.gearing, config.moment_of_inertia)
                    .with_friction(config.friction),
            ),
            None => PlantModel::None,
        };
        let visual = Visual {
            root: Root::closed_loop(self.core.name(), &config.mount, canvas),
            primary: allocators.colors.next_color(),
            secondary: allocators.colors.next_color(),
        };

        let max_rpm = config
            .max_rpm
            .or_else(|| plant.free_speed_rpm())
            .or_else(|| self.core.free_speed_rpm())
            .ok_or_else(|| {
                MechanismError::Config(format!(
                    "{}: max_rpm is required when the binding reports no motor",
                    self.core.name()
                ))
            })?;
        if !(max_rpm.is_finite() && max_rpm > 0.0) {
            return Err(MechanismError::Config(format!(
                "{}: max_rpm must be positive and finite, got {}",
                self.core.name(),
                max_rpm
            )));
        }

        self.core.attach(plant, Some(law), visual)?;
        self.max_rpm = max_rpm;
        Ok(())
    }

    /// 设定目标速度（RPM）
    pub fn set_reference(&mut self, rpm: f64) -> Result<(), MechanismError> {
        self.core.set_reference(Reference::velocity(rpm))
    }

    /// 测量速度（RPM）
    pub fn velocity(&self) -> f64 {
        self.core.measure(Measurement::Velocity)
    }

    /// `|reference - measurement| < tolerance`，没有参考值时为 false
    pub fn is_at_target(&self) -> bool {
        match (self.core.reference(), self.core.law()) {
            (Some(reference), Some(law)) => law.is_at_target(reference.value, self.velocity()),
            _ => false,
        }
    }

    pub fn effort(&self) -> Volts {
        self.core.effort()
    }

    pub fn max_rpm(&self) -> f64 {
        self.max_rpm
    }

    pub fn core(&self) -> &Actuator {
        &self.core
    }
}

impl Mechanism for VelocityMechanism {
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
        self.core.update_closed_loop(Measurement::Velocity, dt)
    }

    fn draw(&self) -> TelemetryFrame {
        let measurement = self.velocity();
        let setpoint = self.core.reference().map_or(0.0, |r| r.value);
        let output = self.core.output();

        let ligaments = match self.core.visual() {
            Some(visual) if self.max_rpm > 0.0 => smallvec![
                visual.ligament(
                    "velocity",
                    DIAL_LENGTH,
                    dial_angle(measurement, self.max_rpm),
                    visual.primary,
                ),
                visual.ligament(
                    "setpoint",
                    DIAL_LENGTH,
                    dial_angle(setpoint, self.max_rpm),
                    visual.secondary,
                ),
            ],
            _ => smallvec![],
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
        if key == TuningKey::Kg {
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
