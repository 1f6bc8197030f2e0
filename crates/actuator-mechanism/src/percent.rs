//! 开环百分比机构
//!
//! `set(speed)` 直接写占空比，不经过任何控制律；
//! 仿真时占空比乘以当前供电电压施加给惯性模型，只用于产生速度读数。

use crate::Mechanism;
use crate::actuator::Actuator;
use crate::allocators::Allocators;
use crate::backend::{ActuationBackend, Measurement};
use crate::config::PercentConfig;
use crate::error::MechanismError;
use crate::lifecycle::Lifecycle;
use crate::telemetry::{
    Canvas, DIAL_LENGTH, Root, TelemetryFrame, TelemetryValue, TuningKey, Visual, percent_angle,
};
use actuator_control::Reference;
use actuator_hal::FaultFlag;
use actuator_plant::{InertialPlant, PlantModel};
use smallvec::smallvec;
use std::time::Duration;

pub struct PercentMechanism {
    core: Actuator,
    duty: f64,
}

impl PercentMechanism {
    pub fn new(name: impl Into<String>, backend: ActuationBackend) -> Self {
        PercentMechanism {
            core: Actuator::new(name, backend),
            duty: 0.0,
        }
    }

    /// 配置：写入硬件选项、挂载仿真模型与可视化
    pub fn configure(
        &mut self,
        config: &PercentConfig,
        allocators: &mut Allocators,
        canvas: &Canvas,
    ) -> Result<(), MechanismError> {
        self.core.apply_hardware_options(&config.hardware)?;

        let plant = match self.core.backend().simulation_motor() {
            Some(motor) => PlantModel::Inertial(InertialPlant::new(
                motor,
                config.gearing,
                config.moment_of_inertia,
            )),
            None => PlantModel::None,
        };
        let visual = Visual {
            root: Root::percent(self.core.name(), &config.mount, canvas),
            primary: allocators.colors.next_color(),
            secondary: allocators.colors.next_color(),
        };

        self.core.attach(plant, None, visual)
    }

    /// 设定占空比，钳位到 [-1, 1]
    pub fn set(&mut self, speed: f64) -> Result<(), MechanismError> {
        if speed.is_nan() {
            return Err(MechanismError::Config(format!(
                "{}: NaN duty cycle",
                self.core.name()
            )));
        }
        let duty = speed.clamp(-1.0, 1.0);
        self.core.set_reference(Reference::percent(duty))?;
        self.duty = duty;
        self.core.update_open_loop(duty)
    }

    pub fn duty(&self) -> f64 {
        self.duty
    }

    /// 输出轴速度（RPM）
    pub fn velocity(&self) -> f64 {
        self.core.measure(Measurement::Velocity)
    }

    /// 控制律被调用的次数（恒为 0）
    pub fn control_law_evaluations(&self) -> u64 {
        self.core.law().map_or(0, |law| law.evaluations())
    }

    pub fn core(&self) -> &Actuator {
        &self.core
    }
}

impl Mechanism for PercentMechanism {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.core.lifecycle()
    }

    fn command(&mut self, value: f64) -> Result<(), MechanismError> {
        self.set(value)
    }

    fn reference(&self) -> Option<Reference> {
        self.core.reference()
    }

    fn update(&mut self, _dt: Duration) -> Result<(), MechanismError> {
        // 供电电压随负载变化，每周期重新施加
        self.core.update_open_loop(self.duty)
    }

    fn draw(&self) -> TelemetryFrame {
        let ligaments = match self.core.visual() {
            Some(visual) => smallvec![visual.ligament(
                "speed",
                DIAL_LENGTH,
                percent_angle(self.duty),
                visual.primary,
            )],
            None => smallvec![],
        };
        let values = smallvec![
            TelemetryValue {
                name: "duty",
                value: self.duty,
            },
            TelemetryValue {
                name: "velocity",
                value: self.velocity(),
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

    fn apply_tuning(&mut self, key: TuningKey, _value: f64) -> Result<(), MechanismError> {
        Err(MechanismError::UnsupportedTuning {
            mechanism: self.core.name().to_string(),
            key,
        })
    }

    fn on_time_jump(&mut self, dt: Duration) {
        self.core.on_time_jump(dt);
    }

    fn faults(&self) -> &FaultFlag {
        self.core.faults()
    }
}
