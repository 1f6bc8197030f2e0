//! 仿真场景
//!
//! 从 TOML 描述组装一组仿真机构、共享母线与调度器，
//! 并按周期序号下发参考值与调参。
//!
//! ```toml
//! [loop]
//! frequency_hz = 50.0
//!
//! [[mechanisms]]
//! name = "flywheel"
//! kind = "velocity"
//! motor = "neo"
//! moment_of_inertia = 0.004
//! gains = { kp = 0.01 }
//!
//! [[commands]]
//! tick = 0
//! mechanism = "flywheel"
//! value = 3000.0
//! ```

use crate::Mechanism;
use crate::allocators::Allocators;
use crate::angular::AngularMechanism;
use crate::backend::ActuationBackend;
use crate::config::{AngularConfig, PercentConfig, VelocityConfig};
use crate::error::MechanismError;
use crate::percent::PercentMechanism;
use crate::scheduler::{LoopConfig, Scheduler, TickReport};
use crate::telemetry::{Canvas, TuningKey};
use crate::velocity::VelocityMechanism;
use actuator_plant::{BatteryModel, DcMotor, SupplyRail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// 电机预设
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorPreset {
    #[default]
    Neo,
    Neo550,
}

impl MotorPreset {
    pub fn build(self, count: u32) -> DcMotor {
        match self {
            MotorPreset::Neo => DcMotor::neo(count),
            MotorPreset::Neo550 => DcMotor::neo550(count),
        }
    }
}

/// 机构变体及其参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MechanismKind {
    Percent(PercentConfig),
    Velocity(VelocityConfig),
    Angular(AngularConfig),
}

/// 一个机构的描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismSpec {
    pub name: String,
    #[serde(default)]
    pub motor: MotorPreset,
    #[serde(default = "default_motor_count")]
    pub motor_count: u32,
    /// 仿真端口，缺省由分配器给出
    #[serde(default)]
    pub port: Option<u32>,
    #[serde(flatten)]
    pub kind: MechanismKind,
}

fn default_motor_count() -> u32 {
    1
}

/// 在指定周期下发的参考值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    pub tick: u64,
    pub mechanism: String,
    pub value: f64,
}

/// 在指定周期下发的调参
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTuning {
    pub tick: u64,
    pub mechanism: String,
    pub key: TuningKey,
    pub value: f64,
}

/// 场景文件
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub canvas: Canvas,
    pub battery: BatteryModel,
    #[serde(rename = "loop")]
    pub loop_config: LoopConfig,
    pub mechanisms: Vec<MechanismSpec>,
    pub commands: Vec<ScheduledCommand>,
    pub tuning: Vec<ScheduledTuning>,
}

impl ScenarioConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, MechanismError> {
        toml::from_str(text).map_err(|e| MechanismError::Config(format!("invalid scenario: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MechanismError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MechanismError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// 组装仿真
    pub fn build(&self) -> Result<SimulationRun, MechanismError> {
        let mut allocators = Allocators::new();
        let supply = SupplyRail::new(self.battery);
        let mut scheduler = Scheduler::new(self.loop_config.clone())?;

        // 先预留显式端口，避免被自动分配占用
        for spec in &self.mechanisms {
            if let Some(port) = spec.port {
                allocators.ports.reserve(port)?;
            }
        }

        for spec in &self.mechanisms {
            let port = match spec.port {
                Some(port) => port,
                None => allocators.ports.allocate(),
            };
            let backend = ActuationBackend::simulated(
                port,
                spec.motor.build(spec.motor_count),
                supply.clone(),
            );

            let mechanism: Box<dyn Mechanism> = match &spec.kind {
                MechanismKind::Percent(config) => {
                    let mut m = PercentMechanism::new(spec.name.clone(), backend);
                    m.configure(config, &mut allocators, &self.canvas)?;
                    Box::new(m)
                },
                MechanismKind::Velocity(config) => {
                    let mut m = VelocityMechanism::new(spec.name.clone(), backend);
                    m.configure(config, &mut allocators, &self.canvas)?;
                    Box::new(m)
                },
                MechanismKind::Angular(config) => {
                    let mut m = AngularMechanism::new(spec.name.clone(), backend);
                    m.configure(config, &mut allocators, &self.canvas)?;
                    Box::new(m)
                },
            };
            scheduler.add(mechanism)?;
        }

        let known = |name: &str| self.mechanisms.iter().any(|m| m.name == name);
        for name in self
            .commands
            .iter()
            .map(|c| c.mechanism.as_str())
            .chain(self.tuning.iter().map(|t| t.mechanism.as_str()))
        {
            if !known(name) {
                return Err(MechanismError::UnknownMechanism(name.to_string()));
            }
        }

        let mut commands = self.commands.clone();
        commands.sort_by_key(|c| c.tick);
        let mut tuning = self.tuning.clone();
        tuning.sort_by_key(|t| t.tick);

        tracing::info!(
            "Scenario built: {} mechanisms, {} commands, {} tuning updates",
            scheduler.len(),
            commands.len(),
            tuning.len()
        );

        Ok(SimulationRun {
            scheduler,
            supply,
            commands,
            tuning,
        })
    }
}

/// 组装好的仿真
pub struct SimulationRun {
    pub scheduler: Scheduler,
    pub supply: SupplyRail,
    commands: Vec<ScheduledCommand>,
    tuning: Vec<ScheduledTuning>,
}

impl SimulationRun {
    /// 下发到期的命令与调参，然后执行一个周期
    ///
    /// 命令失败（例如非法占空比）只记录日志。
    pub fn step(&mut self) -> TickReport {
        let tick = self.scheduler.ticks();

        let sender = self.scheduler.tuning_sender();
        for update in self.tuning.iter().filter(|t| t.tick == tick) {
            if !sender.send(update.mechanism.clone(), update.key, update.value) {
                tracing::warn!("Tuning queue full, dropped {} for '{}'", update.key, update.mechanism);
            }
        }

        let due: Vec<ScheduledCommand> = self
            .commands
            .iter()
            .filter(|c| c.tick == tick)
            .cloned()
            .collect();
        for command in due {
            if let Err(err) = self.scheduler.command(&command.mechanism, command.value) {
                tracing::warn!("Scheduled command at tick {} failed: {}", tick, err);
            }
        }

        let period = self.scheduler.period();
        self.scheduler.tick(period)
    }

    /// 运行 `ticks` 个周期
    ///
    /// `realtime` 时按标称周期用 `spin_sleep` 对齐墙钟，否则尽快运行。
    /// `stop` 置位时提前结束，返回实际执行的周期数。
    pub fn run<F>(&mut self, ticks: u64, realtime: bool, stop: &AtomicBool, mut on_tick: F) -> u64
    where
        F: FnMut(&Scheduler, &TickReport),
    {
        let sleeper = spin_sleep::SpinSleeper::default();
        let period = self.scheduler.period();
        let mut executed = 0;

        while executed < ticks && !stop.load(Ordering::Acquire) {
            let started = Instant::now();
            let report = self.step();
            on_tick(&self.scheduler, &report);
            executed += 1;

            if realtime {
                let elapsed = started.elapsed();
                if elapsed < period {
                    sleeper.sleep(period - elapsed);
                }
            }
        }
        executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Lifecycle;
    use std::io::Write;

    const SCENARIO: &str = r#"
[battery]
nominal_voltage = 12.5

[[mechanisms]]
name = "flywheel"
kind = "velocity"
moment_of_inertia = 0.004
max_rpm = 6000
gains = { kp = 0.01 }

[[mechanisms]]
name = "arm"
kind = "angular"
gearing = 20
mass = 2.0
port = 0
gains = { kp = 0.3, kd = 0.01 }
feedforward = { kg = 2.26 }
bounds = { min_position = -90, max_position = 180 }

[[mechanisms]]
name = "intake"
kind = "percent"
motor = "neo550"

[[commands]]
tick = 0
mechanism = "arm"
value = 90.0

[[commands]]
tick = 5
mechanism = "intake"
value = 0.5

[[tuning]]
tick = 10
mechanism = "flywheel"
key = "kv"
value = 0.002
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = ScenarioConfig::from_toml_str(SCENARIO).unwrap();
        assert_eq!(scenario.mechanisms.len(), 3);
        assert_eq!(scenario.battery.nominal_voltage, 12.5);
        assert_eq!(scenario.loop_config, LoopConfig::default());
        assert_eq!(scenario.mechanisms[2].motor, MotorPreset::Neo550);
        match &scenario.mechanisms[1].kind {
            MechanismKind::Angular(config) => {
                assert_eq!(config.gearing, 20.0);
                assert_eq!(config.bounds.max_position, 180.0);
                assert_eq!(config.feedforward.kg, 2.26);
                assert!(config.simulate_gravity);
            },
            other => panic!("unexpected kind: {:?}", other),
        }
        assert_eq!(scenario.tuning[0].key, TuningKey::Kv);
    }

    #[test]
    fn test_build_and_run() {
        let scenario = ScenarioConfig::from_toml_str(SCENARIO).unwrap();
        let mut run = scenario.build().unwrap();
        let stop = AtomicBool::new(false);

        let executed = run.run(20, false, &stop, |_, report| assert!(report.is_clean()));
        assert_eq!(executed, 20);

        let scheduler = &run.scheduler;
        assert_eq!(scheduler.mechanism("arm").map(|m| m.lifecycle()), Some(Lifecycle::Active));
        assert_eq!(
            scheduler.mechanism("intake").map(|m| m.lifecycle()),
            Some(Lifecycle::Active)
        );
        assert_eq!(
            scheduler.mechanism("flywheel").map(|m| m.lifecycle()),
            Some(Lifecycle::Configured)
        );
        assert!(run.supply.total_current().0 > 0.0);
    }

    #[test]
    fn test_unknown_command_target_rejected() {
        let text = r#"
[[commands]]
tick = 0
mechanism = "ghost"
value = 1.0
"#;
        let scenario = ScenarioConfig::from_toml_str(text).unwrap();
        assert!(matches!(
            scenario.build(),
            Err(MechanismError::UnknownMechanism(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_duplicate_port_rejected() {
        let text = r#"
[[mechanisms]]
name = "a"
kind = "percent"
port = 3

[[mechanisms]]
name = "b"
kind = "percent"
port = 3
"#;
        let scenario = ScenarioConfig::from_toml_str(text).unwrap();
        assert!(matches!(scenario.build(), Err(MechanismError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();
        let scenario = ScenarioConfig::load(file.path()).unwrap();
        assert_eq!(scenario.commands.len(), 2);

        assert!(ScenarioConfig::load("/nonexistent/scenario.toml").is_err());
    }

    #[test]
    fn test_massless_arm_does_not_stall_loop() {
        let text = r#"
[[mechanisms]]
name = "arm"
kind = "angular"
mass = 0.0

[[commands]]
tick = 0
mechanism = "arm"
value = 45.0
"#;
        let scenario = ScenarioConfig::from_toml_str(text).unwrap();
        let mut run = scenario.build().unwrap();
        let stop = AtomicBool::new(false);
        let executed = run.run(3, false, &stop, |_, _| {});
        assert_eq!(executed, 3);
        assert_eq!(run.scheduler.ticks(), 3);
    }

    #[test]
    fn test_invalid_kind_rejected() {
        let text = r#"
[[mechanisms]]
name = "a"
kind = "turret"
"#;
        assert!(ScenarioConfig::from_toml_str(text).is_err());
    }
}
