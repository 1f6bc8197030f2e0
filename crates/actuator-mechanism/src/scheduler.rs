//! 固定周期调度器
//!
//! 每个周期在同一线程上按顺序执行：
//!
//! 1. 排空调参收件箱（周期内不会观察到半应用的改动）
//! 2. 每个机构 `update()`
//! 3. `draw()` 并分发给遥测 sink
//! 4. （仅仿真）`simulation_step()`，固定推进 20 ms
//!
//! 单个机构出错只记录日志并置位其故障标志，不会中断循环。
//!
//! # 示例
//!
//! ```rust
//! use actuator_mechanism::{LoopConfig, Scheduler};
//!
//! let mut scheduler = Scheduler::new(LoopConfig::default()).unwrap();
//! let report = scheduler.tick(scheduler.period());
//! assert_eq!(report.tick, 1);
//! ```

use crate::Mechanism;
use crate::error::MechanismError;
use crate::telemetry::{TelemetryHub, TelemetrySink, TuningInbox, TuningSender, tuning_channel};
use actuator_plant::SIM_STEP;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 调度循环配置
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// 控制频率（Hz），50 Hz 对应 20 ms 周期
    pub frequency_hz: f64,

    /// dt 钳位倍数
    ///
    /// 实际 dt 超过标称周期的此倍数时，对所有机构调用 `on_time_jump()` 并钳位 dt。
    pub dt_clamp_multiplier: f64,

    /// 最大周期数（None 表示直到外部停止）
    pub max_iterations: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            frequency_hz: 50.0,
            dt_clamp_multiplier: 2.0,
            max_iterations: None,
        }
    }
}

impl LoopConfig {
    fn validate(&self) -> Result<(), MechanismError> {
        if self.frequency_hz.is_nan() || self.frequency_hz <= 0.0 {
            return Err(MechanismError::Config(format!(
                "Invalid frequency_hz: {} (must be > 0)",
                self.frequency_hz
            )));
        }
        if self.frequency_hz > 10000.0 {
            warn!(
                "Very high control frequency: {} Hz. This may cause performance issues.",
                self.frequency_hz
            );
        }
        if self.dt_clamp_multiplier.is_nan() || self.dt_clamp_multiplier <= 0.0 {
            return Err(MechanismError::Config(format!(
                "Invalid dt_clamp_multiplier: {} (must be > 0)",
                self.dt_clamp_multiplier
            )));
        }
        Ok(())
    }
}

/// 单个周期的结果
#[derive(Debug, Default)]
pub struct TickReport {
    /// 周期序号（从 1 开始）
    pub tick: u64,
    /// 成功应用的调参更新数
    pub tuning_applied: usize,
    /// 被丢弃的调参更新数（未知机构或不支持的键）
    pub tuning_rejected: usize,
    /// 本周期出错的机构
    pub errors: Vec<(String, MechanismError)>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 调度器
pub struct Scheduler {
    config: LoopConfig,
    period: Duration,
    mechanisms: Vec<Box<dyn Mechanism>>,
    sender: TuningSender,
    inbox: TuningInbox,
    hub: TelemetryHub,
    ticks: u64,
}

impl Scheduler {
    pub fn new(config: LoopConfig) -> Result<Self, MechanismError> {
        config.validate()?;
        let (sender, inbox) = tuning_channel();
        Ok(Scheduler {
            period: Duration::from_secs_f64(1.0 / config.frequency_hz),
            config,
            mechanisms: Vec::new(),
            sender,
            inbox,
            hub: TelemetryHub::new(),
            ticks: 0,
        })
    }

    /// 注册机构，名字必须唯一
    pub fn add(&mut self, mechanism: Box<dyn Mechanism>) -> Result<(), MechanismError> {
        if self.mechanisms.iter().any(|m| m.name() == mechanism.name()) {
            return Err(MechanismError::Config(format!(
                "duplicate mechanism name '{}'",
                mechanism.name()
            )));
        }
        debug!("Scheduler registered '{}'", mechanism.name());
        self.mechanisms.push(mechanism);
        Ok(())
    }

    pub fn add_sink(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.hub.add_sink(sink);
    }

    /// 外部调参入口（可克隆，可跨线程）
    pub fn tuning_sender(&self) -> TuningSender {
        self.sender.clone()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn len(&self) -> usize {
        self.mechanisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mechanisms.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mechanisms.iter().map(|m| m.name())
    }

    pub fn mechanism(&self, name: &str) -> Option<&dyn Mechanism> {
        self.mechanisms
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    pub fn mechanism_mut(&mut self, name: &str) -> Option<&mut (dyn Mechanism + 'static)> {
        self.mechanisms
            .iter_mut()
            .find(|m| m.name() == name)
            .map(|m| m.as_mut())
    }

    /// 给指定机构下发参考值
    pub fn command(&mut self, name: &str, value: f64) -> Result<(), MechanismError> {
        self.mechanism_mut(name)
            .ok_or_else(|| MechanismError::UnknownMechanism(name.to_string()))?
            .command(value)
    }

    /// 执行一个周期
    pub fn tick(&mut self, dt: Duration) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            ..TickReport::default()
        };

        for update in self.inbox.drain() {
            let Some(mechanism) = self
                .mechanisms
                .iter_mut()
                .find(|m| m.name() == update.mechanism)
            else {
                warn!(
                    "Dropping tuning update for unknown mechanism '{}'",
                    update.mechanism
                );
                report.tuning_rejected += 1;
                continue;
            };

            match mechanism.apply_tuning(update.key, update.value) {
                Ok(()) => report.tuning_applied += 1,
                Err(err) => {
                    warn!("Dropping tuning update: {}", err);
                    report.tuning_rejected += 1;
                },
            }
        }

        for mechanism in &mut self.mechanisms {
            if let Err(err) = mechanism.update(dt) {
                warn!("Mechanism '{}' update failed: {}", mechanism.name(), err);
                mechanism.faults().raise(err.to_string());
                report.errors.push((mechanism.name().to_string(), err));
            }

            let frame = mechanism.draw();
            self.hub.publish(&frame);

            if mechanism.is_simulated() {
                mechanism.simulation_step(SIM_STEP);
            }
        }

        trace!(
            "tick {} done ({} mechanisms, {} errors)",
            self.ticks,
            self.mechanisms.len(),
            report.errors.len()
        );
        report
    }

    /// 不休眠地连续执行 `ticks` 个周期，每周期 dt 取标称周期
    pub fn run_for(&mut self, ticks: u64) -> Vec<TickReport> {
        (0..ticks).map(|_| self.tick(self.period)).collect()
    }

    /// 实时运行，直到 `stop` 置位或达到 `max_iterations`
    ///
    /// 使用 `spin_sleep` 补足每个周期的剩余时间。
    pub fn run(&mut self, stop: &AtomicBool) -> Result<u64, MechanismError> {
        use spin_sleep::SpinSleeper;

        self.config.validate()?;
        let max_dt = self.period.mul_f64(self.config.dt_clamp_multiplier);
        let sleeper = SpinSleeper::default();

        info!(
            "Scheduler running at {} Hz with {} mechanisms",
            self.config.frequency_hz,
            self.mechanisms.len()
        );

        let mut last_time: Option<Instant> = None;
        let mut iteration = 0u64;

        loop {
            if stop.load(Ordering::Acquire) {
                info!("Scheduler stopped after {} iterations", iteration);
                return Ok(iteration);
            }
            if let Some(max_iter) = self.config.max_iterations
                && iteration >= max_iter
            {
                return Ok(iteration);
            }

            let now = Instant::now();
            let real_dt = last_time.map_or(self.period, |last| now - last);
            let mut dt = real_dt;

            if real_dt > max_dt {
                warn!("Scheduler detected time jump: {:?}", real_dt);
                for mechanism in &mut self.mechanisms {
                    mechanism.on_time_jump(real_dt);
                }
                dt = max_dt;
            }

            self.tick(dt);

            last_time = Some(now);
            iteration += 1;

            let elapsed = now.elapsed();
            if elapsed < self.period {
                sleeper.sleep(self.period - elapsed);
            }
        }
    }
}
