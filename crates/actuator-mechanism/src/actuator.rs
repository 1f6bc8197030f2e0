//! 三种机构变体共享的核心
//!
//! 负责生命周期推进、硬件选项写入、闭环/开环施加与调参，
//! 变体只决定测量量、参考值含义与可视化形状。

use crate::backend::{ActuationBackend, Measurement};
use crate::config::HardwareOptions;
use crate::error::MechanismError;
use crate::lifecycle::Lifecycle;
use crate::telemetry::{Ligament, Root, TelemetryFrame, TelemetryValue, TuningKey, Visual};
use actuator_control::{ControlLaw, Controller, LawOutput, Reference};
use actuator_hal::{FaultFlag, configure_with_retry};
use actuator_plant::{Amps, Deg, PlantModel, Volts};
use smallvec::SmallVec;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 机构核心
pub struct Actuator {
    name: String,
    lifecycle: Lifecycle,
    backend: ActuationBackend,
    plant: PlantModel,
    law: Option<ControlLaw>,
    reference: Option<Reference>,
    output: LawOutput,
    visual: Option<Visual>,
    faults: FaultFlag,
}

impl Actuator {
    pub fn new(name: impl Into<String>, backend: ActuationBackend) -> Self {
        Actuator {
            name: name.into(),
            lifecycle: Lifecycle::Unconfigured,
            backend,
            plant: PlantModel::None,
            law: None,
            reference: None,
            output: LawOutput::default(),
            visual: None,
            faults: FaultFlag::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn backend(&self) -> &ActuationBackend {
        &self.backend
    }

    pub fn plant(&self) -> &PlantModel {
        &self.plant
    }

    pub fn law(&self) -> Option<&ControlLaw> {
        self.law.as_ref()
    }

    pub fn reference(&self) -> Option<Reference> {
        self.reference
    }

    /// 最近一次闭环输出（非 ACTIVE 时为零）
    pub fn output(&self) -> LawOutput {
        self.output
    }

    pub fn visual(&self) -> Option<&Visual> {
        self.visual.as_ref()
    }

    pub fn faults(&self) -> &FaultFlag {
        &self.faults
    }

    pub fn is_simulated(&self) -> bool {
        self.backend.is_simulated()
    }

    /// 写入硬件选项
    ///
    /// 每一项都走有界重试；重试耗尽只置位故障标志，
    /// 绑定不支持的选项立即返回错误。
    pub fn apply_hardware_options(&mut self, options: &HardwareOptions) -> Result<(), MechanismError> {
        let fault = self.faults.clone();
        let binding = self.backend.binding_mut();

        if let Some(limit) = options.current_limit {
            configure_with_retry("current limit", &fault, |_| {
                binding.set_current_limit(Amps(limit))
            })?;
        }

        if options.inverted || binding.is_inverted() {
            configure_with_retry("inverted", &fault, |_| binding.set_inverted(options.inverted))?;
        }

        if let Some(follow) = options.follow {
            configure_with_retry("follow", &fault, |_| {
                binding.follow(follow.leader_port, follow.inverted)
            })?;
        }

        if let Some(offset) = options.encoder_offset {
            configure_with_retry("encoder offset", &fault, |_| {
                binding.set_encoder_offset(Deg(offset))
            })?;
        }

        Ok(())
    }

    /// 挂载模型、控制律与可视化，推进到 CONFIGURED
    ///
    /// 真实后端忽略传入的模型。已经 ACTIVE 的机构重新配置后保持 ACTIVE，
    /// 控制律状态（积分、微分历史）随新控制律重置。
    pub fn attach(
        &mut self,
        plant: PlantModel,
        law: Option<ControlLaw>,
        visual: Visual,
    ) -> Result<(), MechanismError> {
        if let Some(law) = &law {
            self.backend.prepare_closed_loop(law.gains(), &self.faults)?;
        }

        self.plant = if self.backend.is_simulated() { plant } else { PlantModel::None };
        self.law = law;
        self.visual = Some(visual);
        self.output = LawOutput::default();

        let next = self.lifecycle.after_configure();
        info!(
            "Mechanism '{}' configured ({} -> {}, simulated: {})",
            self.name,
            self.lifecycle,
            next,
            self.backend.is_simulated()
        );
        self.lifecycle = next;
        Ok(())
    }

    /// 设置参考值，第一次调用使机构进入 ACTIVE
    pub fn set_reference(&mut self, reference: Reference) -> Result<(), MechanismError> {
        let Some(next) = self.lifecycle.after_reference() else {
            return Err(MechanismError::NotConfigured(self.name.clone()));
        };

        if !self.lifecycle.is_active() {
            info!("Mechanism '{}' activated with {}", self.name, reference);
        } else {
            debug!("Mechanism '{}' reference -> {}", self.name, reference);
        }

        self.lifecycle = next;
        self.reference = Some(reference);
        Ok(())
    }

    pub fn measure(&self, what: Measurement) -> f64 {
        self.backend.measure(&self.plant, what)
    }

    /// 闭环更新：测量、计算、施加
    ///
    /// 非 ACTIVE 时 effort 为零且不读取控制律。
    pub fn update_closed_loop(&mut self, what: Measurement, dt: Duration) -> Result<(), MechanismError> {
        let Some(reference) = self.reference.filter(|_| self.lifecycle.is_active()) else {
            self.output = LawOutput::default();
            return Ok(());
        };
        let Some(law) = self.law.as_mut() else {
            return Ok(());
        };

        let measurement = self.backend.measure(&self.plant, what);
        match self
            .backend
            .apply_closed_loop(law, &mut self.plant, reference, measurement, dt)
        {
            Ok(output) => {
                self.output = output;
                Ok(())
            },
            Err(err) => {
                self.output = LawOutput::default();
                Err(err.into())
            },
        }
    }

    /// 开环更新：直接写占空比
    pub fn update_open_loop(&mut self, duty: f64) -> Result<(), MechanismError> {
        if !self.lifecycle.is_active() {
            return Ok(());
        }
        self.backend.apply_percent(&mut self.plant, duty)?;
        Ok(())
    }

    /// 推进仿真模型（仅 ACTIVE）
    pub fn simulation_step(&mut self, dt: Duration) {
        if self.lifecycle.is_active() {
            self.backend.step(&mut self.plant, dt);
        }
    }

    pub fn on_time_jump(&mut self, dt: Duration) {
        if let Some(law) = self.law.as_mut()
            && let Err(err) = law.on_time_jump(dt)
        {
            warn!("Mechanism '{}' failed to handle time jump: {}", self.name, err);
        }
    }

    /// 停止输出（不改变生命周期）
    pub fn stop(&mut self) -> Result<(), MechanismError> {
        self.backend.stop(&mut self.plant)?;
        self.output = LawOutput::default();
        Ok(())
    }

    /// 空载转速（RPM，输出轴），优先取仿真模型，其次取绑定报告的电机
    pub fn free_speed_rpm(&self) -> Option<f64> {
        self.plant
            .free_speed_rpm()
            .or_else(|| self.backend.motor().map(|motor| motor.free_speed_rpm()))
    }

    /// 当前施加的 effort
    pub fn effort(&self) -> Volts {
        self.output.effort
    }

    /// 应用一条调参更新到控制律
    ///
    /// PID 相关的键在原生闭环硬件上会重新写入增益寄存器。
    pub fn apply_law_tuning(&mut self, key: TuningKey, value: f64) -> Result<(), MechanismError> {
        let Some(law) = self.law.as_mut() else {
            return Err(MechanismError::UnsupportedTuning {
                mechanism: self.name.clone(),
                key,
            });
        };

        let mut gains = *law.gains();
        let mut feedforward = *law.feedforward_model();
        match key {
            TuningKey::Kp => gains.kp = value,
            TuningKey::Ki => gains.ki = value,
            TuningKey::Kd => gains.kd = value,
            TuningKey::IZone => gains.i_zone = value,
            TuningKey::Ks => feedforward.ks = value,
            TuningKey::Kv => feedforward.kv = value,
            TuningKey::Ka => feedforward.ka = value,
            TuningKey::Kg => feedforward.kg = value,
            TuningKey::Tolerance => {
                law.set_tolerance(value)?;
                debug!("Mechanism '{}' tolerance -> {}", self.name, value);
                return Ok(());
            },
        }

        law.set_gains(gains)?;
        law.set_feedforward(feedforward);
        debug!("Mechanism '{}' {} -> {}", self.name, key, value);

        if matches!(key, TuningKey::Kp | TuningKey::Ki | TuningKey::Kd | TuningKey::IZone) {
            self.backend.prepare_closed_loop(law.gains(), &self.faults)?;
        }
        Ok(())
    }

    /// 组装遥测帧
    pub fn frame(
        &self,
        ligaments: SmallVec<[Ligament; 2]>,
        values: SmallVec<[TelemetryValue; 6]>,
    ) -> TelemetryFrame {
        let root = match &self.visual {
            Some(visual) => visual.root.clone(),
            None => Root {
                name: self.name.clone(),
                x: 0.0,
                y: 0.0,
            },
        };

        TelemetryFrame {
            mechanism: self.name.clone(),
            lifecycle: self.lifecycle,
            root,
            ligaments,
            values,
            faulted: self.faults.is_raised(),
        }
    }

    /// 用于测试的直接访问
    #[cfg(test)]
    pub(crate) fn plant_mut(&mut self) -> &mut PlantModel {
        &mut self.plant
    }
}
