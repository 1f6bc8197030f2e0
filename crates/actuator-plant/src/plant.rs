//! Plant Model 标签联合
//!
//! 机构按类型选择一种物理模型；接真实硬件时为 `None`，所有读数恒为零，
//! `step()` 为空操作。

use crate::inertial::InertialPlant;
use crate::single_joint::SingleJointPlant;
use crate::units::{Amps, Deg, Volts};
use std::time::Duration;

/// 积分器状态快照（只读）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlantState {
    /// 位置（度）
    pub position: f64,
    /// 速度（RPM）
    pub velocity: f64,
}

/// 物理模型
#[derive(Debug, Clone)]
pub enum PlantModel {
    /// 飞轮 / 滚筒
    Inertial(InertialPlant),
    /// 单关节摆臂
    SingleJoint(SingleJointPlant),
    /// 无模型（真实硬件）
    None,
}

impl PlantModel {
    /// 施加端电压，下一次 `step()` 生效
    pub fn set_input(&mut self, voltage: Volts) {
        match self {
            PlantModel::Inertial(plant) => plant.set_input(voltage),
            PlantModel::SingleJoint(plant) => plant.set_input(voltage),
            PlantModel::None => {},
        }
    }

    pub fn input(&self) -> Volts {
        match self {
            PlantModel::Inertial(plant) => plant.input(),
            PlantModel::SingleJoint(plant) => plant.input(),
            PlantModel::None => Volts::ZERO,
        }
    }

    pub fn step(&mut self, dt: Duration) {
        match self {
            PlantModel::Inertial(plant) => plant.step(dt),
            PlantModel::SingleJoint(plant) => plant.step(dt),
            PlantModel::None => {},
        }
    }

    /// 当前位置（度）
    pub fn position(&self) -> Deg {
        match self {
            PlantModel::Inertial(plant) => plant.position(),
            PlantModel::SingleJoint(plant) => plant.angle(),
            PlantModel::None => Deg::ZERO,
        }
    }

    /// 当前速度（RPM）
    pub fn velocity(&self) -> f64 {
        match self {
            PlantModel::Inertial(plant) => plant.velocity_rpm(),
            PlantModel::SingleJoint(plant) => plant.velocity_rpm(),
            PlantModel::None => 0.0,
        }
    }

    /// 估算电流，用于母线压降
    pub fn current_draw(&self) -> Amps {
        match self {
            PlantModel::Inertial(plant) => plant.current_draw(),
            PlantModel::SingleJoint(plant) => plant.current_draw(),
            PlantModel::None => Amps(0.0),
        }
    }

    pub fn state(&self) -> PlantState {
        PlantState {
            position: self.position().0,
            velocity: self.velocity(),
        }
    }

    pub fn is_simulated(&self) -> bool {
        !matches!(self, PlantModel::None)
    }

    /// 模型对应电机的空载转速（RPM），无模型时为 `None`
    pub fn free_speed_rpm(&self) -> Option<f64> {
        match self {
            PlantModel::Inertial(plant) => {
                Some(plant.motor().free_speed_rpm() / plant.gearing())
            },
            PlantModel::SingleJoint(plant) => {
                Some(plant.motor().free_speed_rpm() / plant.params().gearing)
            },
            PlantModel::None => None,
        }
    }
}
