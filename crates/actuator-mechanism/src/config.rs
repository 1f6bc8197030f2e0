//! 构造参数
//!
//! 由配置方（代码或反序列化后的文件）在配置阶段一次性提供的值类型。
//! 核心本身不拥有任何文件格式，只要求这些结构可被 serde 反序列化。

use actuator_control::{FeedforwardModel, Gains};
use serde::{Deserialize, Serialize};

/// 机构在机器人坐标系中的安装位置（m）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MountPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// 跟随另一个控制器
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowConfig {
    pub leader_port: u32,
    #[serde(default)]
    pub inverted: bool,
}

/// 配置阶段写入硬件的选项（带有界重试）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareOptions {
    /// 电流限制（A）
    pub current_limit: Option<f64>,
    pub inverted: bool,
    pub follow: Option<FollowConfig>,
    /// 绝对编码器零点偏移（度）
    pub encoder_offset: Option<f64>,
}

/// Advisory 边界（度）
///
/// 只用于 `is_at_maximum` / `is_at_minimum` / `is_at_starting_position` 查询，
/// 从不钳位参考值。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanismBounds {
    pub min_position: f64,
    pub max_position: f64,
    pub starting_position: f64,
}

impl Default for MechanismBounds {
    fn default() -> Self {
        MechanismBounds {
            min_position: -180.0,
            max_position: 180.0,
            starting_position: 0.0,
        }
    }
}

/// 仿真摆臂的物理硬限位（度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardLimits {
    pub min: f64,
    pub max: f64,
}

/// 百分比机构参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentConfig {
    pub gearing: f64,
    /// 转动惯量（kg·m²），仅用于仿真速度读数
    pub moment_of_inertia: f64,
    pub mount: MountPoint,
    pub hardware: HardwareOptions,
}

impl Default for PercentConfig {
    fn default() -> Self {
        PercentConfig {
            gearing: 1.0,
            moment_of_inertia: 0.001,
            mount: MountPoint::default(),
            hardware: HardwareOptions::default(),
        }
    }
}

/// 速度机构参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    pub gearing: f64,
    pub moment_of_inertia: f64,
    /// 粘滞摩擦（N·m per rad/s）
    pub friction: f64,
    pub gains: Gains,
    pub feedforward: FeedforwardModel,
    /// 到位容差（RPM）
    pub tolerance: f64,
    /// 速度表满量程（RPM），缺省取电机空载转速
    pub max_rpm: Option<f64>,
    pub mount: MountPoint,
    pub hardware: HardwareOptions,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        VelocityConfig {
            gearing: 1.0,
            moment_of_inertia: 1.0,
            friction: 0.0,
            gains: Gains::default(),
            feedforward: FeedforwardModel::default(),
            tolerance: 50.0,
            max_rpm: None,
            mount: MountPoint::default(),
            hardware: HardwareOptions::default(),
        }
    }
}

/// 摆臂机构参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngularConfig {
    pub gearing: f64,
    /// 臂质量（kg）
    pub mass: f64,
    /// 臂长（m）
    pub arm_length: f64,
    pub bounds: MechanismBounds,
    /// 仿真硬限位，缺省与 advisory 边界相同
    pub hard_limits: Option<HardLimits>,
    pub simulate_gravity: bool,
    pub gains: Gains,
    pub feedforward: FeedforwardModel,
    /// 到位容差（度）
    pub tolerance: f64,
    pub mount: MountPoint,
    pub hardware: HardwareOptions,
}

impl Default for AngularConfig {
    fn default() -> Self {
        AngularConfig {
            gearing: 1.0,
            mass: 1.0,
            arm_length: 0.5,
            bounds: MechanismBounds::default(),
            hard_limits: None,
            simulate_gravity: true,
            gains: Gains::default(),
            feedforward: FeedforwardModel::default(),
            tolerance: 2.0,
            mount: MountPoint::default(),
            hardware: HardwareOptions::default(),
        }
    }
}

impl AngularConfig {
    /// 仿真使用的硬限位
    pub fn effective_hard_limits(&self) -> HardLimits {
        self.hard_limits.unwrap_or(HardLimits {
            min: self.bounds.min_position,
            max: self.bounds.max_position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_limits_default_to_bounds() {
        let config = AngularConfig {
            bounds: MechanismBounds {
                min_position: -30.0,
                max_position: 120.0,
                starting_position: 0.0,
            },
            ..AngularConfig::default()
        };
        assert_eq!(config.effective_hard_limits(), HardLimits { min: -30.0, max: 120.0 });

        let config = AngularConfig {
            hard_limits: Some(HardLimits { min: -90.0, max: 180.0 }),
            ..config
        };
        assert_eq!(config.effective_hard_limits().max, 180.0);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(PercentConfig::default().gearing, 1.0);
        assert_eq!(VelocityConfig::default().gains, Gains::default());
        assert!(AngularConfig::default().simulate_gravity);
        assert_eq!(HardwareOptions::default().current_limit, None);
    }
}
