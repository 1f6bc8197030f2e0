//! 控制模式与参考值

use std::fmt;

/// 控制模式
///
/// 决定误差的含义（速度误差 / 位置误差）以及前馈公式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ControlMode {
    /// 开环占空比 [-1, 1]
    Percent,
    /// 速度闭环（RPM）
    Velocity,
    /// 位置闭环（度）
    Position,
}

impl ControlMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlMode::Percent => "percent",
            ControlMode::Velocity => "velocity",
            ControlMode::Position => "position",
        }
    }

    /// 是否经过控制律
    pub fn is_closed_loop(self) -> bool {
        !matches!(self, ControlMode::Percent)
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 参考值（设定点 + 模式）
///
/// 一次控制决策设置一次，直到被下一次 `set_reference` 覆盖。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reference {
    pub value: f64,
    pub mode: ControlMode,
}

impl Reference {
    pub const fn new(value: f64, mode: ControlMode) -> Self {
        Reference { value, mode }
    }

    pub const fn percent(value: f64) -> Self {
        Reference::new(value, ControlMode::Percent)
    }

    pub const fn velocity(rpm: f64) -> Self {
        Reference::new(rpm, ControlMode::Velocity)
    }

    pub const fn position(degrees: f64) -> Self {
        Reference::new(degrees, ControlMode::Position)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.3}", self.mode, self.value)
    }
}
