//! 遥测投影
//!
//! 每次 `draw()` 读取当前测量值与参考值，生成一个 [`TelemetryFrame`]：
//! 一个具名根节点加若干线段（长度、角度、线宽、颜色），以及若干具名标量。
//! 投影是纯函数，不修改任何控制状态。
//!
//! # 投影规则
//!
//! | 机构 | 线段角度 |
//! |------|----------|
//! | 百分比 | `duty · 180°` |
//! | 速度 | `270° - v / v_max · 180°`（测量值与设定点各一根） |
//! | 摆臂 | 测量角 / 参考角，长度为臂长 |
//!
//! 根节点位置：闭环机构 `(x·W/2 + W/2, z)`，百分比机构 `(x·W, z·H)`。

use crate::config::MountPoint;
use crate::lifecycle::Lifecycle;
use smallvec::SmallVec;
use std::fmt;

/// 线段默认线宽
pub const LINE_WIDTH: f64 = 5.0;

/// 速度表 / 百分比表指针长度
pub const DIAL_LENGTH: f64 = 0.1;

/// RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// 画布尺寸
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas {
            width: 2.0,
            height: 2.0,
        }
    }
}

/// 具名根节点
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Root {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl Root {
    /// 闭环机构：横向以画布中心为原点
    pub fn closed_loop(name: &str, mount: &MountPoint, canvas: &Canvas) -> Self {
        Root {
            name: name.to_string(),
            x: mount.x * canvas.width / 2.0 + canvas.width / 2.0,
            y: mount.z,
        }
    }

    /// 百分比机构：按画布尺寸缩放
    pub fn percent(name: &str, mount: &MountPoint, canvas: &Canvas) -> Self {
        Root {
            name: name.to_string(),
            x: mount.x * canvas.width,
            y: mount.z * canvas.height,
        }
    }
}

/// 线段
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Ligament {
    pub name: String,
    pub length: f64,
    /// 角度（度）
    pub angle: f64,
    pub line_width: f64,
    pub color: Color,
}

/// 具名标量
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TelemetryValue {
    pub name: &'static str,
    pub value: f64,
}

/// 一次 `draw()` 的输出
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TelemetryFrame {
    pub mechanism: String,
    pub lifecycle: Lifecycle,
    pub root: Root,
    pub ligaments: SmallVec<[Ligament; 2]>,
    pub values: SmallVec<[TelemetryValue; 6]>,
    /// 粘滞故障是否置位
    pub faulted: bool,
}

impl TelemetryFrame {
    /// 按名字查找标量
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|v| v.name == name).map(|v| v.value)
    }

    /// 按名字后缀查找线段，例如 `"-setpoint"`
    pub fn ligament(&self, suffix: &str) -> Option<&Ligament> {
        self.ligaments.iter().find(|l| l.name.ends_with(suffix))
    }
}

/// 挂载在机构上的可视化
///
/// 配置时生成：根节点位置固定，两种颜色来自颜色分配器。
#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    pub root: Root,
    pub primary: Color,
    pub secondary: Color,
}

impl Visual {
    pub fn ligament(&self, suffix: &str, length: f64, angle: f64, color: Color) -> Ligament {
        Ligament {
            name: format!("{}-{}", self.root.name, suffix),
            length,
            angle,
            line_width: LINE_WIDTH,
            color,
        }
    }
}

/// 速度表指针角度
///
/// 零速指向 270°，满速转过 180° 指向 90°。满量程不是有限正数时停在 270°。
pub fn dial_angle(value: f64, max_rpm: f64) -> f64 {
    if !(max_rpm.is_finite() && max_rpm > 0.0) {
        return 270.0;
    }
    270.0 - value / max_rpm * 180.0
}

/// 百分比指针角度
pub fn percent_angle(duty: f64) -> f64 {
    duty * 180.0
}
