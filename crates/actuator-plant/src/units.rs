//! 强类型单位
//!
//! 机构对外使用角度（度）和 RPM，积分器内部使用弧度和 rad/s。
//! 跨 crate 边界的物理量用 NewType 包装，避免把电压当成占空比、
//! 把角度当成弧度传错。
//!
//! ```rust
//! use actuator_plant::{Deg, Rad};
//!
//! let right = Deg(90.0).to_rad();
//! assert!((right.0 - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
//! assert!((right.cos()).abs() < 1e-12);
//! ```

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// 弧度
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rad(pub f64);

/// 角度（度）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Deg(pub f64);

/// 电压（V）
///
/// 控制律输出的 effort 以伏特计。
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Volts(pub f64);

/// 电流（A）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Amps(pub f64);

impl Rad {
    pub const ZERO: Self = Rad(0.0);

    #[inline]
    pub fn to_deg(self) -> Deg {
        Deg(self.0.to_degrees())
    }

    #[inline]
    pub fn cos(self) -> f64 {
        self.0.cos()
    }

    #[inline]
    pub fn sin(self) -> f64 {
        self.0.sin()
    }
}

impl Deg {
    pub const ZERO: Self = Deg(0.0);

    #[inline]
    pub fn to_rad(self) -> Rad {
        Rad(self.0.to_radians())
    }

    /// 把角度折返到 (-180°, 180°]
    ///
    /// 绝对编码器回读 0..360，超过 180 的部分视为负角度。
    pub fn wrap_signed(self) -> Self {
        let mut angle = self.0 % 360.0;
        if angle > 180.0 {
            angle -= 360.0;
        } else if angle <= -180.0 {
            angle += 360.0;
        }
        Deg(angle)
    }
}

impl Volts {
    pub const ZERO: Self = Volts(0.0);

    #[inline]
    pub fn clamp(self, min: f64, max: f64) -> Self {
        Volts(self.0.clamp(min, max))
    }
}

impl Amps {
    #[inline]
    pub fn abs(self) -> Self {
        Amps(self.0.abs())
    }
}

impl From<Rad> for Deg {
    fn from(rad: Rad) -> Self {
        rad.to_deg()
    }
}

impl From<Deg> for Rad {
    fn from(deg: Deg) -> Self {
        deg.to_rad()
    }
}

macro_rules! impl_scalar_ops {
    ($($ty:ident),*) => {
        $(
            impl Add for $ty {
                type Output = Self;
                #[inline]
                fn add(self, rhs: Self) -> Self {
                    $ty(self.0 + rhs.0)
                }
            }

            impl Sub for $ty {
                type Output = Self;
                #[inline]
                fn sub(self, rhs: Self) -> Self {
                    $ty(self.0 - rhs.0)
                }
            }

            impl Mul<f64> for $ty {
                type Output = Self;
                #[inline]
                fn mul(self, rhs: f64) -> Self {
                    $ty(self.0 * rhs)
                }
            }

            impl Neg for $ty {
                type Output = Self;
                #[inline]
                fn neg(self) -> Self {
                    $ty(-self.0)
                }
            }
        )*
    };
}

impl_scalar_ops!(Rad, Deg, Volts, Amps);

impl fmt::Display for Rad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} rad", self.0)
    }
}

impl fmt::Display for Deg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°", self.0)
    }
}

impl fmt::Display for Volts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} V", self.0)
    }
}

impl fmt::Display for Amps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} A", self.0)
    }
}

/// RPM → rad/s
#[inline]
pub fn rpm_to_rad_per_sec(rpm: f64) -> f64 {
    rpm * std::f64::consts::TAU / 60.0
}

/// rad/s → RPM
#[inline]
pub fn rad_per_sec_to_rpm(rad_per_sec: f64) -> f64 {
    rad_per_sec * 60.0 / std::f64::consts::TAU
}
