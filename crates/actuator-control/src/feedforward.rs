//! 前馈模型
//!
//! 由模型常数预测的开环 effort，与闭环修正量相加：
//!
//! ```text
//! 速度模式: ff = kS·sgn(r) + kV·r + kA·a
//! 位置模式: ff = kS·sgn(r) + kG·cos(θ_measured) + kV·r
//! ```
//!
//! `sgn(0) = 0`，参考值为零时静摩擦补偿不出力。

use actuator_plant::Deg;

/// 前馈常数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeedforwardModel {
    /// 静摩擦
    pub ks: f64,
    /// 速度
    pub kv: f64,
    /// 加速度
    pub ka: f64,
    /// 重力（仅摆臂）
    pub kg: f64,
}

#[inline]
fn sign(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value.signum() }
}

impl FeedforwardModel {
    pub fn new(ks: f64, kv: f64, ka: f64, kg: f64) -> Self {
        FeedforwardModel { ks, kv, ka, kg }
    }

    /// 速度模式前馈
    pub fn velocity(&self, reference: f64, acceleration: f64) -> f64 {
        self.ks * sign(reference) + self.kv * reference + self.ka * acceleration
    }

    /// 位置模式前馈
    ///
    /// 重力项按测量角计算，保持某一固定角度时也始终存在。
    pub fn angular(&self, reference: f64, measured: Deg) -> f64 {
        self.ks * sign(reference) + self.kg * measured.to_rad().cos() + self.kv * reference
    }
}
