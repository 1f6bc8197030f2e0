//! 机构生命周期
//!
//! ```text
//! UNCONFIGURED → CONFIGURED → ACTIVE
//! ```
//!
//! - `Unconfigured`: 只有原始绑定，没有物理模型和可视化，拒绝参考值
//! - `Configured`: 参数与可视化已挂载，effort 为 0，物理模型不推进
//! - `Active`: 每个周期按当前参考值重新计算 effort；重新配置也不会回到 `Configured`

use std::fmt;

/// 生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Unconfigured,
    Configured,
    Active,
}

impl Lifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Unconfigured => "unconfigured",
            Lifecycle::Configured => "configured",
            Lifecycle::Active => "active",
        }
    }

    /// 是否已挂载参数
    pub fn is_configured(self) -> bool {
        !matches!(self, Lifecycle::Unconfigured)
    }

    pub fn is_active(self) -> bool {
        matches!(self, Lifecycle::Active)
    }

    /// 配置完成后的状态
    pub fn after_configure(self) -> Self {
        match self {
            Lifecycle::Active => Lifecycle::Active,
            _ => Lifecycle::Configured,
        }
    }

    /// 收到参考值后的状态，`None` 表示拒绝
    pub fn after_reference(self) -> Option<Self> {
        match self {
            Lifecycle::Unconfigured => None,
            _ => Some(Lifecycle::Active),
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
