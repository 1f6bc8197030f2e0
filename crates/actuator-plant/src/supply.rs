//! 供电母线（电池压降模型）
//!
//! 仿真中所有机构共享一块电池。每个机构在步进后上报自身电流，
//! 母线电压按 `V = max(0, V_nominal - R_internal · Σ|I|)` 估算，
//! 仿真后端据此把 effort（伏特）换算为占空比。

use crate::units::{Amps, Volts};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 电池参数
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BatteryModel {
    /// 空载电压（V）
    pub nominal_voltage: f64,
    /// 内阻（Ω）
    pub resistance: f64,
}

impl Default for BatteryModel {
    fn default() -> Self {
        BatteryModel {
            nominal_voltage: 12.0,
            resistance: 0.02,
        }
    }
}

impl BatteryModel {
    /// 负载电压
    pub fn loaded_voltage(&self, total_current: Amps) -> Volts {
        Volts((self.nominal_voltage - total_current.0.abs() * self.resistance).max(0.0))
    }
}

/// 共享母线句柄
///
/// 克隆后指向同一块电池。各机构以自己的仿真端口号作为 key 上报电流，
/// 重复上报会覆盖该端口上一次的值。
#[derive(Debug, Clone, Default)]
pub struct SupplyRail {
    battery: BatteryModel,
    draws: Arc<Mutex<BTreeMap<u32, f64>>>,
}

impl SupplyRail {
    pub fn new(battery: BatteryModel) -> Self {
        SupplyRail {
            battery,
            draws: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn battery(&self) -> BatteryModel {
        self.battery
    }

    /// 上报某个端口的电流
    pub fn report(&self, port: u32, current: Amps) {
        self.draws.lock().insert(port, current.0.abs());
    }

    /// 总电流
    pub fn total_current(&self) -> Amps {
        Amps(self.draws.lock().values().sum())
    }

    /// 当前负载电压
    pub fn voltage(&self) -> Volts {
        self.battery.loaded_voltage(self.total_current())
    }

    /// 清空所有上报
    pub fn clear(&self) {
        self.draws.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unloaded_rail_is_nominal() {
        let rail = SupplyRail::default();
        assert_eq!(rail.voltage(), Volts(12.0));
    }

    #[test]
    fn test_sag_sums_all_ports() {
        let rail = SupplyRail::default();
        rail.report(0, Amps(50.0));
        rail.report(1, Amps(-50.0));
        // 12 - 100 * 0.02 = 10
        assert!((rail.voltage().0 - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_report_overwrites_same_port() {
        let rail = SupplyRail::default();
        rail.report(3, Amps(100.0));
        rail.report(3, Amps(10.0));
        assert!((rail.total_current().0 - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_voltage_never_negative() {
        let rail = SupplyRail::default();
        rail.report(0, Amps(10_000.0));
        assert_eq!(rail.voltage(), Volts(0.0));
    }

    #[test]
    fn test_clones_share_state() {
        let rail = SupplyRail::new(BatteryModel::default());
        let other = rail.clone();
        other.report(7, Amps(25.0));
        assert!((rail.voltage().0 - 11.5).abs() < 1e-12);
        rail.clear();
        assert_eq!(other.voltage(), Volts(12.0));
    }
}
