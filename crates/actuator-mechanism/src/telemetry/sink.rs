//! 遥测帧的去向
//!
//! 调度器每个周期对每个机构调用一次 `draw()`，把帧交给 [`TelemetryHub`]，
//! 再由 hub 分发给所有注册的 [`TelemetrySink`]。
//!
//! # 示例
//!
//! ```rust
//! use actuator_mechanism::{LatestFrames, RecordingSink, TelemetryHub, TelemetrySink};
//! use std::sync::Arc;
//!
//! let recorder = Arc::new(RecordingSink::new());
//! let latest = Arc::new(LatestFrames::new());
//!
//! let mut hub = TelemetryHub::new();
//! hub.add_sink(recorder.clone() as Arc<dyn TelemetrySink>);
//! hub.add_sink(latest.clone() as Arc<dyn TelemetrySink>);
//! assert_eq!(hub.len(), 2);
//! ```

use super::projection::TelemetryFrame;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// 遥测帧接收端
///
/// `publish` 在调度线程上同步调用，实现必须非阻塞。
pub trait TelemetrySink: Send + Sync {
    fn publish(&self, frame: &TelemetryFrame);
}

/// 分发器
#[derive(Default)]
pub struct TelemetryHub {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl TelemetryHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }

    pub fn publish(&self, frame: &TelemetryFrame) {
        for sink in &self.sinks {
            sink.publish(frame);
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

/// 录制全部帧（测试与离线分析）
#[derive(Debug, Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<TelemetryFrame>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<TelemetryFrame> {
        self.frames.lock().clone()
    }

    /// 某个机构的最后一帧
    pub fn last_for(&self, mechanism: &str) -> Option<TelemetryFrame> {
        self.frames.lock().iter().rev().find(|f| f.mechanism == mechanism).cloned()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

impl TelemetrySink for RecordingSink {
    fn publish(&self, frame: &TelemetryFrame) {
        self.frames.lock().push(frame.clone());
    }
}

/// 每个机构的最新一帧
///
/// 写端（调度线程）用 RCU 替换整张表，读端（仪表盘线程）无锁读取。
pub struct LatestFrames {
    frames: ArcSwap<HashMap<String, Arc<TelemetryFrame>>>,
}

impl Default for LatestFrames {
    fn default() -> Self {
        LatestFrames {
            frames: ArcSwap::from_pointee(HashMap::new()),
        }
    }
}

impl LatestFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mechanism: &str) -> Option<Arc<TelemetryFrame>> {
        self.frames.load().get(mechanism).cloned()
    }

    /// 已出现过的机构名（排序后）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.frames.load().keys().cloned().collect();
        names.sort();
        names
    }
}

impl TelemetrySink for LatestFrames {
    fn publish(&self, frame: &TelemetryFrame) {
        let entry = Arc::new(frame.clone());
        self.frames.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(frame.mechanism.clone(), Arc::clone(&entry));
            next
        });
    }
}

/// 以 `trace` 级别输出每一帧
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn publish(&self, frame: &TelemetryFrame) {
        tracing::trace!(
            mechanism = %frame.mechanism,
            lifecycle = %frame.lifecycle,
            reference = ?frame.value("reference"),
            measurement = ?frame.value("measurement"),
            effort = ?frame.value("effort"),
            faulted = frame.faulted,
            "telemetry frame"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Lifecycle;
    use crate::telemetry::projection::{Root, TelemetryValue};
    use smallvec::smallvec;

    fn frame(name: &str, measurement: f64) -> TelemetryFrame {
        TelemetryFrame {
            mechanism: name.to_string(),
            lifecycle: Lifecycle::Active,
            root: Root {
                name: name.to_string(),
                x: 0.0,
                y: 0.0,
            },
            ligaments: smallvec![],
            values: smallvec![TelemetryValue {
                name: "measurement",
                value: measurement,
            }],
            faulted: false,
        }
    }

    #[test]
    fn test_hub_fans_out() {
        let a = Arc::new(RecordingSink::new());
        let b = Arc::new(RecordingSink::new());
        let mut hub = TelemetryHub::new();
        hub.add_sink(a.clone());
        hub.add_sink(b.clone());
        hub.publish(&frame("x", 1.0));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_recording_last_for() {
        let sink = RecordingSink::new();
        sink.publish(&frame("x", 1.0));
        sink.publish(&frame("y", 2.0));
        sink.publish(&frame("x", 3.0));
        let last = sink.last_for("x").unwrap();
        assert_eq!(last.value("measurement"), Some(3.0));
        assert!(sink.last_for("z").is_none());
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_latest_frames_replaces() {
        let latest = LatestFrames::new();
        latest.publish(&frame("b", 1.0));
        latest.publish(&frame("a", 1.0));
        latest.publish(&frame("b", 5.0));
        assert_eq!(latest.names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(latest.get("b").and_then(|f| f.value("measurement")), Some(5.0));
    }

    #[test]
    fn test_latest_frames_readable_across_threads() {
        let latest = Arc::new(LatestFrames::new());
        latest.publish(&frame("arm", 42.0));
        let reader = Arc::clone(&latest);
        let value = std::thread::spawn(move || reader.get("arm").and_then(|f| f.value("measurement")))
            .join()
            .unwrap();
        assert_eq!(value, Some(42.0));
    }
}
