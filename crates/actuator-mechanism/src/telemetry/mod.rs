//! 遥测
//!
//! - [`projection`]: 把机构标量状态投影为 2D 图元（根节点 + 线段）
//! - [`sink`]: 图元帧的去向（录制、最新帧缓存、tracing 日志）
//! - [`inbox`]: 外部调参写入的单写者队列，每个调度周期排空一次

pub mod inbox;
pub mod projection;
pub mod sink;

pub use inbox::{TuningInbox, TuningKey, TuningSender, TuningUpdate, tuning_channel};
pub use projection::{
    Canvas, Color, DIAL_LENGTH, LINE_WIDTH, Ligament, Root, TelemetryFrame, TelemetryValue, Visual,
    dial_angle, percent_angle,
};
pub use sink::{LatestFrames, RecordingSink, TelemetryHub, TelemetrySink, TracingSink};
