//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use actuator_sdk::prelude::*;
//! ```

// 模型层
pub use actuator_plant::{
    Amps, BatteryModel, DcMotor, Deg, PlantModel, Rad, SIM_STEP, SupplyRail, Volts,
};

// 控制层
pub use actuator_control::{
    ControlLaw, ControlMode, Controller, FeedforwardModel, Gains, LawOutput, Reference,
};

// 硬件层
pub use actuator_hal::{FaultFlag, MotorBinding, NativeClosedLoop, SimulatedBinding};

// 机构层
pub use actuator_mechanism::{
    ActuationBackend, Allocators, AngularConfig, AngularMechanism, Canvas, ClosedLoopSource,
    HardwareOptions, LatestFrames, Lifecycle, LoopConfig, Mechanism, MechanismBounds,
    MountPoint, PercentConfig, PercentMechanism, RecordingSink, ScenarioConfig, Scheduler,
    TelemetryFrame, TelemetrySink, TuningKey, VelocityConfig, VelocityMechanism,
};

// 错误类型
pub use actuator_control::ControlError;
pub use actuator_hal::HalError;
pub use actuator_mechanism::MechanismError;
