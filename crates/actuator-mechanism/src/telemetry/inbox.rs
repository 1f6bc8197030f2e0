//! 调参收件箱（单写者队列）
//!
//! 仪表盘监听线程写入的参数变化不直接修改机构，而是投递到有界 channel，
//! 由调度器在每个周期开始时一次性排空并应用。这样同一周期内的控制计算
//! 不会看到“改了一半”的参数。
//!
//! - **有界队列**: 容量 1024，满时丢弃并计数
//! - **非阻塞**: 发送端使用 `try_send`
//!
//! ```rust
//! use actuator_mechanism::{TuningKey, tuning_channel};
//!
//! let (sender, inbox) = tuning_channel();
//! let remote = sender.clone();
//! std::thread::spawn(move || remote.send("shooter", TuningKey::Kp, 0.5)).join().unwrap();
//! let updates = inbox.drain();
//! assert_eq!(updates.len(), 1);
//! assert_eq!(updates[0].key, TuningKey::Kp);
//! ```

use crate::error::MechanismError;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 收件箱容量
pub const TUNING_QUEUE_CAPACITY: usize = 1024;

/// 可调参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningKey {
    Kp,
    Ki,
    Kd,
    IZone,
    Ks,
    Kv,
    Ka,
    Kg,
    Tolerance,
}

impl TuningKey {
    pub fn as_str(self) -> &'static str {
        match self {
            TuningKey::Kp => "kp",
            TuningKey::Ki => "ki",
            TuningKey::Kd => "kd",
            TuningKey::IZone => "i_zone",
            TuningKey::Ks => "ks",
            TuningKey::Kv => "kv",
            TuningKey::Ka => "ka",
            TuningKey::Kg => "kg",
            TuningKey::Tolerance => "tolerance",
        }
    }
}

impl fmt::Display for TuningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TuningKey {
    type Err = MechanismError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kp" => Ok(TuningKey::Kp),
            "ki" => Ok(TuningKey::Ki),
            "kd" => Ok(TuningKey::Kd),
            "i_zone" | "izone" => Ok(TuningKey::IZone),
            "ks" => Ok(TuningKey::Ks),
            "kv" => Ok(TuningKey::Kv),
            "ka" => Ok(TuningKey::Ka),
            "kg" => Ok(TuningKey::Kg),
            "tolerance" => Ok(TuningKey::Tolerance),
            other => Err(MechanismError::Config(format!("unknown tuning key '{}'", other))),
        }
    }
}

/// 一条调参更新
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TuningUpdate {
    pub mechanism: String,
    pub key: TuningKey,
    pub value: f64,
}

/// 发送端（可克隆，可跨线程）
#[derive(Debug, Clone)]
pub struct TuningSender {
    tx: Sender<TuningUpdate>,
    dropped: Arc<AtomicU64>,
}

impl TuningSender {
    /// 投递一条更新
    ///
    /// 队列满或接收端已关闭时返回 `false` 并计入丢弃数。
    pub fn send(&self, mechanism: impl Into<String>, key: TuningKey, value: f64) -> bool {
        let update = TuningUpdate {
            mechanism: mechanism.into(),
            key,
            value,
        };
        match self.tx.try_send(update) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            },
        }
    }

    pub fn dropped_updates(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// 接收端（调度器独占）
#[derive(Debug)]
pub struct TuningInbox {
    rx: Receiver<TuningUpdate>,
}

impl TuningInbox {
    /// 取出当前排队的全部更新（按到达顺序）
    pub fn drain(&self) -> Vec<TuningUpdate> {
        self.rx.try_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// 创建一对调参 channel
#[must_use]
pub fn tuning_channel() -> (TuningSender, TuningInbox) {
    let (tx, rx) = bounded(TUNING_QUEUE_CAPACITY);
    (
        TuningSender {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        TuningInbox { rx },
    )
}
