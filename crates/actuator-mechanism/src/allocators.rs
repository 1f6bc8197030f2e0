//! 显式分配器
//!
//! 可视化颜色与仿真端口号都由配置路径上传入的分配器对象发放，
//! 而不是进程级全局计数器：两次独立的配置过程互不影响，测试可以复现。
//! 分配器只在配置阶段被修改。

use crate::error::MechanismError;
use crate::telemetry::Color;
use std::collections::BTreeSet;

/// 默认调色板
pub const DEFAULT_PALETTE: [Color; 8] = [
    Color::rgb(255, 0, 0),
    Color::rgb(0, 255, 0),
    Color::rgb(0, 0, 255),
    Color::rgb(255, 255, 0),
    Color::rgb(0, 255, 255),
    Color::rgb(255, 0, 255),
    Color::rgb(255, 165, 0),
    Color::rgb(255, 255, 255),
];

/// 颜色分配器：循环发放调色板中的颜色
#[derive(Debug, Clone)]
pub struct ColorAllocator {
    palette: Vec<Color>,
    next: usize,
}

impl Default for ColorAllocator {
    fn default() -> Self {
        ColorAllocator {
            palette: DEFAULT_PALETTE.to_vec(),
            next: 0,
        }
    }
}

impl ColorAllocator {
    /// 使用自定义调色板，空调色板退回默认调色板
    pub fn with_palette(palette: Vec<Color>) -> Self {
        if palette.is_empty() {
            return Self::default();
        }
        ColorAllocator { palette, next: 0 }
    }

    pub fn next_color(&mut self) -> Color {
        let color = self.palette[self.next % self.palette.len()];
        self.next += 1;
        color
    }

    /// 已发放的颜色数
    pub fn issued(&self) -> usize {
        self.next
    }
}

/// 仿真端口分配器
///
/// 从 `first` 开始递增发放，跳过已被显式占用的端口。
#[derive(Debug, Clone, Default)]
pub struct SimPortAllocator {
    next: u32,
    taken: BTreeSet<u32>,
}

impl SimPortAllocator {
    pub fn starting_at(first: u32) -> Self {
        SimPortAllocator {
            next: first,
            taken: BTreeSet::new(),
        }
    }

    pub fn allocate(&mut self) -> u32 {
        while self.taken.contains(&self.next) {
            self.next += 1;
        }
        let port = self.next;
        self.taken.insert(port);
        self.next += 1;
        port
    }

    /// 显式占用某个端口（例如配置文件指定了端口）
    pub fn reserve(&mut self, port: u32) -> Result<(), MechanismError> {
        if self.taken.insert(port) {
            Ok(())
        } else {
            Err(MechanismError::Config(format!("simulated port {} already in use", port)))
        }
    }

    pub fn is_taken(&self, port: u32) -> bool {
        self.taken.contains(&port)
    }
}

/// 配置路径上传递的全部分配器
#[derive(Debug, Clone, Default)]
pub struct Allocators {
    pub colors: ColorAllocator,
    pub ports: SimPortAllocator,
}

impl Allocators {
    pub fn new() -> Self {
        Self::default()
    }
}
