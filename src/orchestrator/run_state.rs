//! 运行状态机
//!
//! ```text
//! Idle → AwaitingManualSetup → RunningBatch ⇄ BetweenBatches
//!                                   ↓
//!                               Completed
//! 任意非终止状态 → Interrupted
//! ```

use std::fmt;

/// 中断原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    /// 操作员选择在批次之间暂停
    Paused,
    /// 操作员选择退出
    Aborted,
    /// 收到中断信号（Ctrl-C）
    Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    AwaitingManualSetup,
    RunningBatch { index: usize },
    BetweenBatches { finished_index: usize },
    Completed,
    Interrupted(InterruptReason),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Interrupted(_))
    }

    /// 是否允许从当前状态进入 `next`
    pub fn allows(&self, next: &RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (from, Interrupted(_)) => !from.is_terminal(),
            (Idle, AwaitingManualSetup) | (Idle, Completed) => true,
            (AwaitingManualSetup, RunningBatch { .. }) => true,
            (RunningBatch { .. }, BetweenBatches { .. }) | (RunningBatch { .. }, Completed) => true,
            (BetweenBatches { .. }, RunningBatch { .. }) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "空闲"),
            RunState::AwaitingManualSetup => write!(f, "等待人工导航"),
            RunState::RunningBatch { index } => write!(f, "执行第 {} 批", index + 1),
            RunState::BetweenBatches { finished_index } => {
                write!(f, "第 {} 批已完成，等待继续", finished_index + 1)
            }
            RunState::Completed => write!(f, "全部完成"),
            RunState::Interrupted(InterruptReason::Paused) => write!(f, "已暂停"),
            RunState::Interrupted(InterruptReason::Aborted) => write!(f, "已退出"),
            RunState::Interrupted(InterruptReason::Signal) => write!(f, "已中断"),
        }
    }
}
