//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批次调度和运行状态，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量下载处理器
//! - 管理应用生命周期（初始化、运行、汇总）
//! - 加载目标列表和进度账本
//! - 管理浏览器资源（Browser、ChromeAgent）
//! - 驱动运行状态机
//!
//! ### `batch_executor` - 单批执行器
//! - 遍历一批中的文件
//! - 每个文件的结果写入进度账本，按间隔写盘
//!
//! ### `operator` - 操作员信号
//! - 就绪确认、批次间决策、Ctrl-C 中断
//!
//! ### `run_state` - 运行状态机
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Batch>)
//!     ↓
//! batch_executor (处理 Batch 中的 Vec<Target>)
//!     ↓
//! workflow::DownloadFlow (处理单个 Target)
//!     ↓
//! services (能力层：locator / ledger / planner)
//!     ↓
//! infrastructure (基础设施：UiAgent)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一会话**：只有编排层持有 Browser，所有 UI 操作串行执行
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **协作式中断**：中断信号只在文件之间和批次之间生效

pub mod batch_executor;
pub mod batch_processor;
pub mod operator;
pub mod run_state;

// 重新导出主要类型
pub use batch_executor::{execute_batch, BatchReport};
pub use batch_processor::{prepare_ledger, App, BatchProcessor, RunReport};
pub use operator::{
    spawn_ctrl_c_listener, AbortSignal, AutoOperator, BatchDecision, ConsoleOperator, Operator,
};
pub use run_state::{InterruptReason, RunState};
