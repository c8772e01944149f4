//! # Console Batch Downloader
//!
//! 通过网页控制台逐个下载大量文件的 Rust 应用程序，可中断、可续传
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `UiAgent` - UI 自动化能力（查找、点击、输入、回车、后退）
//! - `ChromeAgent` - 唯一的 page owner，基于 CDP 实现 `UiAgent`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `LocatorResolver` - 按策略链定位语义元素
//! - `ProgressLedger` - 进度记录与原子写盘
//! - `planner` - 批次规划
//! - `download_scan` - 扫描下载目录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文件"的完整处理流程
//! - `TargetCtx` - 上下文封装（批次 + 序号）
//! - `DownloadFlow` - 流程编排（搜索 → 打开结果 → 下载 → 回到列表）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 运行状态机，管理浏览器和批次
//! - `orchestrator/batch_executor` - 单批执行器，遍历文件并记录进度
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{connect_to_browser_and_page, launch_browser};
pub use config::Config;
pub use error::{BrowserError, ConfigError, LedgerError, LocatorError};
pub use infrastructure::{ChromeAgent, Selector, UiAgent};
pub use models::{dedup_targets, Batch, BatchPlan, Outcome, ProgressState, Target};
pub use orchestrator::{App, BatchProcessor, RunReport, RunState};
pub use services::{LocatorResolver, LocatorTable, ProgressLedger, Role};
pub use workflow::{DownloadFlow, Step, TargetCtx};
