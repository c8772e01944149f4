//! 操作员信号
//!
//! - 就绪确认：人工把浏览器导航到文件列表后确认
//! - 批次间决策：继续 / 暂停 / 退出
//! - 异步中断：Ctrl-C，在文件之间和批次之间生效

use crate::models::{Batch, BatchPlan};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 批次之间的决策
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDecision {
    Continue,
    Pause,
    Abort,
}

/// 操作员接口
#[async_trait]
pub trait Operator: Send + Sync {
    /// 等待操作员确认浏览器已经位于文件列表页面
    async fn confirm_ready(&self, plan: &BatchPlan) -> Result<()>;

    /// 询问是否继续执行下一批
    async fn between_batches(&self, next: &Batch, total_batches: usize) -> Result<BatchDecision>;
}

/// 解析批次间的输入，无法识别时返回 None
pub fn parse_decision(input: &str) -> Option<BatchDecision> {
    match input.trim().to_lowercase().as_str() {
        "" | "s" | "si" | "y" | "yes" | "c" => Some(BatchDecision::Continue),
        "n" | "no" | "p" => Some(BatchDecision::Pause),
        "q" | "quit" => Some(BatchDecision::Abort),
        _ => None,
    }
}

/// 控制台操作员（读取标准输入）
///
/// 标准输入由独立的系统线程读取，逐行送入通道；
/// 阻塞中的读取不会占用运行时，进程退出时也不需要等待它
pub struct ConsoleOperator {
    lines: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl ConsoleOperator {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("读取标准输入失败: {}", e);
                        break;
                    }
                }
            }
        });
        Self::with_receiver(rx)
    }

    /// 从给定通道读取输入行，发送端全部关闭视为输入结束
    pub fn with_receiver(lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            lines: Mutex::new(lines),
        }
    }

    async fn prompt(&self, message: &str) -> Result<String> {
        print!("{}", message);
        std::io::stdout().flush()?;
        match self.lines.lock().await.recv().await {
            Some(line) => Ok(line),
            None => bail!("标准输入已关闭"),
        }
    }
}

impl Default for ConsoleOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for ConsoleOperator {
    async fn confirm_ready(&self, plan: &BatchPlan) -> Result<()> {
        info!("{}", "=".repeat(60));
        info!(
            "🌐 共 {} 批待执行，剩余 {} 个文件",
            plan.batches.len(),
            plan.remaining_targets()
        );
        info!("1. 在打开的浏览器中手动登录并进入存放文件的列表页面");
        info!("2. 准备好后在此处按回车开始");
        info!("3. 进度会自动保存，随时可以按 Ctrl+C 中断");
        info!("{}", "=".repeat(60));

        self.prompt("⏳ 页面准备好后按回车继续...").await?;
        info!("🚀 开始自动下载");
        Ok(())
    }

    async fn between_batches(&self, next: &Batch, total_batches: usize) -> Result<BatchDecision> {
        loop {
            let input = self
                .prompt(&format!(
                    "\n继续执行第 {}/{} 批（{} 个文件）？(s/n/q 退出): ",
                    next.number(),
                    total_batches,
                    next.len()
                ))
                .await?;
            match parse_decision(&input) {
                Some(decision) => return Ok(decision),
                None => warn!("无法识别的输入: {:?}", input),
            }
        }
    }
}

/// 非交互操作员：直接就绪，总是继续
pub struct AutoOperator;

#[async_trait]
impl Operator for AutoOperator {
    async fn confirm_ready(&self, plan: &BatchPlan) -> Result<()> {
        info!(
            "🤖 非交互模式：直接开始（{} 批，{} 个文件）",
            plan.batches.len(),
            plan.remaining_targets()
        );
        Ok(())
    }

    async fn between_batches(&self, _next: &Batch, _total_batches: usize) -> Result<BatchDecision> {
        Ok(BatchDecision::Continue)
    }
}

/// 中断信号
///
/// 可以随时查询，也可以在等待操作员输入时一起等待
#[derive(Clone)]
pub struct AbortSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// 等待中断信号
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|aborted| *aborted).await;
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// 监听 Ctrl-C 并触发中断信号
pub fn spawn_ctrl_c_listener(signal: AbortSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("\n⏹️ 收到中断信号，当前文件处理完后停止...");
            signal.trigger();
        }
    })
}
