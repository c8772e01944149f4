//! 批量下载处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批次调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、监听中断信号
//! 2. **准备进度**：加载目标列表和进度账本，跳过已下载的文件
//! 3. **资源管理**：启动或连接浏览器，持有唯一的 UI 会话
//! 4. **批次调度**：驱动运行状态机，批次之间询问操作员
//! 5. **全局统计**：运行结束后输出汇总
//!
//! 任何结束方式（完成、暂停、退出、中断）都会在汇总前强制写盘一次。

use crate::browser;
use crate::config::Config;
use crate::infrastructure::{ChromeAgent, UiAgent};
use crate::models::{load_targets, Outcome, Target};
use crate::orchestrator::batch_executor::execute_batch;
use crate::orchestrator::operator::{
    spawn_ctrl_c_listener, AbortSignal, AutoOperator, BatchDecision, ConsoleOperator, Operator,
};
use crate::orchestrator::run_state::{InterruptReason, RunState};
use crate::services::{download_scan, planner, ProgressLedger};
use crate::utils::logging;
use crate::workflow::DownloadFlow;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 汇总中列出的失败文件数量
const FAILED_PREVIEW_LEN: usize = 10;

/// 一次运行的汇总
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub state: RunState,
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub completion_rate: f64,
    /// 本次运行执行过的批次数
    pub batches_run: usize,
    /// 前若干个失败文件及原因
    pub failed_preview: Vec<(String, String)>,
    pub progress_file: PathBuf,
}

impl RunReport {
    fn from_ledger(state: RunState, ledger: &ProgressLedger, batches_run: usize) -> Self {
        let progress = ledger.state();
        let failed_preview = progress
            .failed_targets
            .iter()
            .take(FAILED_PREVIEW_LEN)
            .map(|t| {
                let reason = progress.failure_reasons.get(t).cloned().unwrap_or_default();
                (t.clone(), reason)
            })
            .collect();

        Self {
            state,
            total: progress.total,
            completed: progress.completed_count,
            succeeded: progress.succeeded(),
            failed: progress.failed(),
            success_rate: progress.success_rate(),
            completion_rate: progress.completion_rate(),
            batches_run,
            failed_preview,
            progress_file: ledger.path().to_path_buf(),
        }
    }
}

/// 批次调度器：持有下载流程、进度账本和操作员
pub struct BatchProcessor<A: UiAgent> {
    flow: DownloadFlow<A>,
    ledger: ProgressLedger,
    operator: Box<dyn Operator>,
    abort: AbortSignal,
    batch_size: usize,
    inter_batch_pause: Duration,
    state: RunState,
}

impl<A: UiAgent> BatchProcessor<A> {
    pub fn new(
        flow: DownloadFlow<A>,
        ledger: ProgressLedger,
        operator: Box<dyn Operator>,
        abort: AbortSignal,
        batch_size: usize,
        inter_batch_pause: Duration,
    ) -> Self {
        Self {
            flow,
            ledger,
            operator,
            abort,
            batch_size,
            inter_batch_pause,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    pub fn flow(&self) -> &DownloadFlow<A> {
        &self.flow
    }

    /// 处理全部目标，返回运行汇总
    ///
    /// `targets` 必须是去重后的完整目标列表
    pub async fn run(&mut self, targets: &[Target]) -> Result<RunReport> {
        self.ledger.ensure_total(targets.len());
        let plan = planner::plan(targets, self.ledger.state(), self.batch_size);
        let mut batches_run = 0;

        if plan.is_empty() {
            info!("✅ 没有剩余的文件，无需处理");
            self.transition(RunState::Completed);
        } else {
            self.transition(RunState::AwaitingManualSetup);
            let ready = tokio::select! {
                ready = self.operator.confirm_ready(&plan) => Some(ready),
                _ = self.abort.cancelled() => None,
            };
            match ready {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    warn!("⚠️ 未能确认就绪: {:#}", e);
                    self.transition(RunState::Interrupted(InterruptReason::Aborted));
                }
                None => self.transition(RunState::Interrupted(InterruptReason::Signal)),
            }
        }

        let mut batches = plan.batches.iter().peekable();
        while !self.state.is_terminal() {
            let Some(batch) = batches.next() else {
                break;
            };

            self.transition(RunState::RunningBatch { index: batch.index });
            logging::log_batch_start(
                batch.number(),
                plan.total_batches,
                batch.len(),
                planner::remaining(targets, self.ledger.state()).len(),
            );

            let report = execute_batch(&self.flow, &mut self.ledger, batch, &self.abort).await?;
            batches_run += 1;
            self.ledger.flush().context("批次结束时保存进度失败")?;
            logging::log_batch_complete(batch.number(), &report);

            if report.interrupted {
                self.transition(RunState::Interrupted(InterruptReason::Signal));
                break;
            }

            let Some(next) = batches.peek() else {
                self.transition(RunState::Completed);
                break;
            };

            self.transition(RunState::BetweenBatches {
                finished_index: batch.index,
            });
            if self.abort.is_aborted() {
                self.transition(RunState::Interrupted(InterruptReason::Signal));
                break;
            }

            let decision = tokio::select! {
                decision = self.operator.between_batches(next, plan.total_batches) => {
                    Some(decision)
                }
                _ = self.abort.cancelled() => None,
            };
            let next_state = match decision {
                Some(Ok(BatchDecision::Continue)) => self.pause_between_batches().await,
                Some(Ok(BatchDecision::Pause)) => Some(InterruptReason::Paused),
                Some(Ok(BatchDecision::Abort)) => Some(InterruptReason::Aborted),
                Some(Err(e)) => {
                    warn!("⚠️ 读取操作员输入失败: {:#}", e);
                    Some(InterruptReason::Aborted)
                }
                None => Some(InterruptReason::Signal),
            };
            if let Some(reason) = next_state {
                self.transition(RunState::Interrupted(reason));
            }
        }

        self.ledger.flush().context("保存最终进度失败")?;
        Ok(RunReport::from_ledger(self.state, &self.ledger, batches_run))
    }

    /// 批次之间的暂停，期间收到中断信号时返回中断原因
    async fn pause_between_batches(&self) -> Option<InterruptReason> {
        if self.inter_batch_pause.is_zero() {
            return None;
        }
        info!("⏸️ 暂停 {} 秒后开始下一批...", self.inter_batch_pause.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(self.inter_batch_pause) => None,
            _ = self.abort.cancelled() => Some(InterruptReason::Signal),
        }
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.allows(&next),
            "非法的状态转换: {:?} → {:?}",
            self.state,
            next
        );
        debug!("状态: {} → {}", self.state, next);
        if let RunState::Interrupted(_) = next {
            info!("⏹️ {}", next);
        }
        self.state = next;
    }
}

/// 运行前整理进度账本
///
/// - 按配置把失败的文件重新加入队列
/// - 下载目录中已经存在的文件直接记为成功
pub fn prepare_ledger(
    config: &Config,
    ledger: &mut ProgressLedger,
    targets: &[Target],
) -> Result<()> {
    if config.retry_failed {
        ledger.requeue_failed();
    }

    if config.skip_existing_downloads {
        let existing = download_scan::existing_downloads(&config.download_dir())?;
        let found: Vec<Target> = download_scan::already_downloaded(targets, &existing)
            .into_iter()
            .filter(|t| !ledger.is_succeeded(t))
            .cloned()
            .collect();
        if !found.is_empty() {
            info!("📁 {} 个文件已在下载目录中，记为成功", found.len());
            for target in &found {
                ledger.record(target, &Outcome::Succeeded);
            }
        }
    }

    if ledger.is_dirty() {
        ledger.flush().context("保存整理后的进度失败")?;
    }
    Ok(())
}

/// 应用主结构
pub struct App {
    config: Config,
    abort: AbortSignal,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let abort = AbortSignal::new();
        spawn_ctrl_c_listener(abort.clone());

        Ok(Self { config, abort })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunReport> {
        let config = &self.config;

        info!("\n📁 正在读取目标列表: {}", config.target_source_file);
        let source = Path::new(&config.target_source_file);
        let targets = load_targets(source, &config.target_column).await;

        let mut ledger = ProgressLedger::open(&config.progress_file, config.flush_interval)
            .with_context(|| format!("无法读取进度文件: {}", config.progress_file))?;

        if targets.is_empty() {
            warn!("⚠️ 没有找到可处理的文件名，程序结束");
            let report = RunReport::from_ledger(RunState::Completed, &ledger, 0);
            logging::print_final_stats(&report, config);
            return Ok(report);
        }
        logging::log_targets_loaded(targets.len(), config.batch_size);

        ledger.ensure_total(targets.len());
        prepare_ledger(config, &mut ledger, &targets)?;

        if planner::remaining(&targets, ledger.state()).is_empty() {
            info!("🎉 所有文件均已处理，无需启动浏览器");
            ledger.flush()?;
            let report = RunReport::from_ledger(RunState::Completed, &ledger, 0);
            logging::print_final_stats(&report, config);
            return Ok(report);
        }

        // 浏览器在整个运行期间保持存活
        let (_browser, page) = match config.browser_debug_port {
            Some(port) => browser::connect_to_browser_and_page(port, None, None).await?,
            None => browser::launch_browser(&config.start_url, &config.download_dir()).await?,
        };
        let flow = DownloadFlow::new(ChromeAgent::new(page), config);

        let operator: Box<dyn Operator> = if config.non_interactive {
            Box::new(AutoOperator)
        } else {
            Box::new(ConsoleOperator::new())
        };

        let mut processor = BatchProcessor::new(
            flow,
            ledger,
            operator,
            self.abort.clone(),
            config.batch_size,
            config.inter_batch_pause(),
        );
        let report = processor.run(&targets).await?;

        logging::print_final_stats(&report, config);
        Ok(report)
    }
}
