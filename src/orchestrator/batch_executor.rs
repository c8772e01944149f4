//! 单批执行器 - 编排层
//!
//! 逐个处理一批中的文件，每个结果都写入进度账本；
//! 中断信号只在文件之间检查，正在处理的文件总会完成（包括回到列表）。

use crate::infrastructure::UiAgent;
use crate::models::Batch;
use crate::orchestrator::operator::AbortSignal;
use crate::services::ProgressLedger;
use crate::workflow::{DownloadFlow, TargetCtx};
use anyhow::Result;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// 单批执行结果
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    /// 本批实际处理的文件数
    pub processed: usize,
    pub elapsed: Duration,
    /// 是否因中断信号提前结束
    pub interrupted: bool,
}

impl BatchReport {
    /// 平均每个文件耗时（秒）
    pub fn avg_secs_per_target(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.elapsed.as_secs_f64() / self.processed as f64
        }
    }
}

/// 执行一批
///
/// 账本写盘失败会向上返回；单个文件的失败只记录在账本中
pub async fn execute_batch<A: UiAgent>(
    flow: &DownloadFlow<A>,
    ledger: &mut ProgressLedger,
    batch: &Batch,
    abort: &AbortSignal,
) -> Result<BatchReport> {
    let started = Instant::now();
    let mut report = BatchReport::default();

    for (i, target) in batch.targets.iter().enumerate() {
        if abort.is_aborted() {
            info!(
                "⏹️ 第 {} 批在第 {}/{} 个文件前中断",
                batch.number(),
                i + 1,
                batch.len()
            );
            report.interrupted = true;
            break;
        }

        // 之前的运行可能已经记录过（例如同批次内中断后重新开始）
        if ledger.is_completed(target) {
            debug!("跳过已完成的文件: {}", target);
            continue;
        }

        let ctx = TargetCtx::new(target.clone(), batch.number(), i + 1, batch.len());
        let outcome = flow.run(&ctx).await;
        if outcome.is_success() {
            report.succeeded += 1;
        } else {
            report.failed += 1;
        }
        report.processed += 1;
        ledger.record(target, &outcome);
        if i + 1 == batch.len() {
            // 批次耗尽时游标立即前进，周期写盘与批次边界写盘的内容一致
            ledger.advance_batch(batch.index + 1);
        }

        if ledger.flush_if_due()? {
            log_progress(ledger, &report, started.elapsed(), batch.len() - (i + 1));
        }
    }

    if !report.interrupted {
        ledger.advance_batch(batch.index + 1);
    }
    report.elapsed = started.elapsed();
    Ok(report)
}

fn log_progress(
    ledger: &ProgressLedger,
    report: &BatchReport,
    elapsed: Duration,
    left_in_batch: usize,
) {
    let state = ledger.state();
    let avg = elapsed.as_secs_f64() / report.processed.max(1) as f64;
    let eta_minutes = avg * left_in_batch as f64 / 60.0;
    info!(
        "💾 进度: {}/{} ({:.1}%) | 平均 {:.1}s/文件 | 本批剩余 {} 个，预计 {:.1} 分钟",
        state.completed_count,
        state.total,
        state.completion_rate(),
        avg,
        left_in_batch,
        eta_minutes
    );
}
