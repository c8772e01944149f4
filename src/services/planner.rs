//! 批次规划 - 业务能力层
//!
//! 按完整目标列表切分批次，批次索引在多次运行之间保持不变；
//! 每个批次只保留尚未完成的目标。

use crate::models::{Batch, BatchPlan, ProgressState, Target};
use tracing::{info, warn};

/// 生成批次计划
///
/// - `all_targets`：去重后的完整目标列表（保持首次出现顺序）
/// - 从 `state.current_batch_index` 开始；若游标之前的批次仍有未完成目标
///   （目标列表被修改或失败目标被重新加入），则从最早的这种批次开始
/// - 过滤后为空的批次不会出现在计划中
pub fn plan(all_targets: &[Target], state: &ProgressState, batch_capacity: usize) -> BatchPlan {
    let capacity = batch_capacity.max(1);
    let completed = state.completed_set();
    let total_batches = all_targets.len().div_ceil(capacity);

    let remaining_of = |index: usize| -> Vec<Target> {
        let start = index * capacity;
        let end = (start + capacity).min(all_targets.len());
        all_targets[start..end]
            .iter()
            .filter(|t| !completed.contains(t.as_str()))
            .cloned()
            .collect()
    };

    let cursor = state.current_batch_index.min(total_batches);
    let start = (0..cursor)
        .find(|&index| !remaining_of(index).is_empty())
        .map(|index| {
            warn!(
                "⚠️ 批次 {} 位于进度游标 {} 之前但仍有未完成的文件，从该批次重新开始",
                index + 1,
                cursor + 1
            );
            index
        })
        .unwrap_or(cursor);

    let batches: Vec<Batch> = (start..total_batches)
        .map(|index| Batch {
            index,
            targets: remaining_of(index),
        })
        .filter(|batch| !batch.is_empty())
        .collect();

    let plan = BatchPlan {
        batches,
        total_batches,
    };
    info!(
        "📦 批次计划: 共 {} 批，本次需执行 {} 批，剩余 {} 个文件",
        plan.total_batches,
        plan.batches.len(),
        plan.remaining_targets()
    );
    plan
}

/// 剩余目标序列（保持原始顺序）
pub fn remaining(all_targets: &[Target], state: &ProgressState) -> Vec<Target> {
    let completed = state.completed_set();
    all_targets
        .iter()
        .filter(|t| !completed.contains(t.as_str()))
        .cloned()
        .collect()
}
