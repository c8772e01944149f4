//! 持久化的进度状态
//!
//! 文件格式为带缩进的 JSON，键名使用 camelCase。所有字段都有默认值，
//! 未知字段在读取时忽略，以便新旧版本的进度文件互相兼容。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressState {
    /// 去重后的目标总数，首次确定后不再变化
    pub total: usize,
    /// 已完成数量（成功 + 失败）
    pub completed_count: usize,
    /// 下一个待执行的批次索引（从 0 开始）
    pub current_batch_index: usize,
    pub succeeded_targets: Vec<String>,
    pub failed_targets: Vec<String>,
    /// 失败目标最近一次的失败原因
    pub failure_reasons: BTreeMap<String, String>,
    pub last_processed_target: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub last_update: Option<DateTime<Utc>>,
}

impl ProgressState {
    /// 全新的进度（无历史记录时使用）
    pub fn fresh() -> Self {
        Self {
            start_time: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// 已完成（成功或失败）的目标集合
    pub fn completed_set(&self) -> HashSet<&str> {
        self.succeeded_targets
            .iter()
            .chain(self.failed_targets.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded_targets.len()
    }

    pub fn failed(&self) -> usize {
        self.failed_targets.len()
    }

    /// 成功率（百分比），没有已完成目标时为 0
    pub fn success_rate(&self) -> f64 {
        if self.completed_count == 0 {
            0.0
        } else {
            self.succeeded() as f64 / self.completed_count as f64 * 100.0
        }
    }

    /// 完成度（百分比）
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed_count as f64 / self.total as f64 * 100.0
        }
    }

    /// 从两个集合重新计算已完成数量
    pub(crate) fn recount(&mut self) {
        self.completed_count = self.succeeded_targets.len() + self.failed_targets.len();
    }
}
