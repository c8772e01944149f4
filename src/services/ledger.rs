//! 进度账本 - 业务能力层
//!
//! 进度状态的唯一所有者：加载、记录单个目标的结果、原子地写回磁盘。
//! 写入时先写同目录下的临时文件，再整体替换，崩溃时不会留下半个文件。

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Outcome, ProgressState, Target};
use chrono::Utc;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// 进度账本
pub struct ProgressLedger {
    path: PathBuf,
    state: ProgressState,
    succeeded: HashSet<String>,
    failed: HashSet<String>,
    flush_interval: usize,
    since_flush: usize,
    dirty: bool,
    flush_count: usize,
}

impl ProgressLedger {
    /// 打开进度文件；文件不存在或为空时从全新状态开始
    pub fn open(path: impl Into<PathBuf>, flush_interval: usize) -> LedgerResult<Self> {
        let path = path.into();
        let state = Self::load(&path)?;
        let succeeded = state.succeeded_targets.iter().cloned().collect();
        let failed = state.failed_targets.iter().cloned().collect();

        let mut ledger = Self {
            path,
            state,
            succeeded,
            failed,
            flush_interval: flush_interval.max(1),
            since_flush: 0,
            dirty: false,
            flush_count: 0,
        };
        ledger.normalize();
        Ok(ledger)
    }

    /// 读取进度文件
    pub fn load(path: &Path) -> LedgerResult<ProgressState> {
        if !path.exists() {
            debug!("进度文件不存在，使用全新进度: {}", path.display());
            return Ok(ProgressState::fresh());
        }

        let content = std::fs::read_to_string(path).map_err(|source| LedgerError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            warn!("⚠️ 进度文件为空，使用全新进度: {}", path.display());
            return Ok(ProgressState::fresh());
        }

        let state: ProgressState =
            serde_json::from_str(&content).map_err(|source| LedgerError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            "📊 进度已加载: {}/{} 个文件已完成（成功 {}，失败 {}）",
            state.completed_count,
            state.total,
            state.succeeded_targets.len(),
            state.failed_targets.len()
        );
        Ok(state)
    }

    /// 修正手工编辑或旧版本文件中的不一致：去重、成功优先、重算计数
    fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.state.succeeded_targets.retain(|t| seen.insert(t.clone()));
        let succeeded = &self.succeeded;
        let mut seen = HashSet::new();
        self.state
            .failed_targets
            .retain(|t| !succeeded.contains(t) && seen.insert(t.clone()));
        self.failed = self.state.failed_targets.iter().cloned().collect();

        let before = self.state.completed_count;
        self.state.recount();
        if before != self.state.completed_count {
            warn!(
                "⚠️ 进度文件中的完成数 {} 与记录不一致，已修正为 {}",
                before, self.state.completed_count
            );
        }
        if self.state.start_time.is_none() {
            self.state.start_time = Some(Utc::now());
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_completed(&self, target: &Target) -> bool {
        self.succeeded.contains(target.as_str()) || self.failed.contains(target.as_str())
    }

    pub fn is_succeeded(&self, target: &Target) -> bool {
        self.succeeded.contains(target.as_str())
    }

    /// 已完成写盘的次数
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 设置目标总数（仅在尚未确定时）
    pub fn ensure_total(&mut self, total: usize) {
        if self.state.total == 0 {
            self.state.total = total;
            self.dirty = true;
        } else if self.state.total != total {
            warn!(
                "⚠️ 目标总数与进度文件不一致（文件 {}，当前 {}），保留文件中的值",
                self.state.total, total
            );
        }
    }

    /// 记录一个目标的结果
    ///
    /// 同一目标的新结果会替换旧结果
    pub fn record(&mut self, target: &Target, outcome: &Outcome) {
        let name = target.as_str();
        match outcome {
            Outcome::Succeeded => {
                if self.failed.remove(name) {
                    self.state.failed_targets.retain(|t| t != name);
                    self.state.failure_reasons.remove(name);
                }
                if self.succeeded.insert(name.to_string()) {
                    self.state.succeeded_targets.push(name.to_string());
                }
            }
            Outcome::Failed(reason) => {
                if self.succeeded.remove(name) {
                    self.state.succeeded_targets.retain(|t| t != name);
                }
                if self.failed.insert(name.to_string()) {
                    self.state.failed_targets.push(name.to_string());
                }
                self.state
                    .failure_reasons
                    .insert(name.to_string(), reason.clone());
            }
        }

        self.state.recount();
        self.state.last_processed_target = Some(name.to_string());
        self.state.last_update = Some(Utc::now());
        self.since_flush += 1;
        self.dirty = true;
    }

    /// 推进批次游标（只前进不后退）
    pub fn advance_batch(&mut self, next_index: usize) {
        if next_index > self.state.current_batch_index {
            self.state.current_batch_index = next_index;
            self.state.last_update = Some(Utc::now());
            self.dirty = true;
        }
    }

    /// 把失败的目标移出账本，使其在本次运行中重新处理
    pub fn requeue_failed(&mut self) -> usize {
        let count = self.state.failed_targets.len();
        if count > 0 {
            self.state.failed_targets.clear();
            self.state.failure_reasons.clear();
            self.failed.clear();
            self.state.recount();
            self.dirty = true;
            info!("🔁 {} 个失败的文件将重新尝试", count);
        }
        count
    }

    /// 达到保存间隔时写盘，返回是否写盘
    pub fn flush_if_due(&mut self) -> LedgerResult<bool> {
        if self.since_flush >= self.flush_interval {
            self.flush()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 无条件写盘（原子替换）
    pub fn flush(&mut self) -> LedgerResult<()> {
        let json = serde_json::to_string_pretty(&self.state)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let write_failed = |source| LedgerError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        std::fs::create_dir_all(&dir).map_err(write_failed)?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_failed)?;
        tmp.write_all(json.as_bytes()).map_err(write_failed)?;
        tmp.write_all(b"\n").map_err(write_failed)?;
        tmp.flush().map_err(write_failed)?;
        tmp.as_file().sync_all().map_err(write_failed)?;
        tmp.persist(&self.path).map_err(|e| write_failed(e.error))?;

        self.since_flush = 0;
        self.dirty = false;
        self.flush_count += 1;
        debug!(
            "💾 进度已保存: {}/{} ({})",
            self.state.completed_count,
            self.state.total,
            self.path.display()
        );
        Ok(())
    }
}
