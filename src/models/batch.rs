use crate::models::target::Target;

/// 一个批次：剩余目标中连续的一段
///
/// 只在执行期间存在，持久化的只有批次索引
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 批次索引（从 0 开始，跨运行保持稳定）
    pub index: usize,
    pub targets: Vec<Target>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// 用于日志的批次编号（从 1 开始）
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// 本次运行的批次计划
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    pub batches: Vec<Batch>,
    /// 按完整目标列表切分得到的批次总数
    pub total_batches: usize,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// 计划中剩余的目标数量
    pub fn remaining_targets(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }
}
