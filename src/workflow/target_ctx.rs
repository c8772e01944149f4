//! 目标处理上下文
//!
//! 封装"我正在处理哪一批的第几个文件"这一信息

use crate::models::Target;
use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct TargetCtx {
    pub target: Target,

    /// 批次编号（从 1 开始，仅用于日志显示）
    pub batch_number: usize,

    /// 文件在本批中的序号（从 1 开始）
    pub position: usize,

    /// 本批文件数
    pub batch_len: usize,
}

impl TargetCtx {
    pub fn new(target: Target, batch_number: usize, position: usize, batch_len: usize) -> Self {
        Self {
            target,
            batch_number,
            position,
            batch_len,
        }
    }

    /// 是否输出详细日志：每批的前 5 个以及之后每 10 个中的第一个
    pub fn is_highlight(&self) -> bool {
        self.position <= 5 || self.position % 10 == 1
    }
}

impl Display for TargetCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[批次 #{} 文件 {}/{}]",
            self.batch_number, self.position, self.batch_len
        )
    }
}
