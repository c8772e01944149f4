//! 目标与处理结果

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// 一个待下载的文件名
///
/// 以字符串完全相等判定同一目标
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    /// 原样保留名称；空白名称返回 None
    ///
    /// 单元格两端的空白由加载器清理
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let name = name.as_ref();
        if name.trim().is_empty() {
            None
        } else {
            Some(Self(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Target {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 去重并保留首次出现的顺序
pub fn dedup_targets<I, S>(names: I) -> Vec<Target>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter_map(Target::new)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// 单个目标的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 下载动作已触发
    Succeeded,
    /// 处理失败（附原因）
    Failed(String),
}

impl Outcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Outcome::Failed(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Succeeded => None,
            Outcome::Failed(reason) => Some(reason),
        }
    }
}
