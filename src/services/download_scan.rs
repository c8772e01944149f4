//! 下载目录扫描 - 业务能力层
//!
//! 找出下载目录中已经存在的文件，避免重复下载

use crate::models::Target;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// 浏览器未完成的下载文件后缀
const PARTIAL_SUFFIXES: &[&str] = &[".crdownload", ".part", ".tmp"];

/// 列出下载目录中已完成的文件名；目录不存在时返回空集合
///
/// 文件名按原样比较，浏览器追加的 " (1)" 之类副本不算已下载
pub fn existing_downloads(folder: &Path) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    if !folder.exists() {
        return Ok(names);
    }

    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("无法读取下载目录: {}", folder.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            continue;
        }
        names.insert(name);
    }

    info!("📁 下载目录中已有 {} 个文件", names.len());
    Ok(names)
}

/// 目标列表中已经下载过的目标（按目标顺序）
///
/// 目标可能带路径前缀，只比较最后一段文件名
pub fn already_downloaded<'a>(
    targets: &'a [Target],
    existing: &HashSet<String>,
) -> Vec<&'a Target> {
    targets
        .iter()
        .filter(|t| {
            let base = t.as_str().rsplit(['/', '\\']).next().unwrap_or(t.as_str());
            existing.contains(base)
        })
        .collect()
}
