use crate::models::target::{dedup_targets, Target};
use anyhow::{anyhow, bail, Result};
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, info, warn};

/// 未找到配置列名时依次尝试的列名
const COLUMN_ALIASES: &[&str] = &["file", "filename", "file_name", "archivo", "name", "key"];

/// 手动解析时查找表头的行数
const HEADER_SCAN_LINES: usize = 10;

/// 从 CSV 文件加载目标列表
///
/// 读取失败或找不到目标列时返回空列表（由调用方视为"无事可做"）
pub async fn load_targets(path: &Path, column: &str) -> Vec<Target> {
    info!("📁 正在从 {} 加载目标列表", path.display());

    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("❌ 无法读取目标文件 {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let content = String::from_utf8_lossy(&bytes);
    let targets = parse_targets(&content, column);

    if targets.is_empty() {
        warn!("⚠️ 目标文件中没有可用的文件名");
    } else {
        info!("📊 共找到 {} 个唯一文件名", targets.len());
        for (i, target) in targets.iter().take(3).enumerate() {
            info!("  {}. {}", i + 1, target);
        }
        if targets.len() > 3 {
            info!("  ... 以及另外 {} 个", targets.len() - 3);
        }
    }

    targets
}

/// 解析 CSV 文本，依次尝试多种分隔符，最后退回手动解析
pub fn parse_targets(content: &str, column: &str) -> Vec<Target> {
    let content = content.trim_start_matches('\u{feff}');
    let first_line = content.lines().next().unwrap_or_default();
    let detected = detect_delimiter(first_line);
    debug!("检测到分隔符: {:?}", detected as char);

    let mut delimiters = vec![detected];
    for fallback in [b';', b','] {
        if !delimiters.contains(&fallback) {
            delimiters.push(fallback);
        }
    }

    for (attempt, delimiter) in delimiters.iter().enumerate() {
        match parse_with_csv(content, *delimiter, column) {
            Ok(names) => {
                if attempt > 0 {
                    info!("🔧 使用备用分隔符 {:?} 解析成功", *delimiter as char);
                }
                return dedup_targets(names);
            }
            Err(e) => warn!("⚠️ 分隔符 {:?} 解析失败: {}", *delimiter as char, e),
        }
    }

    info!("🔧 尝试手动逐行解析...");
    match parse_manually(content, column) {
        Ok(names) => dedup_targets(names),
        Err(e) => {
            error!("❌ 手动解析失败: {}", e);
            Vec::new()
        }
    }
}

/// 根据表头行判断分隔符
pub fn detect_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    let tabs = header_line.matches('\t').count();

    if tabs > semicolons && tabs > commas {
        b'\t'
    } else if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// 在表头中查找目标列：先找配置的列名，再找常见别名，均不区分大小写
pub fn find_target_column<S: AsRef<str>>(headers: &[S], column: &str) -> Option<usize> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.as_ref().trim().trim_matches('"').to_lowercase())
        .collect();

    std::iter::once(column)
        .chain(COLUMN_ALIASES.iter().copied())
        .map(|candidate| candidate.trim().to_lowercase())
        .find_map(|candidate| normalized.iter().position(|h| *h == candidate))
}

fn parse_with_csv(content: &str, delimiter: u8, column: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let index = find_target_column(&headers, column)
        .ok_or_else(|| anyhow!("未找到目标列 '{}'，可用列: {:?}", column, headers))?;

    let mut names = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index) {
            names.push(value.trim().to_string());
        }
    }
    Ok(names)
}

/// 宽松的手动解析：在前几行中查找表头，支持双引号
fn parse_manually(content: &str, column: &str) -> Result<Vec<String>> {
    let lines: Vec<&str> = content.lines().collect();

    let mut header = None;
    for (line_no, line) in lines.iter().take(HEADER_SCAN_LINES).enumerate() {
        let delimiter = detect_delimiter(line) as char;
        let fields = split_quoted(line, delimiter);
        if let Some(index) = find_target_column(&fields, column) {
            header = Some((line_no, index, delimiter, fields[index].clone()));
            break;
        }
    }

    let Some((header_line, index, delimiter, header_name)) = header else {
        bail!("前 {} 行中没有找到目标列", HEADER_SCAN_LINES);
    };
    info!("📍 目标列位于第 {} 列（表头在第 {} 行）", index + 1, header_line + 1);

    let names = lines[header_line + 1..]
        .iter()
        .filter_map(|line| split_quoted(line, delimiter).into_iter().nth(index))
        .filter(|value| !value.is_empty() && *value != header_name)
        .collect();
    Ok(names)
}

/// 按分隔符切分一行，引号内的分隔符不切分
fn split_quoted(line: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut inside_quotes = false;

    for ch in line.trim().chars() {
        match ch {
            '"' => inside_quotes = !inside_quotes,
            c if c == delimiter && !inside_quotes => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    parts.push(current.trim().to_string());
    parts
}
