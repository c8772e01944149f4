//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use crate::config::Config;
use crate::orchestrator::{BatchReport, RunReport};
use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// 初始化日志：控制台输出，同时追加到日志文件
///
/// `RUST_LOG` 优先；否则 `verbose_logging` 为 true 时输出 debug 级别
pub fn init(config: &Config) -> Result<()> {
    init_log_file(&config.output_log_file)?;

    let default_level = if config.verbose_logging { "debug" } else { "info" };
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_default();
    let file_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_default();

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&config.output_log_file)?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(console_filter);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

/// 初始化日志文件（写入文件头）
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n批量下载日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量下载模式");
    info!("📄 目标列表: {}", config.target_source_file);
    info!("📁 下载目录: {}", config.download_folder);
    info!("💾 进度文件: {}", config.progress_file);
    match config.browser_debug_port {
        Some(port) => info!("🔌 浏览器: 连接已有浏览器（端口 {}）", port),
        None => info!("🔧 浏览器: 启动新浏览器"),
    }
    info!("{}", "=".repeat(60));
}

/// 记录目标加载信息
pub fn log_targets_loaded(total: usize, batch_size: usize) {
    info!("✓ 找到 {} 个待处理的文件", total);
    info!("📋 将以每批 {} 个的方式处理", batch_size);
    info!("💡 每批完成后可以选择继续、暂停或退出\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `batch_len`: 本批文件数
/// - `remaining`: 全部剩余文件数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    batch_len: usize,
    remaining: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批文件: {} 个 / 剩余 {} 个", batch_len, remaining);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, report: &BatchReport) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 成功 {}/{}，失败 {}",
        batch_num, report.succeeded, report.processed, report.failed
    );
    info!(
        "⏱️ 用时 {:.1} 分钟，平均 {:.1}s/文件",
        report.elapsed.as_secs_f64() / 60.0,
        report.avg_secs_per_target()
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(report: &RunReport, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 下载统计 - {}", report.state);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📋 总数: {}", report.total);
    info!(
        "📈 已处理: {} ({:.1}%)",
        report.completed, report.completion_rate
    );
    info!("✅ 成功: {}", report.succeeded);
    info!("❌ 失败: {}", report.failed);
    info!("🎯 成功率: {:.1}%", report.success_rate);
    info!("📦 本次执行批次: {}", report.batches_run);

    if !report.failed_preview.is_empty() {
        info!("\n失败的文件（前 {} 个）:", report.failed_preview.len());
        for (target, reason) in &report.failed_preview {
            info!("  - {}: {}", truncate_text(target, 80), reason);
        }
    }

    info!("{}", "=".repeat(60));
    info!("📁 下载目录: {}", config.download_folder);
    info!("💾 进度文件: {}", report.progress_file.display());
    info!("\n日志已保存至: {}", config.output_log_file);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
