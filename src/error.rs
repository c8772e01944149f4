//! 错误类型定义
//!
//! 错误分三类：
//! - 单个目标可恢复（定位失败、步骤超时）：在流程层转换为 `Outcome::Failed`，不会出现在这里
//! - 加载可恢复（目标文件解析失败）：加载器内部降级处理，最终返回空集合
//! - 致命错误（浏览器会话无法建立、进度文件损坏、配置非法）：本模块中的类型

use std::path::PathBuf;
use thiserror::Error;

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {0}")]
    LaunchFailed(String),
    /// 创建页面失败
    #[error("创建页面失败: {0}")]
    PageCreationFailed(#[source] chromiumoxide::error::CdpError),
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 设置下载目录失败
    #[error("设置下载目录 {path} 失败: {reason}")]
    DownloadSetupFailed { path: PathBuf, reason: String },
}

/// 进度文件错误
#[derive(Debug, Error)]
pub enum LedgerError {
    /// 读取进度文件失败
    #[error("读取进度文件失败 ({path}): {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 进度文件内容损坏，无法按默认值补齐
    #[error("进度文件已损坏 ({path}): {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// 写入进度文件失败
    #[error("写入进度文件失败 ({path}): {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 序列化失败
    #[error("序列化进度失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 取值非法
    #[error("配置项 {name} 取值非法: {reason}")]
    InvalidValue { name: &'static str, reason: String },
    /// 配置文件读取失败
    #[error("读取配置文件 {path} 失败: {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("解析配置文件 {path} 失败: {source}")]
    FileParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// 元素定位错误
///
/// 所有候选策略都在各自的等待时间内未找到可交互元素
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("{role} not found")]
    NotFound { role: String, strategies_tried: usize },
}

// ========== 便捷构造函数 ==========

impl ConfigError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            name,
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 进度文件结果类型
pub type LedgerResult<T> = Result<T, LedgerError>;
