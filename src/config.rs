use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件名（存在时读取）
pub const DEFAULT_CONFIG_FILE: &str = "downloader.toml";

/// 各类元素的单策略等待时间（秒）
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoleTimeouts {
    pub search_input: u64,
    pub result_link: u64,
    pub download_trigger: u64,
}

impl Default for RoleTimeouts {
    fn default() -> Self {
        Self {
            search_input: 3,
            result_link: 3,
            download_trigger: 3,
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 目标文件名列表（CSV）
    pub target_source_file: String,
    /// 目标文件名所在的列
    pub target_column: String,
    /// 浏览器下载目录
    pub download_folder: String,
    /// 进度文件
    pub progress_file: String,
    /// 每批处理的目标数量
    pub batch_size: usize,
    /// 每处理多少个目标保存一次进度
    pub flush_interval: usize,
    /// 元素定位等待时间
    pub timeouts: RoleTimeouts,
    /// 单个步骤的总超时（秒）
    pub step_timeout_secs: u64,
    /// 动作之后等待页面稳定的时间（毫秒）
    pub settle_delay_ms: u64,
    /// 定位轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 批次之间的暂停（秒）
    pub inter_batch_pause_secs: u64,
    /// 浏览器调试端口，设置后连接已有浏览器而不是启动新浏览器
    pub browser_debug_port: Option<u16>,
    /// 起始页面
    pub start_url: String,
    /// 非交互模式（自动确认、自动继续）
    pub non_interactive: bool,
    /// 跳过下载目录中已存在的文件
    pub skip_existing_downloads: bool,
    /// 重新尝试之前失败的目标
    pub retry_failed: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_source_file: "targets.csv".to_string(),
            target_column: "file".to_string(),
            download_folder: "downloads".to_string(),
            progress_file: "download_progress.json".to_string(),
            batch_size: 1500,
            flush_interval: 5,
            timeouts: RoleTimeouts::default(),
            step_timeout_secs: 20,
            settle_delay_ms: 1500,
            poll_interval_ms: 250,
            inter_batch_pause_secs: 10,
            browser_debug_port: None,
            start_url: "https://console.aws.amazon.com".to_string(),
            non_interactive: false,
            skip_existing_downloads: true,
            retry_failed: false,
            verbose_logging: false,
            output_log_file: "download_log.txt".to_string(),
        }
    }
}

impl Config {
    /// 加载配置：默认值 ← 配置文件（可选） ← 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取，缺失字段使用默认值
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::FileParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖已有配置，无法解析的值保持原样
    pub fn with_env_overrides(self) -> Self {
        let base = self;
        Self {
            target_source_file: env_or("TARGET_SOURCE_FILE", base.target_source_file),
            target_column: env_or("TARGET_COLUMN", base.target_column),
            download_folder: env_or("DOWNLOAD_FOLDER", base.download_folder),
            progress_file: env_or("PROGRESS_FILE", base.progress_file),
            batch_size: env_parse_or("BATCH_SIZE", base.batch_size),
            flush_interval: env_parse_or("FLUSH_INTERVAL", base.flush_interval),
            timeouts: RoleTimeouts {
                search_input: env_parse_or("SEARCH_INPUT_TIMEOUT_SECS", base.timeouts.search_input),
                result_link: env_parse_or("RESULT_LINK_TIMEOUT_SECS", base.timeouts.result_link),
                download_trigger: env_parse_or(
                    "DOWNLOAD_TRIGGER_TIMEOUT_SECS",
                    base.timeouts.download_trigger,
                ),
            },
            step_timeout_secs: env_parse_or("STEP_TIMEOUT_SECS", base.step_timeout_secs),
            settle_delay_ms: env_parse_or("SETTLE_DELAY_MS", base.settle_delay_ms),
            poll_interval_ms: env_parse_or("POLL_INTERVAL_MS", base.poll_interval_ms),
            inter_batch_pause_secs: env_parse_or(
                "INTER_BATCH_PAUSE_SECS",
                base.inter_batch_pause_secs,
            ),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(base.browser_debug_port),
            start_url: env_or("START_URL", base.start_url),
            non_interactive: env_parse_or("NON_INTERACTIVE", base.non_interactive),
            skip_existing_downloads: env_parse_or(
                "SKIP_EXISTING_DOWNLOADS",
                base.skip_existing_downloads,
            ),
            retry_failed: env_parse_or("RETRY_FAILED", base.retry_failed),
            verbose_logging: env_parse_or("VERBOSE_LOGGING", base.verbose_logging),
            output_log_file: env_or("OUTPUT_LOG_FILE", base.output_log_file),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("batch_size", "必须大于 0"));
        }
        if self.flush_interval == 0 {
            return Err(ConfigError::invalid("flush_interval", "必须大于 0"));
        }
        for (name, secs) in [
            ("timeouts.search_input", self.timeouts.search_input),
            ("timeouts.result_link", self.timeouts.result_link),
            ("timeouts.download_trigger", self.timeouts.download_trigger),
            ("step_timeout_secs", self.step_timeout_secs),
        ] {
            if !(1..=120).contains(&secs) {
                return Err(ConfigError::invalid(name, format!("{} 秒不在 1..=120 范围内", secs)));
            }
        }
        if self.target_column.trim().is_empty() {
            return Err(ConfigError::invalid("target_column", "不能为空"));
        }
        Ok(())
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn inter_batch_pause(&self) -> Duration {
        Duration::from_secs(self.inter_batch_pause_secs)
    }

    pub fn download_dir(&self) -> PathBuf {
        PathBuf::from(&self.download_folder)
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
