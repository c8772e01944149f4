//! 元素定位服务 - 业务能力层
//!
//! 每种语义元素对应一组按顺序尝试的定位策略：先用精确的匹配，失败再退到宽松的匹配。
//! 所有等待和超时逻辑集中在 `LocatorResolver::resolve` 中。

use crate::config::RoleTimeouts;
use crate::error::LocatorError;
use crate::infrastructure::{Selector, UiAgent};
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

/// 语义元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// 搜索框
    SearchInput,
    /// 搜索结果中指向指定文件的链接
    ResultLink(String),
    /// 下载按钮
    DownloadTrigger,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::SearchInput => "SearchInput",
            Role::ResultLink(_) => "ResultLink",
            Role::DownloadTrigger => "DownloadTrigger",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 策略类型（仅用于日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// 按属性匹配
    Attribute,
    /// 按文本内容匹配
    Text,
    /// 按结构 / 祖先元素匹配
    Ancestor,
}

/// 一个定位策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub kind: StrategyKind,
    pub selector: Selector,
}

impl Strategy {
    fn xpath(kind: StrategyKind, expr: impl Into<String>) -> Self {
        Self {
            kind,
            selector: Selector::xpath(expr),
        }
    }
}

/// 定位策略表
///
/// 结果链接的策略中 `{name}` 会被替换为 XPath 字符串字面量
#[derive(Debug, Clone)]
pub struct LocatorTable {
    pub search_input: Vec<Strategy>,
    pub result_link: Vec<(StrategyKind, String)>,
    pub download_trigger: Vec<Strategy>,
}

impl Default for LocatorTable {
    fn default() -> Self {
        const DOWNLOAD_TEXT: &str =
            "contains(normalize-space(.), 'Descargar') or contains(normalize-space(.), 'Download')";
        const LOWER: &str = concat!(
            "translate(@placeholder, ",
            "'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz')"
        );

        Self {
            search_input: vec![
                Strategy::xpath(
                    StrategyKind::Attribute,
                    concat!(
                        "//input[contains(@placeholder, 'Buscar objetos')",
                        " or contains(@placeholder, 'Search objects')]"
                    ),
                ),
                Strategy::xpath(
                    StrategyKind::Attribute,
                    format!("//input[contains({LOWER}, 'buscar') or contains({LOWER}, 'search')]"),
                ),
                Strategy::xpath(
                    StrategyKind::Ancestor,
                    "//input[(@type='text' or @type='search') and contains(@class, 'search')]",
                ),
            ],
            result_link: vec![
                (StrategyKind::Text, "//a[contains(text(), {name})]".to_string()),
                (
                    StrategyKind::Ancestor,
                    "//span[contains(text(), {name})]/ancestor::a".to_string(),
                ),
                (
                    StrategyKind::Ancestor,
                    "//td[contains(text(), {name})]/ancestor::tr//a".to_string(),
                ),
            ],
            download_trigger: vec![
                Strategy::xpath(StrategyKind::Text, format!("//button[{DOWNLOAD_TEXT}]")),
                Strategy::xpath(StrategyKind::Text, format!("//a[{DOWNLOAD_TEXT}]")),
                Strategy::xpath(
                    StrategyKind::Ancestor,
                    concat!(
                        "//span[contains(text(), 'Descargar') or contains(text(), 'Download')]",
                        "/ancestor::button"
                    ),
                ),
            ],
        }
    }
}

impl LocatorTable {
    /// 取得某个语义元素的策略列表
    pub fn strategies(&self, role: &Role) -> Vec<Strategy> {
        match role {
            Role::SearchInput => self.search_input.clone(),
            Role::DownloadTrigger => self.download_trigger.clone(),
            Role::ResultLink(name) => {
                let literal = xpath_literal(name);
                self.result_link
                    .iter()
                    .map(|(kind, template)| {
                        Strategy::xpath(*kind, template.replace("{name}", &literal))
                    })
                    .collect()
            }
        }
    }
}

/// 把任意字符串转换为安全的 XPath 字符串字面量
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// 定位成功的结果
#[derive(Debug)]
pub struct Located<E> {
    pub element: E,
    /// 命中的策略序号（从 0 开始）
    pub strategy_index: usize,
}

/// 元素定位器
pub struct LocatorResolver {
    table: LocatorTable,
    /// 每个语义元素单个策略的等待时间：搜索框、结果链接、下载按钮
    waits: [Duration; 3],
    poll_interval: Duration,
}

impl LocatorResolver {
    pub fn new(table: LocatorTable, timeouts: RoleTimeouts, poll_interval: Duration) -> Self {
        Self {
            table,
            waits: [
                Duration::from_secs(timeouts.search_input),
                Duration::from_secs(timeouts.result_link),
                Duration::from_secs(timeouts.download_trigger),
            ],
            poll_interval,
        }
    }

    /// 所有语义元素使用相同的等待时间
    pub fn uniform(table: LocatorTable, per_strategy: Duration, poll_interval: Duration) -> Self {
        Self {
            table,
            waits: [per_strategy; 3],
            poll_interval,
        }
    }

    /// 单个策略的等待时间
    pub fn strategy_timeout(&self, role: &Role) -> Duration {
        match role {
            Role::SearchInput => self.waits[0],
            Role::ResultLink(_) => self.waits[1],
            Role::DownloadTrigger => self.waits[2],
        }
    }

    /// 使用配置的等待时间定位元素
    pub async fn resolve<A: UiAgent>(
        &self,
        agent: &A,
        role: &Role,
    ) -> Result<Located<A::Element>, LocatorError> {
        self.resolve_within(agent, role, self.strategy_timeout(role)).await
    }

    /// 依次尝试每个策略，每个策略最多等待 `per_strategy`；第一个可交互的元素胜出
    ///
    /// 总耗时不超过 策略数 × `per_strategy`（加一次轮询间隔的误差）
    pub async fn resolve_within<A: UiAgent>(
        &self,
        agent: &A,
        role: &Role,
        per_strategy: Duration,
    ) -> Result<Located<A::Element>, LocatorError> {
        let strategies = self.table.strategies(role);

        for (index, strategy) in strategies.iter().enumerate() {
            debug!(
                "定位 {} - 策略 {}/{} ({:?}): {}",
                role,
                index + 1,
                strategies.len(),
                strategy.kind,
                strategy.selector
            );
            if let Some(element) = self.poll_strategy(agent, strategy, per_strategy).await {
                if index > 0 {
                    debug!("{} 通过备用策略 {} 定位成功", role, index + 1);
                }
                return Ok(Located {
                    element,
                    strategy_index: index,
                });
            }
        }

        warn!("⚠️ {} 未找到（已尝试 {} 个策略）", role, strategies.len());
        Err(LocatorError::NotFound {
            role: role.name().to_string(),
            strategies_tried: strategies.len(),
        })
    }

    /// 在截止时间前反复尝试一个策略
    async fn poll_strategy<A: UiAgent>(
        &self,
        agent: &A,
        strategy: &Strategy,
        wait: Duration,
    ) -> Option<A::Element> {
        let deadline = Instant::now() + wait;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let attempt = async {
                match agent.find_element(&strategy.selector).await {
                    Ok(Some(element)) if agent.is_interactable(&element).await => Some(element),
                    Ok(_) => None,
                    Err(e) => {
                        debug!("查找元素出错: {}", e);
                        None
                    }
                }
            };

            // 单次查找本身也受截止时间约束
            if let Ok(Some(element)) = timeout(remaining, attempt).await {
                return Some(element);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
