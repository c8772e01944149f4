//! UI 自动化代理接口 - 基础设施层
//!
//! 引擎只通过这个接口操作页面，不关心背后是真实浏览器还是测试替身

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// 元素选择器（XPath 表达式）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector(String);

impl Selector {
    pub fn xpath(expr: impl Into<String>) -> Self {
        Selector(expr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xpath={}", self.0)
    }
}

/// UI 自动化代理
///
/// 每个操作都是独立的异步操作；同一时间只允许一个调用方持有代理
#[async_trait]
pub trait UiAgent: Send + Sync {
    type Element: Send + Sync;

    /// 查找元素，不存在时返回 `Ok(None)`
    async fn find_element(&self, selector: &Selector) -> Result<Option<Self::Element>>;

    /// 元素是否可见且可交互
    async fn is_interactable(&self, element: &Self::Element) -> bool;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// 清空输入框
    async fn clear(&self, element: &Self::Element) -> Result<()>;

    async fn type_text(&self, element: &Self::Element, text: &str) -> Result<()>;

    /// 提交（在输入框中按回车）
    async fn submit(&self, element: &Self::Element) -> Result<()>;

    /// 浏览器后退
    async fn go_back(&self) -> Result<()>;

    /// 等待页面进入稳定状态
    async fn wait_stable(&self, timeout: Duration) -> Result<()>;
}
