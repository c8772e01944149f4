//! Chrome 自动化代理 - 基础设施层
//!
//! 持有唯一的 Page 资源，向上只暴露 `UiAgent` 能力

use crate::infrastructure::ui_agent::{Selector, UiAgent};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Element, Page};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

const INTERACTABLE_JS: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden'
        && style.display !== 'none'
        && !this.disabled;
}"#;

const CLEAR_JS: &str = r#"function() {
    this.value = '';
    this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

const STABLE_POLL: Duration = Duration::from_millis(100);

/// Chrome 自动化代理
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 实现元素查找、点击、输入、后退
/// - 不认识目标文件 / 批次
pub struct ChromeAgent {
    page: Page,
}

impl ChromeAgent {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }
}

#[async_trait]
impl UiAgent for ChromeAgent {
    type Element = Element;

    async fn find_element(&self, selector: &Selector) -> Result<Option<Element>> {
        match self.page.find_xpath(selector.as_str()).await {
            Ok(element) => Ok(Some(element)),
            Err(CdpError::NotFound) => Ok(None),
            Err(e) => Err(anyhow!("查找元素 {} 失败: {}", selector, e)),
        }
    }

    async fn is_interactable(&self, element: &Element) -> bool {
        match element.call_js_fn(INTERACTABLE_JS, false).await {
            Ok(returns) => returns
                .result
                .value
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            Err(e) => {
                debug!("检查元素可交互性失败: {}", e);
                false
            }
        }
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element.click().await?;
        Ok(())
    }

    async fn clear(&self, element: &Element) -> Result<()> {
        element.call_js_fn(CLEAR_JS, false).await?;
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<()> {
        element.focus().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn submit(&self, element: &Element) -> Result<()> {
        element.press_key("Enter").await?;
        Ok(())
    }

    async fn go_back(&self) -> Result<()> {
        self.page.evaluate("window.history.back()").await?;
        Ok(())
    }

    async fn wait_stable(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.eval_as::<String>("document.readyState").await {
                Ok(state) if state == "complete" => return Ok(()),
                Ok(state) => debug!("页面状态: {}", state),
                Err(e) => debug!("读取页面状态失败: {}", e),
            }
            if Instant::now() >= deadline {
                return Err(anyhow!("页面在 {:?} 内未进入稳定状态", timeout));
            }
            sleep(STABLE_POLL).await;
        }
    }
}
