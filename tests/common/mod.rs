#![allow(dead_code)]

//! 测试用的内存 UI 代理和操作员
//!
//! 模拟一个文件控制台：列表页有搜索框，搜索后出现对应文件的链接，
//! 点击链接进入详情页，详情页有下载按钮。

use anyhow::Result;
use async_trait::async_trait;
use console_batch_downloader::models::{Batch, BatchPlan};
use console_batch_downloader::orchestrator::{AbortSignal, BatchDecision, Operator};
use console_batch_downloader::services::locator::xpath_literal;
use console_batch_downloader::{
    dedup_targets, DownloadFlow, LocatorResolver, LocatorTable, Selector, Target, UiAgent,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakePage {
    List,
    Detail(String),
    /// 从列表页继续后退后到达的未知页面
    Outside,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeElement {
    SearchBox,
    Link(String),
    DownloadButton,
}

#[derive(Default)]
struct FakeState {
    page: Option<FakePage>,
    catalog: HashSet<String>,
    /// 只能通过表格行策略找到的文件
    row_only: HashSet<String>,
    /// 详情页没有下载按钮的文件
    no_download: HashSet<String>,
    /// 点击链接时报错且不跳转的文件
    broken_link: HashSet<String>,
    hang_search: bool,
    typed: String,
    searched: Option<String>,
    calls: Vec<String>,
    downloads: Vec<String>,
    abort_after: Option<(usize, AbortSignal)>,
}

/// 可克隆的内存代理，克隆共享同一个页面状态
#[derive(Clone, Default)]
pub struct FakeAgent {
    state: Arc<Mutex<FakeState>>,
}

impl FakeAgent {
    pub fn with_catalog<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let agent = Self::default();
        {
            let mut state = agent.state.lock().unwrap();
            state.page = Some(FakePage::List);
            state.catalog = names.into_iter().map(Into::into).collect();
        }
        agent
    }

    pub fn row_only(self, name: &str) -> Self {
        self.state.lock().unwrap().row_only.insert(name.to_string());
        self
    }

    pub fn without_download(self, name: &str) -> Self {
        self.state.lock().unwrap().no_download.insert(name.to_string());
        self
    }

    pub fn broken_link(self, name: &str) -> Self {
        self.state.lock().unwrap().broken_link.insert(name.to_string());
        self
    }

    pub fn hanging_search(self) -> Self {
        self.state.lock().unwrap().hang_search = true;
        self
    }

    /// 第 `count` 次下载后触发中断信号
    pub fn abort_after(self, count: usize, signal: AbortSignal) -> Self {
        self.state.lock().unwrap().abort_after = Some((count, signal));
        self
    }

    pub fn page(&self) -> FakePage {
        self.state.lock().unwrap().page.clone().unwrap_or(FakePage::List)
    }

    pub fn downloads(&self) -> Vec<String> {
        self.state.lock().unwrap().downloads.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    /// 提交过的搜索词
    pub fn searches(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| c.strip_prefix("submit:").map(str::to_string))
            .collect()
    }

    fn locate(state: &FakeState, selector: &str) -> Option<FakeElement> {
        let page = state.page.clone().unwrap_or(FakePage::List);

        if selector.contains("//input") {
            return (page == FakePage::List).then_some(FakeElement::SearchBox);
        }

        if selector.contains("Descargar") {
            return match page {
                FakePage::Detail(name) if !state.no_download.contains(&name) => {
                    Some(FakeElement::DownloadButton)
                }
                _ => None,
            };
        }

        if page != FakePage::List {
            return None;
        }
        let searched = state.searched.as_ref()?;
        if !state.catalog.contains(searched) || !selector.contains(&xpath_literal(searched)) {
            return None;
        }
        if state.row_only.contains(searched) && !selector.contains("ancestor::tr") {
            return None;
        }
        Some(FakeElement::Link(searched.clone()))
    }
}

#[async_trait]
impl UiAgent for FakeAgent {
    type Element = FakeElement;

    async fn find_element(&self, selector: &Selector) -> Result<Option<FakeElement>> {
        let hang = {
            let state = self.state.lock().unwrap();
            state.hang_search && selector.as_str().contains("//input")
        };
        if hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let state = self.state.lock().unwrap();
        Ok(Self::locate(&state, selector.as_str()))
    }

    async fn is_interactable(&self, _element: &FakeElement) -> bool {
        true
    }

    async fn click(&self, element: &FakeElement) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match element {
            FakeElement::SearchBox => state.calls.push("click:search".into()),
            FakeElement::Link(name) => {
                state.calls.push(format!("click:link:{}", name));
                if state.broken_link.contains(name) {
                    anyhow::bail!("element is not clickable");
                }
                state.page = Some(FakePage::Detail(name.clone()));
            }
            FakeElement::DownloadButton => {
                if let Some(FakePage::Detail(name)) = state.page.clone() {
                    state.calls.push(format!("download:{}", name));
                    state.downloads.push(name);
                }
                let count = state.downloads.len();
                if let Some((after, signal)) = &state.abort_after {
                    if count >= *after {
                        signal.trigger();
                    }
                }
            }
        }
        Ok(())
    }

    async fn clear(&self, _element: &FakeElement) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.typed.clear();
        state.calls.push("clear".into());
        Ok(())
    }

    async fn type_text(&self, _element: &FakeElement, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.typed.push_str(text);
        Ok(())
    }

    async fn submit(&self, _element: &FakeElement) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let typed = state.typed.clone();
        state.calls.push(format!("submit:{}", typed));
        state.searched = Some(typed);
        Ok(())
    }

    async fn go_back(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("go_back".into());
        state.page = Some(match state.page.clone().unwrap_or(FakePage::List) {
            FakePage::Detail(_) => FakePage::List,
            _ => FakePage::Outside,
        });
        Ok(())
    }

    async fn wait_stable(&self, _timeout: Duration) -> Result<()> {
        self.state.lock().unwrap().calls.push("wait_stable".into());
        Ok(())
    }
}

/// 每个策略只等待 `per_strategy` 的下载流程
pub fn flow_with(
    agent: FakeAgent,
    per_strategy: Duration,
    step_timeout: Duration,
) -> DownloadFlow<FakeAgent> {
    let resolver = LocatorResolver::uniform(
        LocatorTable::default(),
        per_strategy,
        Duration::from_millis(10),
    );
    DownloadFlow::with_resolver(agent, resolver, step_timeout, Duration::ZERO)
}

pub fn fast_flow(agent: FakeAgent) -> DownloadFlow<FakeAgent> {
    flow_with(agent, Duration::from_millis(50), Duration::from_secs(5))
}

pub fn targets(names: &[&str]) -> Vec<Target> {
    dedup_targets(names.iter().copied())
}

/// 按脚本返回批次间决策的操作员，脚本用完后总是继续
#[derive(Default)]
pub struct ScriptedOperator {
    decisions: Mutex<VecDeque<BatchDecision>>,
    pub ready_calls: Arc<AtomicUsize>,
    pub decision_calls: Arc<AtomicUsize>,
}

impl ScriptedOperator {
    pub fn new(decisions: impl IntoIterator<Item = BatchDecision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into_iter().collect()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn confirm_ready(&self, _plan: &BatchPlan) -> Result<()> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn between_batches(
        &self,
        _next: &Batch,
        _total_batches: usize,
    ) -> Result<BatchDecision> {
        self.decision_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(BatchDecision::Continue))
    }
}
