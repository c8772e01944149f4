//! 单个文件的下载流程 - 流程层
//!
//! 流程顺序：
//! 1. 定位搜索框 → 清空 → 输入文件名 → 回车
//! 2. 定位结果链接 → 点击
//! 3. 定位下载按钮 → 点击
//! 4. 回到文件列表（无论前面是否失败都会执行）

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::infrastructure::UiAgent;
use crate::models::{Outcome, Target};
use crate::services::{LocatorResolver, LocatorTable, Role};
use crate::utils::logging::truncate_text;
use crate::workflow::target_ctx::TargetCtx;

/// 流程步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Search,
    OpenResult,
    Download,
    ReturnToList,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Search => "Search",
            Step::OpenResult => "OpenResult",
            Step::Download => "Download",
            Step::ReturnToList => "ReturnToList",
        };
        f.write_str(name)
    }
}

/// 单个文件的下载流程
///
/// - 独占 UI 代理，所有操作串行执行
/// - 单个文件的任何失败都转换为 `Outcome::Failed`，不会向上抛出
pub struct DownloadFlow<A: UiAgent> {
    agent: A,
    resolver: LocatorResolver,
    step_timeout: Duration,
    settle_delay: Duration,
}

impl<A: UiAgent> DownloadFlow<A> {
    pub fn new(agent: A, config: &Config) -> Self {
        let resolver = LocatorResolver::new(
            LocatorTable::default(),
            config.timeouts.clone(),
            config.poll_interval(),
        );
        Self::with_resolver(agent, resolver, config.step_timeout(), config.settle_delay())
    }

    pub fn with_resolver(
        agent: A,
        resolver: LocatorResolver,
        step_timeout: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            agent,
            resolver,
            step_timeout,
            settle_delay,
        }
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// 处理一个文件
    pub async fn run(&self, ctx: &TargetCtx) -> Outcome {
        let started = Instant::now();
        if ctx.is_highlight() {
            info!("{} 📥 {}", ctx, truncate_text(ctx.target.as_str(), 60));
        } else {
            debug!("{} 📥 {}", ctx, ctx.target);
        }

        let mut left_list = false;
        let result = self.acquire(&ctx.target, &mut left_list).await;
        self.return_to_list(ctx, left_list).await;

        let elapsed = started.elapsed().as_secs_f64();
        match result {
            Ok(()) => {
                if ctx.is_highlight() {
                    info!("{} ✅ 已触发下载 ({:.1}s)", ctx, elapsed);
                } else {
                    debug!("{} ✅ 已触发下载 ({:.1}s)", ctx, elapsed);
                }
                Outcome::Succeeded
            }
            Err(reason) => {
                warn!("{} ❌ {} ({:.1}s)", ctx, reason, elapsed);
                Outcome::Failed(reason)
            }
        }
    }

    /// 步骤 1-3；`left_list` 记录是否已经离开文件列表页面
    async fn acquire(&self, target: &Target, left_list: &mut bool) -> Result<(), String> {
        // 1. 搜索
        let deadline = Instant::now() + self.step_timeout;
        bounded(Step::Search, deadline, async {
            let input = self.locate(&Role::SearchInput).await?;
            let fail = |e: anyhow::Error| action_failed(Step::Search, e);
            self.agent.clear(&input).await.map_err(fail)?;
            self.agent.type_text(&input, target.as_str()).await.map_err(fail)?;
            self.agent.submit(&input).await.map_err(fail)?;
            self.settle().await;
            Ok(())
        })
        .await?;

        // 2. 打开结果
        let deadline = Instant::now() + self.step_timeout;
        let link = bounded(
            Step::OpenResult,
            deadline,
            self.locate(&Role::ResultLink(target.to_string())),
        )
        .await?;
        bounded(Step::OpenResult, deadline, async {
            self.agent
                .click(&link)
                .await
                .map_err(|e| action_failed(Step::OpenResult, e))?;
            // 点击成功才算离开列表页
            *left_list = true;
            self.settle().await;
            Ok(())
        })
        .await?;

        // 3. 触发下载
        let deadline = Instant::now() + self.step_timeout;
        bounded(Step::Download, deadline, async {
            let trigger = self.locate(&Role::DownloadTrigger).await?;
            self.agent
                .click(&trigger)
                .await
                .map_err(|e| action_failed(Step::Download, e))?;
            Ok(())
        })
        .await?;

        Ok(())
    }

    /// 4. 回到文件列表，保证下一个文件从已知状态开始
    ///
    /// 只有离开过列表页面才需要后退；失败只记录日志，不影响结果
    async fn return_to_list(&self, ctx: &TargetCtx, left_list: bool) {
        if left_list {
            sleep(self.settle_delay / 3).await;
            match timeout(self.step_timeout, self.agent.go_back()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("{} ⚠️ 返回列表失败: {}", ctx, e),
                Err(_) => warn!("{} ⚠️ {} timed out", ctx, Step::ReturnToList),
            }
        }
        if let Err(e) = self.agent.wait_stable(self.step_timeout).await {
            warn!("{} ⚠️ 页面未稳定: {}", ctx, e);
        }
    }

    async fn locate(&self, role: &Role) -> Result<A::Element, String> {
        self.resolver
            .resolve(&self.agent, role)
            .await
            .map(|located| located.element)
            .map_err(|e| e.to_string())
    }

    /// 动作之后等待页面稳定
    async fn settle(&self) {
        sleep(self.settle_delay).await;
        if let Err(e) = self.agent.wait_stable(self.step_timeout).await {
            debug!("等待页面稳定失败: {}", e);
        }
    }
}

/// 在截止时间内执行一个步骤
async fn bounded<T, F>(step: Step, deadline: Instant, fut: F) -> Result<T, String>
where
    F: Future<Output = Result<T, String>>,
{
    match timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(format!("{} timed out", step)),
    }
}

fn action_failed(step: Step, error: anyhow::Error) -> String {
    format!("{} failed: {}", step, error)
}
