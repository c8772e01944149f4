use crate::error::BrowserError;
use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::Path;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 隐藏自动化标记，部分控制台会据此拦截操作
const HIDE_WEBDRIVER_JS: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

/// 启动有界面的浏览器，设置下载目录并打开起始页面
///
/// 使用有界面模式，因为需要人工先导航到文件列表页面
pub async fn launch_browser(start_url: &str, download_dir: &Path) -> Result<(Browser, Page)> {
    info!("🔧 正在启动浏览器...");
    debug!("起始 URL: {}, 下载目录: {}", start_url, download_dir.display());

    std::fs::create_dir_all(download_dir)?;
    let download_path = download_dir.canonicalize()?;

    let config = BrowserConfig::builder()
        .with_head()
        .args(vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
            "--disable-extensions",
            "--no-first-run",
            "--disable-background-timer-throttling",
            "--disable-renderer-backgrounding",
            "--disable-backgrounding-occluded-windows",
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            BrowserError::LaunchFailed(e)
        })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        BrowserError::LaunchFailed(e.to_string())
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let download_behavior = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(download_path.to_string_lossy().to_string())
        .build()
        .map_err(|reason| BrowserError::DownloadSetupFailed {
            path: download_path.clone(),
            reason,
        })?;
    browser
        .execute(download_behavior)
        .await
        .map_err(|e| BrowserError::DownloadSetupFailed {
            path: download_path.clone(),
            reason: e.to_string(),
        })?;
    info!("📁 下载目录: {}", download_path.display());

    let page = browser
        .new_page("about:blank")
        .await
        .map_err(BrowserError::PageCreationFailed)?;
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(HIDE_WEBDRIVER_JS))
        .await
        .map_err(BrowserError::PageCreationFailed)?;
    page.goto(start_url)
        .await
        .map_err(|source| BrowserError::NavigationFailed {
            url: start_url.to_string(),
            source,
        })?;

    info!("✅ 浏览器已打开: {}", start_url);
    Ok((browser, page))
}
