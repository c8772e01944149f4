use console_batch_downloader::browser::{connect_to_browser_and_page, launch_browser};
use console_batch_downloader::config::Config;
use console_batch_downloader::models::load_targets;
use console_batch_downloader::{ChromeAgent, LocatorResolver, LocatorTable, Role, UiAgent};
use std::path::Path;
use std::time::Duration;

fn debug_port(config: &Config) -> u16 {
    config.browser_debug_port.unwrap_or(9222)
}

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    let _ = tracing_subscriber::fmt::try_init();

    // 加载配置
    let config = Config::from_env();

    // 测试浏览器连接
    let result = connect_to_browser_and_page(debug_port(&config), None, None).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}

#[tokio::test]
#[ignore]
async fn test_launch_browser_and_wait_stable() {
    let _ = tracing_subscriber::fmt::try_init();

    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let (_browser, page) = launch_browser("about:blank", dir.path())
        .await
        .expect("启动浏览器失败");

    let agent = ChromeAgent::new(page);
    agent
        .wait_stable(Duration::from_secs(10))
        .await
        .expect("页面应该能够稳定");
}

#[tokio::test]
#[ignore]
async fn test_locate_search_input_on_open_console() {
    let _ = tracing_subscriber::fmt::try_init();

    // 需要先手动打开控制台的文件列表页面
    let config = Config::from_env();
    let (_browser, page) = connect_to_browser_and_page(debug_port(&config), None, None)
        .await
        .expect("连接浏览器失败");

    let agent = ChromeAgent::new(page);
    let resolver = LocatorResolver::new(
        LocatorTable::default(),
        config.timeouts.clone(),
        config.poll_interval(),
    );
    let located = resolver
        .resolve(&agent, &Role::SearchInput)
        .await
        .expect("应该能找到搜索框");
    println!("搜索框通过策略 {} 定位", located.strategy_index + 1);
}

#[tokio::test]
#[ignore]
async fn test_load_targets_from_configured_source() {
    let config = Config::from_env();

    let targets = load_targets(Path::new(&config.target_source_file), &config.target_column).await;

    println!("找到 {} 个文件", targets.len());
    assert!(!targets.is_empty(), "目标列表不应为空");
}
