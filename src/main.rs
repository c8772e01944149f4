use anyhow::Result;
use console_batch_downloader::utils::logging;
use console_batch_downloader::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(&config)?;

    // 初始化并运行应用
    let _report = App::initialize(config).await?.run().await?;

    Ok(())
}
