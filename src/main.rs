use anyhow::Result;
use score_report_export::utils::logging;
use score_report_export::{App, Config};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置：指定了 CONFIG_PATH 时读取文件，否则读取环境变量
    let config = match std::env::var("CONFIG_PATH") {
        Ok(path) => Config::from_toml_file(Path::new(&path))?,
        Err(_) => Config::from_env(),
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let _outcome = App::initialize(config).await?.run().await?;

    Ok(())
}
