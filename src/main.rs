use anyhow::Result;
use log::{error, info};

use warp_route::cli::CliApp;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件
    dotenv::dotenv().ok();

    // 初始化日志系统
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = CliApp::build_cli().get_matches();

    info!("启动 warp 路由工具...");
    let app = CliApp::new(&matches)?;

    if let Err(e) = app.run(matches).await {
        error!("执行失败: {}", e);
        return Err(e);
    }

    Ok(())
}
