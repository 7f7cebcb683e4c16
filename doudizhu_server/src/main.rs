use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use doudizhu_server::{serve, settings, AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = settings::load().context("加载配置失败")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter)),
        )
        .init();

    let state = SharedState::new(AppState::new(settings.room.clone()));

    let listener = TcpListener::bind(&settings.server.bind_addr)
        .await
        .with_context(|| format!("无法监听 {}", settings.server.bind_addr))?;
    info!("服务器正在监听 {}", listener.local_addr()?);

    serve(listener, Arc::clone(&state), shutdown_signal()).await?;
    info!("服务器已关闭");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("无法监听中断信号: {}", e);
        std::future::pending::<()>().await;
    }
    info!("收到中断信号，准备关闭");
}
