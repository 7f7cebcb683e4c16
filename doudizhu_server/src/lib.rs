//! 斗地主房间服务器：配置、房间注册表、房间任务和 WebSocket 会话。

use std::future::Future;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;

pub mod lobby;
pub mod room;
pub mod session;
pub mod settings;

use lobby::Lobby;
use settings::RoomSettings;

/// 服务器全局状态
pub struct AppState {
    pub lobby: Lobby,
    pub room: RoomSettings,
}

impl AppState {
    pub fn new(room: RoomSettings) -> Self {
        AppState {
            lobby: Lobby::new(),
            room,
        }
    }
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/ws", get(session::websocket_handler))
        .with_state(state)
}

/// 在给定的监听器上运行服务器，`shutdown` 完成后优雅退出
pub async fn serve<F>(listener: TcpListener, state: SharedState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown)
        .await?;
    state.lobby.shutdown();
    Ok(())
}
