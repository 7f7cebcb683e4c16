use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{stream::StreamExt, SinkExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use doudizhu_core::{ClientMessage, GameError, PlayerId, ServerMessage};

use crate::room::RoomHandle;
use crate::SharedState;

/// 每个连接待发送消息的队列上限
const OUTBOUND_QUEUE: usize = 32;

const NEED_JOIN_MESSAGE: &str = "请输入密钥进入房间";

/// 处理 WebSocket 连接请求
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 处理一条指令后，连接是否继续
enum Flow {
    Continue,
    Close,
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();

    // 创建一个 MPSC 通道，用于从房间任务接收要发送的消息
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE);

    // 启动一个新任务，专门负责将 MPSC 通道中的消息发送到 WebSocket。
    // 所有发送端都释放后发出关闭帧。
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("序列化消息失败: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let _ = tx
        .send(ServerMessage::NeedJoin { message: NEED_JOIN_MESSAGE.to_string() })
        .await;

    // 入座成功后填充
    let mut seat: Option<(RoomHandle, PlayerId)> = None;

    // 主循环，处理从客户端接收到的消息
    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let client_msg = match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(client_msg) => client_msg,
            Err(e) => {
                warn!("解析消息失败: {}", e);
                continue;
            }
        };
        if let Flow::Close = handle_client_message(client_msg, &state, &tx, &mut seat).await {
            break;
        }
    }

    // 客户端断开连接，执行清理工作
    if let Some((room, player_id)) = seat {
        room.leave(player_id).await;
    }
    info!("客户端连接关闭");
}

/// 核心消息处理逻辑
async fn handle_client_message(
    msg: ClientMessage,
    state: &SharedState,
    tx: &mpsc::Sender<ServerMessage>,
    seat: &mut Option<(RoomHandle, PlayerId)>,
) -> Flow {
    match msg {
        ClientMessage::Join { key, name } => {
            if seat.is_some() {
                debug!("重复的入座请求，忽略");
                return Flow::Continue;
            }
            if key != state.room.key {
                warn!("密钥错误，拒绝连接");
                reject(tx, GameError::BadKey).await;
                return Flow::Close;
            }
            match state.lobby.join(&state.room.id, name, tx.clone()).await {
                Ok(joined) => {
                    *seat = Some(joined);
                    Flow::Continue
                }
                Err(e) => {
                    reject(tx, e).await;
                    Flow::Close
                }
            }
        }
        // 其他指令需要先入座
        other => {
            let Some((room, player_id)) = seat.as_ref() else {
                debug!("尚未入座，忽略指令 {:?}", other);
                return Flow::Continue;
            };
            if let Some(action) = other.into_action() {
                room.act(*player_id, action).await;
            }
            Flow::Continue
        }
    }
}

async fn reject(tx: &mpsc::Sender<ServerMessage>, error: GameError) {
    let _ = tx.send(ServerMessage::Error { message: error.to_string() }).await;
}
