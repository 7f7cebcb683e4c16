use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;

use doudizhu_core::{GameError, PlayerId};

use crate::room::{self, ClientSender, Registry, RoomCommand, RoomHandle};

/// 房间任务可能恰好在入座请求途中关闭，最多重试的次数
const JOIN_ATTEMPTS: usize = 3;

/// 房间注册表：房间ID到房间任务的映射
///
/// 房间在第一位玩家入座时创建，名单清空后由房间任务自行摘除。
pub struct Lobby {
    rooms: Registry,
    generations: AtomicU64,
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new()
    }
}

impl Lobby {
    pub fn new() -> Self {
        Lobby {
            rooms: Arc::new(DashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// 入座指定房间，房间不存在时新建
    ///
    /// 成功后返回房间句柄和分配的玩家ID；之后该连接会通过 `sender`
    /// 收到欢迎消息和房间广播。
    pub async fn join(
        &self,
        room_id: &str,
        name: Option<String>,
        sender: ClientSender,
    ) -> Result<(RoomHandle, PlayerId), GameError> {
        for _ in 0..JOIN_ATTEMPTS {
            let handle = self
                .rooms
                .entry(room_id.to_string())
                .or_insert_with(|| self.spawn_room(room_id))
                .clone();

            let (reply_tx, reply_rx) = oneshot::channel();
            let command = RoomCommand::Join {
                name: name.clone(),
                sender: sender.clone(),
                reply: reply_tx,
            };
            if handle.send(command).await.is_err() {
                self.evict(room_id, &handle);
                continue;
            }

            match reply_rx.await {
                Ok(Err(GameError::RoomClosed)) | Err(_) => {
                    debug!("房间 {} 正在关闭，重试入座", room_id);
                    self.evict(room_id, &handle);
                }
                Ok(result) => return result.map(|player_id| (handle, player_id)),
            }
        }
        Err(GameError::RoomClosed)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// 清空注册表；房间任务在所有会话断开后自然结束
    pub fn shutdown(&self) {
        self.rooms.clear();
    }

    fn spawn_room(&self, room_id: &str) -> RoomHandle {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        room::spawn(room_id.to_string(), generation, self.rooms.clone())
    }

    fn evict(&self, room_id: &str, handle: &RoomHandle) {
        let generation = handle.generation();
        self.rooms
            .remove_if(room_id, |_, h| h.generation() == generation);
    }
}
