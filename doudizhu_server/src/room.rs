use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use doudizhu_core::{GameError, Outbound, PlayerAction, PlayerId, Room, RoomId, ServerMessage};

/// 每个房间排队等待处理的指令上限
const COMMAND_QUEUE: usize = 64;

/// 用于向某个连接的 WebSocket 任务发送消息的通道
pub type ClientSender = mpsc::Sender<ServerMessage>;

pub(crate) type Registry = Arc<DashMap<RoomId, RoomHandle>>;

/// 发给房间任务的指令
pub enum RoomCommand {
    Join {
        name: Option<String>,
        sender: ClientSender,
        reply: oneshot::Sender<Result<PlayerId, GameError>>,
    },
    Act {
        player_id: PlayerId,
        action: PlayerAction,
    },
    Leave {
        player_id: PlayerId,
    },
}

/// 房间任务的句柄，可以随意克隆
#[derive(Clone)]
pub struct RoomHandle {
    // 同一个房间ID被回收再创建后，用代数区分新旧任务
    generation: u64,
    commands: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) async fn send(&self, command: RoomCommand) -> Result<(), RoomCommand> {
        self.commands.send(command).await.map_err(|e| e.0)
    }

    pub async fn act(&self, player_id: PlayerId, action: PlayerAction) {
        if self.send(RoomCommand::Act { player_id, action }).await.is_err() {
            debug!("房间已关闭，丢弃玩家 {} 的动作", player_id);
        }
    }

    pub async fn leave(&self, player_id: PlayerId) {
        if self.send(RoomCommand::Leave { player_id }).await.is_err() {
            debug!("房间已关闭，玩家 {} 无需离开", player_id);
        }
    }
}

/// 启动一个新的房间任务
///
/// 房间内的所有指令由这一个任务按顺序处理，一条指令的全部效果
/// （校验、修改、广播、私信）完成后才会处理下一条。
pub(crate) fn spawn(room_id: RoomId, generation: u64, registry: Registry) -> RoomHandle {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
    let actor = RoomActor {
        room_id,
        generation,
        room: Room::new(),
        connections: HashMap::new(),
        registry,
    };
    tokio::spawn(actor.run(rx));
    RoomHandle { generation, commands: tx }
}

struct RoomActor {
    room_id: RoomId,
    generation: u64,
    room: Room,
    // 将 PlayerId 映射到具体的网络连接
    connections: HashMap<PlayerId, ClientSender>,
    registry: Registry,
}

impl RoomActor {
    async fn run(mut self, mut commands: mpsc::Receiver<RoomCommand>) {
        info!("房间 {} 已创建", self.room_id);

        while let Some(command) = commands.recv().await {
            self.handle(command);
            if self.room.is_empty() {
                break;
            }
        }

        // 名单已空：先从注册表摘除自己，再拒绝仍在排队的入座请求，
        // 让调用方去新建的房间重试
        let generation = self.generation;
        self.registry
            .remove_if(&self.room_id, |_, handle| handle.generation() == generation);
        commands.close();
        while let Some(command) = commands.recv().await {
            if let RoomCommand::Join { reply, .. } = command {
                let _ = reply.send(Err(GameError::RoomClosed));
            }
        }
        info!("房间 {} 已空，已被移除", self.room_id);
    }

    fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join { name, sender, reply } => match self.room.join(name.as_deref()) {
                Ok((player_id, outbound)) => {
                    self.connections.insert(player_id, sender);
                    if reply.send(Ok(player_id)).is_err() {
                        // 会话在等待期间已经结束
                        self.connections.remove(&player_id);
                        let outbound = self.room.leave(player_id);
                        self.deliver(outbound);
                        return;
                    }
                    info!("玩家 {} 加入了房间 {} ({}/3)", player_id, self.room_id, self.room.len());
                    self.deliver(outbound);
                }
                Err(e) => {
                    info!("拒绝加入房间 {}: {}", self.room_id, e);
                    let _ = reply.send(Err(e));
                }
            },
            RoomCommand::Act { player_id, action } => match self.room.apply(player_id, action) {
                Ok(outbound) => self.deliver(outbound),
                Err(e) => self.reject(player_id, e),
            },
            RoomCommand::Leave { player_id } => {
                info!("玩家 {} 从房间 {} 断开连接", player_id, self.room_id);
                self.connections.remove(&player_id);
                let outbound = self.room.leave(player_id);
                self.deliver(outbound);
            }
        }
    }

    fn reject(&self, player_id: PlayerId, error: GameError) {
        if !error.is_reported() {
            debug!("忽略玩家 {} 的无效指令: {:?}", player_id, error);
            return;
        }
        debug!("玩家 {} 的动作被拒绝: {}", player_id, error);
        if let Some(conn) = self.connections.get(&player_id) {
            push(&player_id, conn, ServerMessage::Error { message: error.to_string() });
        }
    }

    /// 投递一次状态转换产生的全部消息
    fn deliver(&self, outbound: Vec<Outbound>) {
        for item in outbound {
            match item.message() {
                ServerMessage::Deal => info!("房间 {} 开始新的一局", self.room_id),
                ServerMessage::Win { payload } => info!(
                    "房间 {} 本局结束，{} 获胜，倍数 {}",
                    self.room_id, payload.name, payload.multiplier
                ),
                ServerMessage::Info { message } => info!("房间 {}: {}", self.room_id, message),
                _ => {}
            }

            match item {
                Outbound::Broadcast(msg) => {
                    for (player_id, conn) in &self.connections {
                        push(player_id, conn, msg.clone());
                    }
                }
                Outbound::Direct(player_id, msg) => {
                    if let Some(conn) = self.connections.get(&player_id) {
                        push(&player_id, conn, msg);
                    }
                }
            }
        }
    }
}

/// 尽力投递，从不等待慢速或已断开的连接
fn push(player_id: &PlayerId, conn: &ClientSender, msg: ServerMessage) {
    match conn.try_send(msg) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!("玩家 {} 的发送队列已满，丢弃一条消息", player_id);
        }
        Err(TrySendError::Closed(_)) => {
            // 该玩家也断开了，后续由其自己的会话任务处理
            debug!("向玩家 {} 发送消息失败（可能已断开）", player_id);
        }
    }
}
