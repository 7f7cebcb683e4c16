use crate::card::{Card, CardId};
use crate::state::{PlayerAction, PlayerId, StateSnapshot};
use serde::{Deserialize, Serialize};

// --- 客户端 -> 服务器 的消息 ---
// 所有消息都是 JSON 文本帧，用 "type" 字段区分。

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// 携带房间密钥请求入座
    Join {
        key: String,
        #[serde(default)]
        name: Option<String>,
    },
    Rename { name: String },
    /// 切换准备状态
    Ready,
    /// 打出手中的若干张牌
    Play {
        #[serde(alias = "cardIds", default)]
        cards: Vec<CardId>,
    },
    Pass,
}

impl ClientMessage {
    /// 入座后的指令转换为房间动作；`Join` 没有对应动作
    pub fn into_action(self) -> Option<PlayerAction> {
        match self {
            ClientMessage::Join { .. } => None,
            ClientMessage::Rename { name } => Some(PlayerAction::Rename(name)),
            ClientMessage::Ready => Some(PlayerAction::ToggleReady),
            ClientMessage::Play { cards } => Some(PlayerAction::Play(cards)),
            ClientMessage::Pass => Some(PlayerAction::Pass),
        }
    }
}

// --- 服务器 -> 客户端 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// 连接建立后立即发送，提示客户端提供密钥
    NeedJoin { message: String },
    /// 入座成功，私密地发给该玩家
    Welcome {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        name: String,
    },
    /// 房间状态快照
    State { payload: StateSnapshot },
    /// 新的一局已发牌
    Deal,
    /// 玩家自己的手牌
    Hand { payload: Vec<Card> },
    /// 有人打完了手牌
    Win { payload: WinInfo },
    Info { message: String },
    Error { message: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WinInfo {
    pub player_id: PlayerId,
    pub name: String,
    pub multiplier: u32,
}

/// 一次状态转换产生的待投递消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// 发给房间内所有人
    Broadcast(ServerMessage),
    /// 只发给某一位玩家
    Direct(PlayerId, ServerMessage),
}

impl Outbound {
    pub fn message(&self) -> &ServerMessage {
        match self {
            Outbound::Broadcast(msg) | Outbound::Direct(_, msg) => msg,
        }
    }
}
