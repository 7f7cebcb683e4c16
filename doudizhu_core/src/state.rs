use crate::card::{Card, CardId};
use crate::combo::Combination;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

pub type RoomId = String;
pub type PlayerId = Uuid;

/// 唯一对外开放的房间
pub const MAIN_ROOM: &str = "main";
/// 房间人数上限，也是开局所需人数
pub const ROOM_CAPACITY: usize = 3;
/// 昵称最多保留的字符数
pub const MAX_NAME_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    // 按点数升序
    pub hand: Vec<Card>,
}

/// 最近一次被接受的出牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    #[serde(flatten)]
    pub combination: Combination,
    pub player_id: PlayerId,
    pub cards: Vec<Card>,
}

/// 玩家在自己回合内可以发出的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerAction {
    Rename(String),
    /// 切换准备状态
    ToggleReady,
    Play(Vec<CardId>),
    Pass,
}

/// 单个房间的全部游戏状态
///
/// 房间本身不做任何 I/O，每次状态转换返回需要投递的消息列表，
/// 由调用方在转换完成后统一发送。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    // 按加入顺序排列，出牌顺序也按此轮转
    pub(crate) players: Vec<Player>,
    pub(crate) ready: HashSet<PlayerId>,
    pub(crate) started: bool,
    // 仅在牌局进行中有值，且一定指向名单中的玩家
    pub(crate) turn: Option<PlayerId>,
    pub(crate) last_play: Option<Play>,
    pub(crate) multiplier: u32,
}

/// 广播给所有人的房间快照，不包含任何人的手牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub started: bool,
    pub players: Vec<PlayerSummary>,
    pub turn: Option<PlayerId>,
    pub last_play: Option<Play>,
    pub multiplier: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
    pub card_count: usize,
}

// --- Room 的查询方法 ---

impl Default for Room {
    fn default() -> Self {
        Room {
            players: Vec::new(),
            ready: HashSet::new(),
            started: false,
            turn: None,
            last_play: None,
            multiplier: 1,
        }
    }
}

impl Room {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= ROOM_CAPACITY
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// 当前行动的玩家ID (如果牌局进行中)
    pub fn current_player_id(&self) -> Option<PlayerId> {
        self.turn
    }

    pub fn last_play(&self) -> Option<&Play> {
        self.last_play.as_ref()
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *player_id)
    }

    pub(crate) fn player_index(&self, player_id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == *player_id)
    }

    pub fn hand(&self, player_id: &PlayerId) -> Option<&[Card]> {
        self.player(player_id).map(|p| p.hand.as_slice())
    }

    /// 生成对外广播的快照
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            started: self.started,
            players: self
                .players
                .iter()
                .map(|p| PlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                    ready: self.ready.contains(&p.id),
                    card_count: p.hand.len(),
                })
                .collect(),
            turn: self.turn,
            last_play: self.last_play.clone(),
            multiplier: self.multiplier,
        }
    }
}

/// 截断昵称到最多 8 个字符
pub fn clamp_name(name: &str) -> String {
    name.chars().take(MAX_NAME_CHARS).collect()
}
