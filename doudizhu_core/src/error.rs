use crate::combo::ClassifyError;
use thiserror::Error;

/// 错误的大类，决定服务器如何回应发起者
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 密钥错误或房间已满：私信错误后断开连接
    Auth,
    /// 消息格式错误、牌标识无法对应：静默忽略
    Protocol,
    /// 违反规则：私信错误
    RuleViolation,
    /// 尚未加入就发指令：忽略
    State,
}

/// 游戏逻辑中所有可能的失败
///
/// `Display` 文本直接作为发给玩家的错误消息。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("密钥错误")]
    BadKey,
    #[error("房间已满")]
    RoomFull,
    #[error("房间已关闭")]
    RoomClosed,
    #[error("玩家不在房间内")]
    UnknownPlayer,
    #[error("牌局尚未开始")]
    NotStarted,
    #[error("牌局进行中")]
    HandInProgress,
    #[error("还没轮到你")]
    NotYourTurn,
    #[error("所选的牌不在手中")]
    UnknownCards,
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("没压住上一手")]
    CannotBeat,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::BadKey | GameError::RoomFull | GameError::RoomClosed => ErrorKind::Auth,
            GameError::UnknownCards => ErrorKind::Protocol,
            GameError::UnknownPlayer => ErrorKind::State,
            GameError::NotStarted
            | GameError::HandInProgress
            | GameError::NotYourTurn
            | GameError::Classify(_)
            | GameError::CannotBeat => ErrorKind::RuleViolation,
        }
    }

    /// 是否需要私信告知发起者
    pub fn is_reported(&self) -> bool {
        matches!(self.kind(), ErrorKind::Auth | ErrorKind::RuleViolation)
    }
}
