//! # 斗地主核心逻辑库
//!
//! 这个 `core` crate 包含了三人斗地主房间的全部状态管理、
//! 牌型识别、大小比较以及客户端-服务器通信消息的定义。
//! 它不做任何 I/O：房间的每次状态转换都返回待投递的消息，
//! 由上层（网络服务器、测试）负责发送。

mod card;
mod combo;
mod error;
mod logic;
mod message;
mod state;

pub use card::*;

pub use combo::*;

pub use error::*;

pub use message::*;

pub use state::*;
