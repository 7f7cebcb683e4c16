use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

// --- 核心数据结构定义 ---

/// 牌的唯一标识，例如 `10♥`、`SJ`
pub type CardId = String;

/// 每位玩家发到的牌数
pub const HAND_SIZE: usize = 17;
/// 每局实际发出的牌数，洗好的牌最后 3 张不发
pub const DEALT_CARDS: usize = HAND_SIZE * 3;

/// 花色 (Suit)，大小王没有花色
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "♠")]
    Spade,
    #[serde(rename = "♥")]
    Heart,
    #[serde(rename = "♣")]
    Club,
    #[serde(rename = "♦")]
    Diamond,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spade, Suit::Heart, Suit::Club, Suit::Diamond];
}

/// 点数 (Rank)
/// 斗地主的大小顺序：3 < 4 < ... < K < A < 2 < 小王 < 大王
/// 变体按从小到大声明，派生的 Ord 就是牌面大小
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "SJ")]
    SmallJoker,
    #[serde(rename = "BJ")]
    BigJoker,
}

impl Rank {
    /// 带花色的 13 种点数
    pub const ORDINARY: [Rank; 13] = [
        Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven, Rank::Eight, Rank::Nine,
        Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace, Rank::Two,
    ];

    pub fn is_joker(self) -> bool {
        matches!(self, Rank::SmallJoker | Rank::BigJoker)
    }

    /// 在总顺序中的位置，用于判断是否连续
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// 单张牌 (Card)
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Option<Suit>,
    pub id: CardId,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit: Some(suit), id: format!("{}{}", rank, suit) }
    }

    pub fn joker(rank: Rank) -> Card {
        debug_assert!(rank.is_joker());
        Card { rank, suit: None, id: rank.to_string() }
    }
}

// --- 实现辅助功能 ---

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Suit::Spade => "♠",
            Suit::Heart => "♥",
            Suit::Club => "♣",
            Suit::Diamond => "♦",
        })
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::SmallJoker => "SJ",
            Rank::BigJoker => "BJ",
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

// --- 牌组生成与发牌 ---

/// 创建一副完整的 54 张牌：13 种点数 × 4 种花色，外加大小王
pub fn create_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(54);
    for &rank in &Rank::ORDINARY {
        for &suit in &Suit::ALL {
            deck.push(Card::new(rank, suit));
        }
    }
    deck.push(Card::joker(Rank::SmallJoker));
    deck.push(Card::joker(Rank::BigJoker));
    deck
}

/// 均匀随机洗牌
pub fn shuffle<R: Rng + ?Sized>(deck: &mut [Card], rng: &mut R) {
    deck.shuffle(rng);
}

/// 手牌按点数从小到大排序（稳定排序，同点数保持原顺序）
pub fn sort_hand(hand: &mut [Card]) {
    hand.sort_by_key(|card| card.rank);
}

/// 洗一副新牌并发给三位玩家
///
/// 只按下标轮流发前 51 张，每人 17 张；最后 3 张本局弃用，不组成底牌。
pub fn deal_hands<R: Rng + ?Sized>(rng: &mut R) -> [Vec<Card>; 3] {
    let mut deck = create_deck();
    shuffle(&mut deck, rng);

    let mut hands: [Vec<Card>; 3] = Default::default();
    for (index, card) in deck.into_iter().take(DEALT_CARDS).enumerate() {
        hands[index % 3].push(card);
    }
    for hand in hands.iter_mut() {
        sort_hand(hand);
    }
    hands
}

// --- 单元测试 ---
