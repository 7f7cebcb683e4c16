use crate::card::{Card, Rank};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// --- 牌型定义 ---

/// 出牌的牌型
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayKind {
    /// 王炸：大小王，压过一切
    Rocket,
    /// 炸弹：同点数 4 张及以上
    Bomb,
    Single,
    Pair,
    Triple,
    /// 顺子：5 张及以上连续单牌，不含 2 和王
    Straight,
    /// 连炸：2 或 3 组连续的对子
    ChainBomb,
    /// 连对：4 组及以上连续的对子
    PairChain,
}

impl PlayKind {
    /// 炸弹类牌型（普通炸弹和连炸）
    pub fn is_bomb_class(self) -> bool {
        matches!(self, PlayKind::Bomb | PlayKind::ChainBomb)
    }
}

/// 一手牌的分类结果
///
/// `value` 和 `length` 用于比较大小；只有炸弹类牌型和王炸带有 `multiplier`。
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Combination {
    #[serde(rename = "type")]
    pub kind: PlayKind,
    pub value: Rank,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub multiplier: Option<u32>,
}

impl Combination {
    fn plain(kind: PlayKind, value: Rank, length: usize) -> Self {
        Combination { kind, value, length, multiplier: None }
    }

    fn boosted(kind: PlayKind, value: Rank, length: usize, multiplier: u32) -> Self {
        Combination { kind, value, length, multiplier: Some(multiplier) }
    }

    /// 本手牌对房间倍数的贡献，没有倍数的牌型为 1
    pub fn factor(&self) -> u32 {
        self.multiplier.unwrap_or(1)
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ClassifyError {
    #[error("没有选择任何牌")]
    Empty,
    #[error("牌型不支持")]
    Unsupported,
}

impl fmt::Display for PlayKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            PlayKind::Rocket => "王炸",
            PlayKind::Bomb => "炸弹",
            PlayKind::Single => "单张",
            PlayKind::Pair => "对子",
            PlayKind::Triple => "三张",
            PlayKind::Straight => "顺子",
            PlayKind::ChainBomb => "连炸",
            PlayKind::PairChain => "连对",
        })
    }
}

// --- 牌型识别 ---

/// 识别一组牌的牌型
///
/// 规则按优先级依次匹配：王炸、炸弹、单张/对子/三张、顺子、连对家族；
/// 都不匹配时返回 [`ClassifyError::Unsupported`]。
pub fn classify(cards: &[Card]) -> Result<Combination, ClassifyError> {
    let length = cards.len();

    // 统计每个点数出现的次数，BTreeMap 保证点数升序
    let mut counts: BTreeMap<Rank, usize> = BTreeMap::new();
    for card in cards {
        *counts.entry(card.rank).or_insert(0) += 1;
    }
    let ranks: Vec<Rank> = counts.keys().copied().collect();
    let Some(&highest) = ranks.last() else {
        return Err(ClassifyError::Empty);
    };

    // 1. 王炸
    if length == 2 && counts.contains_key(&Rank::SmallJoker) && counts.contains_key(&Rank::BigJoker) {
        return Ok(Combination::boosted(PlayKind::Rocket, Rank::BigJoker, 2, 8));
    }

    // 2. 单一点数：炸弹、单张、对子、三张
    if ranks.len() == 1 {
        return Ok(match length {
            1 => Combination::plain(PlayKind::Single, highest, 1),
            2 => Combination::plain(PlayKind::Pair, highest, 2),
            3 => Combination::plain(PlayKind::Triple, highest, 3),
            _ => Combination::boosted(PlayKind::Bomb, highest, length, 2),
        });
    }

    // 3. 顺子
    if ranks.len() == length
        && length >= 5
        && is_consecutive(&ranks)
        && !ranks.iter().any(|&r| r == Rank::Two || r.is_joker())
    {
        return Ok(Combination::plain(PlayKind::Straight, highest, length));
    }

    // 4. 连对家族：每个点数恰好两张且点数连续
    if counts.values().all(|&c| c == 2) && is_consecutive(&ranks) {
        return Ok(match ranks.len() {
            2 => Combination::boosted(PlayKind::ChainBomb, highest, 4, 4),
            3 => Combination::boosted(PlayKind::ChainBomb, highest, 6, 6),
            _ => Combination::plain(PlayKind::PairChain, highest, length),
        });
    }

    Err(ClassifyError::Unsupported)
}

fn is_consecutive(ranks: &[Rank]) -> bool {
    ranks.windows(2).all(|w| w[1].ordinal() == w[0].ordinal() + 1)
}

// --- 大小比较 ---

/// 判断 `candidate` 能否压过上一手牌
///
/// 没有上一手（本局首出）时任何合法牌型都可以出。
pub fn can_beat(candidate: &Combination, last: Option<&Combination>) -> bool {
    let Some(last) = last else {
        return true;
    };

    if candidate.kind == PlayKind::Rocket {
        return true;
    }
    if last.kind == PlayKind::Rocket {
        return false;
    }

    match (candidate.kind.is_bomb_class(), last.kind.is_bomb_class()) {
        (true, false) => true,
        (false, true) => false,
        (true, true) => {
            if candidate.kind == last.kind {
                candidate.value > last.value && candidate.length >= last.length
            } else {
                // 连炸压普通炸弹，不论点数和张数
                candidate.kind == PlayKind::ChainBomb
            }
        }
        (false, false) => {
            candidate.kind == last.kind
                && candidate.length == last.length
                && candidate.value > last.value
        }
    }
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit::*;
    use crate::card::{Card, Suit};
    use Rank::*;

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn ranks(ranks: &[Rank]) -> Vec<Card> {
        let suits = [Spade, Heart, Club, Diamond];
        ranks.iter().enumerate().map(|(i, &r)| card(r, suits[i % 4])).collect()
    }

    fn combo(kind: PlayKind, value: Rank, length: usize) -> Combination {
        Combination { kind, value, length, multiplier: None }
    }

    fn rocket() -> Combination {
        classify(&[Card::joker(SmallJoker), Card::joker(BigJoker)]).unwrap()
    }

    // --- 牌型识别测试 ---

    #[test]
    fn test_single_for_every_rank() {
        for &rank in &Rank::ORDINARY {
            let result = classify(&[card(rank, Club)]).unwrap();
            assert_eq!(result.kind, PlayKind::Single);
            assert_eq!(result.value, rank);
            assert_eq!(result.length, 1);
            assert_eq!(result.multiplier, None);
        }
        assert_eq!(classify(&[Card::joker(SmallJoker)]).unwrap().kind, PlayKind::Single);
        assert_eq!(classify(&[Card::joker(BigJoker)]).unwrap().kind, PlayKind::Single);
    }

    #[test]
    fn test_rocket_in_any_order() {
        let a = classify(&[Card::joker(SmallJoker), Card::joker(BigJoker)]).unwrap();
        let b = classify(&[Card::joker(BigJoker), Card::joker(SmallJoker)]).unwrap();
        assert_eq!(a.kind, PlayKind::Rocket);
        assert_eq!(a, b);
        assert_eq!(a.multiplier, Some(8));
    }

    #[test]
    fn test_bomb() {
        let result = classify(&ranks(&[Three, Three, Three, Three])).unwrap();
        assert_eq!(result.kind, PlayKind::Bomb);
        assert_eq!(result.value, Three);
        assert_eq!(result.length, 4);
        assert_eq!(result.multiplier, Some(2));
        assert!(can_beat(&result, Some(&combo(PlayKind::Single, Two, 1))));
        assert!(can_beat(&result, Some(&combo(PlayKind::Straight, Ace, 8))));
    }

    #[test]
    fn test_pair_and_triple() {
        let pair = classify(&ranks(&[Nine, Nine])).unwrap();
        assert_eq!(pair, combo(PlayKind::Pair, Nine, 2));
        let triple = classify(&ranks(&[Jack, Jack, Jack])).unwrap();
        assert_eq!(triple, combo(PlayKind::Triple, Jack, 3));
    }

    #[test]
    fn test_straight() {
        let result = classify(&[
            card(Seven, Heart), card(Three, Spade), card(Five, Club), card(Four, Diamond), card(Six, Spade),
        ]).unwrap();
        assert_eq!(result, combo(PlayKind::Straight, Seven, 5));

        let long = classify(&ranks(&[Ten, Jack, Queen, King, Ace])).unwrap();
        assert_eq!(long, combo(PlayKind::Straight, Ace, 5));
    }

    #[test]
    fn test_straight_rejects_two_and_jokers() {
        assert_eq!(classify(&ranks(&[Two, Three, Four, Five, Six])), Err(ClassifyError::Unsupported));
        assert_eq!(classify(&ranks(&[Jack, Queen, King, Ace, Two])), Err(ClassifyError::Unsupported));
        // 不足 5 张
        assert_eq!(classify(&ranks(&[Three, Four, Five, Six])), Err(ClassifyError::Unsupported));
        // 不连续
        assert_eq!(classify(&ranks(&[Three, Four, Five, Six, Eight])), Err(ClassifyError::Unsupported));
    }

    #[test]
    fn test_pair_chain_family() {
        let two = classify(&ranks(&[Five, Five, Six, Six])).unwrap();
        assert_eq!(two.kind, PlayKind::ChainBomb);
        assert_eq!(two.value, Six);
        assert_eq!(two.multiplier, Some(4));

        let three = classify(&ranks(&[Five, Five, Six, Six, Seven, Seven])).unwrap();
        assert_eq!(three.kind, PlayKind::ChainBomb);
        assert_eq!(three.value, Seven);
        assert_eq!(three.length, 6);
        assert_eq!(three.multiplier, Some(6));

        let four = classify(&ranks(&[Five, Five, Six, Six, Seven, Seven, Eight, Eight])).unwrap();
        assert_eq!(four, combo(PlayKind::PairChain, Eight, 8));

        // 不连续的对子
        assert_eq!(classify(&ranks(&[Five, Five, Seven, Seven])), Err(ClassifyError::Unsupported));
    }

    #[test]
    fn test_unsupported_and_empty() {
        assert_eq!(classify(&[]), Err(ClassifyError::Empty));
        assert_eq!(classify(&ranks(&[Three, Four])), Err(ClassifyError::Unsupported));
        assert_eq!(classify(&ranks(&[Three, Three, Three, Four])), Err(ClassifyError::Unsupported));
        assert_eq!(
            classify(&[card(Three, Spade), Card::joker(BigJoker)]),
            Err(ClassifyError::Unsupported)
        );
    }

    // --- 大小比较测试 ---

    #[test]
    fn test_opening_play_always_allowed() {
        assert!(can_beat(&combo(PlayKind::Single, Three, 1), None));
        assert!(can_beat(&combo(PlayKind::PairChain, Six, 8), None));
    }

    #[test]
    fn test_rocket_beats_everything() {
        let others = [
            combo(PlayKind::Single, BigJoker, 1),
            combo(PlayKind::Straight, Ace, 8),
            Combination::boosted(PlayKind::Bomb, Two, 4, 2),
            Combination::boosted(PlayKind::ChainBomb, Two, 6, 6),
            rocket(),
        ];
        for other in &others {
            assert!(can_beat(&rocket(), Some(other)));
        }
        for other in &others[..4] {
            assert!(!can_beat(other, Some(&rocket())));
        }
    }

    #[test]
    fn test_bomb_against_bomb() {
        let five = Combination::boosted(PlayKind::Bomb, Five, 4, 2);
        let four = Combination::boosted(PlayKind::Bomb, Four, 4, 2);
        assert!(can_beat(&five, Some(&four)));
        assert!(!can_beat(&four, Some(&five)));
        assert!(!can_beat(&five, Some(&five)));

        let chain = Combination::boosted(PlayKind::ChainBomb, Four, 4, 4);
        assert!(can_beat(&chain, Some(&five)));
        assert!(!can_beat(&five, Some(&chain)));
        assert!(!can_beat(&combo(PlayKind::Single, Two, 1), Some(&four)));
    }

    #[test]
    fn test_chain_bomb_against_chain_bomb() {
        let short_low = classify(&ranks(&[Three, Three, Four, Four])).unwrap();
        let long = classify(&ranks(&[Five, Five, Six, Six, Seven, Seven])).unwrap();
        let short_high = classify(&ranks(&[Eight, Eight, Nine, Nine])).unwrap();

        // 更长的连炸可以压住更短的
        assert!(can_beat(&long, Some(&short_low)));
        // 点数更大但更短，压不住
        assert!(!can_beat(&short_high, Some(&long)));
        // 同长度比点数
        assert!(can_beat(&short_high, Some(&short_low)));
        // 同点数压不住
        let same = classify(&ranks(&[Six, Six, Seven, Seven])).unwrap();
        let other_suits = classify(&[
            card(Six, Club), card(Six, Diamond), card(Seven, Club), card(Seven, Diamond),
        ]).unwrap();
        assert!(!can_beat(&other_suits, Some(&same)));
        assert!(!can_beat(&long, Some(&long)));
    }

    #[test]
    fn test_same_kind_needs_same_length_and_higher_value() {
        let low = combo(PlayKind::Straight, Seven, 5);
        let high = combo(PlayKind::Straight, Eight, 5);
        let longer = combo(PlayKind::Straight, Nine, 6);
        assert!(can_beat(&high, Some(&low)));
        assert!(!can_beat(&low, Some(&high)));
        assert!(!can_beat(&longer, Some(&low)));
        assert!(!can_beat(&combo(PlayKind::Pair, Two, 2), Some(&combo(PlayKind::Single, Three, 1))));
    }
}
