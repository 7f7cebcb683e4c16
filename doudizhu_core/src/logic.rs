use crate::card::*;
use crate::combo::*;
use crate::error::GameError;
use crate::message::{Outbound, ServerMessage, WinInfo};
use crate::state::*;
use rand::Rng;
use std::collections::HashSet;
use uuid::Uuid;

// --- 核心游戏流程 ---

impl Room {
    /// 新玩家入座
    ///
    /// 房间未满时追加到名单末尾，私信欢迎消息并广播快照。
    /// 没有提供昵称时使用 `玩家<n>`。
    pub fn join(&mut self, name: Option<&str>) -> Result<(PlayerId, Vec<Outbound>), GameError> {
        if self.is_full() {
            return Err(GameError::RoomFull);
        }

        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => clamp_name(name),
            None => format!("玩家{}", self.players.len() + 1),
        };
        let player_id = Uuid::new_v4();
        self.players.push(Player { id: player_id, name: name.clone(), hand: Vec::new() });

        Ok((player_id, vec![
            Outbound::Direct(player_id, ServerMessage::Welcome { player_id, name }),
            self.state_message(),
        ]))
    }

    /// 处理已入座玩家的动作，使用线程本地的随机数发牌
    pub fn apply(&mut self, player_id: PlayerId, action: PlayerAction) -> Result<Vec<Outbound>, GameError> {
        self.apply_with(player_id, action, &mut rand::rng())
    }

    /// 处理已入座玩家的动作
    ///
    /// 所有校验都在修改状态之前完成：返回 `Err` 时房间状态保持不变。
    pub fn apply_with<R: Rng + ?Sized>(
        &mut self,
        player_id: PlayerId,
        action: PlayerAction,
        rng: &mut R,
    ) -> Result<Vec<Outbound>, GameError> {
        let idx = self.player_index(&player_id).ok_or(GameError::UnknownPlayer)?;
        match action {
            PlayerAction::Rename(name) => {
                // 空白昵称保留原名
                let name = name.trim();
                if !name.is_empty() {
                    self.players[idx].name = clamp_name(name);
                }
                Ok(vec![self.state_message()])
            }
            PlayerAction::ToggleReady => self.toggle_ready(player_id, rng),
            PlayerAction::Play(card_ids) => self.play(idx, card_ids),
            PlayerAction::Pass => self.pass(idx),
        }
    }

    /// 玩家离开房间
    ///
    /// 牌局进行中有人离开时本局作废，剩下的玩家回到未准备状态。
    pub fn leave(&mut self, player_id: PlayerId) -> Vec<Outbound> {
        let Some(idx) = self.player_index(&player_id) else {
            return Vec::new();
        };
        let player = self.players.remove(idx);
        self.ready.remove(&player.id);

        if self.players.is_empty() {
            *self = Room::default();
            return Vec::new();
        }

        let mut messages = Vec::new();
        if self.started {
            self.abort_hand();
            messages.push(Outbound::Broadcast(ServerMessage::Info {
                message: format!("{} 离开了房间，本局作废", player.name),
            }));
            messages.push(self.state_message());
            messages.extend(self.hand_messages());
        } else {
            messages.push(self.state_message());
        }
        messages
    }

    fn toggle_ready<R: Rng + ?Sized>(&mut self, player_id: PlayerId, rng: &mut R) -> Result<Vec<Outbound>, GameError> {
        if self.started {
            return Err(GameError::HandInProgress);
        }
        if !self.ready.remove(&player_id) {
            self.ready.insert(player_id);
        }

        let mut messages = Vec::new();
        // 准备集合只包含名单内的玩家，人数到齐即全部准备
        if self.players.len() == ROOM_CAPACITY && self.ready.len() == ROOM_CAPACITY {
            self.deal(rng);
            messages.push(Outbound::Broadcast(ServerMessage::Deal));
        }
        messages.push(self.state_message());
        if self.started {
            messages.extend(self.hand_messages());
        }
        Ok(messages)
    }

    /// 开始新的一局：发牌并由第一位入座的玩家先出
    fn deal<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let hands = deal_hands(rng);
        for (player, hand) in self.players.iter_mut().zip(hands) {
            player.hand = hand;
        }
        self.started = true;
        self.turn = self.players.first().map(|p| p.id);
        self.last_play = None;
        self.multiplier = 1;
    }

    fn play(&mut self, idx: usize, card_ids: Vec<CardId>) -> Result<Vec<Outbound>, GameError> {
        let player_id = self.players[idx].id;
        self.check_turn(player_id)?;

        // 1. 所选的每张牌都必须在手中，且不能重复
        let selected: HashSet<&str> = card_ids.iter().map(String::as_str).collect();
        let cards: Vec<Card> = self.players[idx]
            .hand
            .iter()
            .filter(|card| selected.contains(card.id.as_str()))
            .cloned()
            .collect();
        if cards.len() != card_ids.len() {
            return Err(GameError::UnknownCards);
        }

        // 2. 识别牌型并比较大小
        let combination = classify(&cards)?;
        if !can_beat(&combination, self.last_play.as_ref().map(|p| &p.combination)) {
            return Err(GameError::CannotBeat);
        }

        // 3. 校验通过，提交修改
        let player = &mut self.players[idx];
        player.hand.retain(|card| !selected.contains(card.id.as_str()));
        let hand_empty = player.hand.is_empty();
        let name = player.name.clone();

        self.multiplier = self.multiplier.saturating_mul(combination.factor());
        self.last_play = Some(Play { combination, player_id, cards });
        self.advance_turn(idx);

        if !hand_empty {
            let mut messages = vec![self.state_message()];
            messages.extend(self.hand_messages());
            return Ok(messages);
        }

        // 4. 手牌打完，本局结束，回到等待准备的状态。行动权仍停在下一位
        let win = WinInfo { player_id, name, multiplier: self.multiplier };
        self.finish_hand();
        let mut messages = vec![self.state_message()];
        messages.extend(self.hand_messages());
        messages.push(Outbound::Broadcast(ServerMessage::Win { payload: win }));
        Ok(messages)
    }

    /// 不出。只轮转行动权，上一手保持不变
    fn pass(&mut self, idx: usize) -> Result<Vec<Outbound>, GameError> {
        self.check_turn(self.players[idx].id)?;
        self.advance_turn(idx);
        Ok(vec![self.state_message()])
    }

    // --- 辅助逻辑函数 ---

    fn check_turn(&self, player_id: PlayerId) -> Result<(), GameError> {
        if !self.started {
            return Err(GameError::NotStarted);
        }
        if self.turn != Some(player_id) {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    /// 按入座顺序把行动权交给下一位，末位之后回到首位
    fn advance_turn(&mut self, idx: usize) {
        let next = (idx + 1) % self.players.len();
        self.turn = Some(self.players[next].id);
    }

    fn finish_hand(&mut self) {
        self.started = false;
        self.ready.clear();
        self.last_play = None;
    }

    fn abort_hand(&mut self) {
        self.finish_hand();
        // 离开的玩家可能正持有行动权
        self.turn = None;
        self.multiplier = 1;
        for player in self.players.iter_mut() {
            player.hand.clear();
        }
    }

    fn state_message(&self) -> Outbound {
        Outbound::Broadcast(ServerMessage::State { payload: self.snapshot() })
    }

    fn hand_messages(&self) -> impl Iterator<Item = Outbound> + '_ {
        self.players
            .iter()
            .map(|p| Outbound::Direct(p.id, ServerMessage::Hand { payload: p.hand.clone() }))
    }
}

// --- 单元测试 ---
