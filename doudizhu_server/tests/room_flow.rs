use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use doudizhu_core::{ClientMessage, ServerMessage, HAND_SIZE};
use doudizhu_server::settings::RoomSettings;
use doudizhu_server::{serve, AppState, SharedState};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const KEY: &str = "test-key";

// 每个测试在随机端口上启动独立的服务器
async fn start_server() -> (String, SharedState) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let state = SharedState::new(AppState::new(RoomSettings {
        id: "main".into(),
        key: KEY.into(),
    }));
    tokio::spawn(serve(listener, Arc::clone(&state), std::future::pending()));
    (format!("ws://{}/ws", addr), state)
}

async fn send(client: &mut Client, msg: &ClientMessage) {
    let payload = serde_json::to_string(msg).expect("serialization to work");
    client.send(Message::Text(payload.into())).await.expect("server to be up");
}

/// 读取下一条服务器消息，连接被关闭时返回 `None`
async fn recv(client: &mut Client) -> Option<ServerMessage> {
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("server to respond in time");
        match next {
            Some(Ok(Message::Text(text))) => {
                return Some(serde_json::from_str(text.as_str()).expect("valid server message"));
            }
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
            Some(Ok(_)) => continue,
        }
    }
}

async fn recv_until<F>(client: &mut Client, pred: F) -> ServerMessage
where
    F: Fn(&ServerMessage) -> bool,
{
    loop {
        let msg = recv(client).await.expect("connection to stay open");
        if pred(&msg) {
            return msg;
        }
    }
}

async fn connect(url: &str) -> Client {
    let (mut client, _) = connect_async(url).await.expect("server to accept");
    assert!(matches!(recv(&mut client).await, Some(ServerMessage::NeedJoin { .. })));
    client
}

async fn join(url: &str, name: &str) -> (Client, Uuid) {
    let mut client = connect(url).await;
    send(&mut client, &ClientMessage::Join { key: KEY.into(), name: Some(name.into()) }).await;
    match recv(&mut client).await {
        Some(ServerMessage::Welcome { player_id, name: welcomed }) => {
            assert_eq!(welcomed, name);
            (client, player_id)
        }
        other => panic!("expected welcome, got {:?}", other),
    }
}

async fn wait_for_rooms(state: &SharedState, expected: usize) {
    for _ in 0..100 {
        if state.lobby.room_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("room count never reached {}", expected);
}

#[tokio::test]
async fn bad_key_is_rejected_and_closed() {
    let (url, state) = start_server().await;
    let mut client = connect(&url).await;
    send(&mut client, &ClientMessage::Join { key: "wrong".into(), name: None }).await;

    assert_eq!(recv(&mut client).await, Some(ServerMessage::Error { message: "密钥错误".into() }));
    assert_eq!(recv(&mut client).await, None);
    assert_eq!(state.lobby.room_count(), 0);
}

#[tokio::test]
async fn commands_before_join_are_ignored() {
    let (url, _state) = start_server().await;
    let mut client = connect(&url).await;
    send(&mut client, &ClientMessage::Ready).await;
    send(&mut client, &ClientMessage::Join { key: KEY.into(), name: Some("late".into()) }).await;

    // 第一条回应就是欢迎消息，之前的指令没有任何效果
    assert!(matches!(recv(&mut client).await, Some(ServerMessage::Welcome { .. })));
    match recv(&mut client).await {
        Some(ServerMessage::State { payload }) => assert!(!payload.players[0].ready),
        other => panic!("expected state, got {:?}", other),
    }
}

#[tokio::test]
async fn fourth_join_is_rejected_and_closed() {
    let (url, _state) = start_server().await;
    let (mut alice, _) = join(&url, "alice").await;
    let (_bob, _) = join(&url, "bob").await;
    let (_carol, _) = join(&url, "carol").await;

    let mut dave = connect(&url).await;
    send(&mut dave, &ClientMessage::Join { key: KEY.into(), name: Some("dave".into()) }).await;
    assert_eq!(recv(&mut dave).await, Some(ServerMessage::Error { message: "房间已满".into() }));
    assert_eq!(recv(&mut dave).await, None);

    // 名单仍然是三个人
    send(&mut alice, &ClientMessage::Rename { name: "alicia".into() }).await;
    let msg = recv_until(&mut alice, |m| match m {
        ServerMessage::State { payload } => payload.players.iter().any(|p| p.name == "alicia"),
        _ => false,
    })
    .await;
    match msg {
        ServerMessage::State { payload } => assert_eq!(payload.players.len(), 3),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn full_ready_deals_and_enforces_turns() {
    let (url, _state) = start_server().await;
    let (mut alice, alice_id) = join(&url, "alice").await;
    let (mut bob, bob_id) = join(&url, "bob").await;
    let (mut carol, _) = join(&url, "carol").await;

    for client in [&mut alice, &mut bob, &mut carol] {
        send(client, &ClientMessage::Ready).await;
    }

    let mut hands = Vec::new();
    for client in [&mut alice, &mut bob, &mut carol] {
        match recv_until(client, |m| matches!(m, ServerMessage::Hand { payload } if !payload.is_empty())).await {
            ServerMessage::Hand { payload } => {
                assert_eq!(payload.len(), HAND_SIZE);
                hands.push(payload);
            }
            _ => unreachable!(),
        }
    }

    // bob 不是先手，出牌会被拒绝
    send(&mut bob, &ClientMessage::Play { cards: vec![hands[1][0].id.clone()] }).await;
    assert_eq!(
        recv_until(&mut bob, |m| matches!(m, ServerMessage::Error { .. })).await,
        ServerMessage::Error { message: "还没轮到你".into() }
    );

    // alice 打出最小的单张，行动权交给 bob
    send(&mut alice, &ClientMessage::Play { cards: vec![hands[0][0].id.clone()] }).await;
    let msg = recv_until(&mut carol, |m| {
        matches!(m, ServerMessage::State { payload } if payload.last_play.is_some())
    })
    .await;
    match msg {
        ServerMessage::State { payload } => {
            assert_eq!(payload.turn, Some(bob_id));
            let last = payload.last_play.expect("last play");
            assert_eq!(last.player_id, alice_id);
            let alice_count = payload.players.iter().find(|p| p.id == alice_id).map(|p| p.card_count);
            assert_eq!(alice_count, Some(HAND_SIZE - 1));
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn disconnect_mid_hand_aborts_the_hand() {
    let (url, _state) = start_server().await;
    let (mut alice, _) = join(&url, "alice").await;
    let (mut bob, _) = join(&url, "bob").await;
    let (mut carol, _) = join(&url, "carol").await;

    for client in [&mut alice, &mut bob, &mut carol] {
        send(client, &ClientMessage::Ready).await;
    }
    recv_until(&mut bob, |m| matches!(m, ServerMessage::Deal)).await;

    drop(alice);
    recv_until(&mut bob, |m| matches!(m, ServerMessage::Info { .. })).await;
    match recv_until(&mut bob, |m| matches!(m, ServerMessage::State { .. })).await {
        ServerMessage::State { payload } => {
            assert!(!payload.started);
            assert_eq!(payload.turn, None);
            assert_eq!(payload.players.len(), 2);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn empty_room_is_discarded_and_recreated() {
    let (url, state) = start_server().await;
    let (alice, _) = join(&url, "alice").await;
    wait_for_rooms(&state, 1).await;

    drop(alice);
    wait_for_rooms(&state, 0).await;

    // 新房间从头开始，默认昵称重新从 1 编号
    let mut client = connect(&url).await;
    send(&mut client, &ClientMessage::Join { key: KEY.into(), name: None }).await;
    match recv(&mut client).await {
        Some(ServerMessage::Welcome { name, .. }) => assert_eq!(name, "玩家1"),
        other => panic!("expected welcome, got {:?}", other),
    }
    wait_for_rooms(&state, 1).await;
}
