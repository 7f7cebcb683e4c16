use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;
use uuid::Uuid;

use doudizhu_core::{Card, ClientMessage, ServerMessage, StateSnapshot};

const DEFAULT_URL: &str = "ws://127.0.0.1:3000/ws";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(&std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string()))?;

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();

    // 入座后记下自己的ID，用于提示是否轮到自己
    let my_id: Arc<Mutex<Option<Uuid>>> = Arc::new(Mutex::new(None));

    // 启动一个任务来处理从服务器接收的消息
    let my_id_reader = Arc::clone(&my_id);
    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(text.as_str()) {
                    Ok(server_msg) => {
                        print_server_message(&server_msg, &my_id_reader);
                        print!("> "); // 重新显示输入提示符
                        let _ = std::io::stdout().flush();
                    }
                    Err(e) => eprintln!("解析服务器消息失败: {}", e),
                },
                Ok(Message::Close(_)) => {
                    println!("\n服务器关闭了连接");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    // 主任务处理用户输入
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- 斗地主客户端 ---");
    println!("可用命令:");
    println!("  join <密钥> [昵称]        - 加入房间");
    println!("  rename <昵称>             - 修改昵称");
    println!("  ready                     - 准备 / 取消准备");
    println!("  play <牌> [牌...]         - 出牌，例如 play 3♠ 3♥");
    println!("  pass                      - 不出");
    println!("  exit                      - 退出");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = stdin.next_line().await? else {
            break;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();

        let client_msg = match parts.first().copied() {
            Some("join") => {
                let Some(key) = parts.get(1) else {
                    println!("用法: join <密钥> [昵称]");
                    continue;
                };
                let name = parts.get(2).map(|s| s.to_string());
                ClientMessage::Join { key: key.to_string(), name }
            }
            Some("rename") => {
                let Some(name) = parts.get(1) else {
                    println!("用法: rename <昵称>");
                    continue;
                };
                ClientMessage::Rename { name: name.to_string() }
            }
            Some("ready") => ClientMessage::Ready,
            Some("play") => {
                if parts.len() < 2 {
                    println!("用法: play <牌> [牌...]");
                    continue;
                }
                ClientMessage::Play { cards: parts[1..].iter().map(|s| s.to_string()).collect() }
            }
            Some("pass") => ClientMessage::Pass,
            Some("exit") => {
                println!("正在断开连接...");
                break;
            }
            None => continue,
            _ => {
                println!("未知命令: {}", line);
                continue;
            }
        };

        let payload = serde_json::to_string(&client_msg)?;
        write.send(Message::Text(payload.into())).await?;
    }

    let _ = write.send(Message::Close(None)).await;
    Ok(())
}

fn print_server_message(msg: &ServerMessage, my_id: &Mutex<Option<Uuid>>) {
    match msg {
        ServerMessage::NeedJoin { message } => println!("\n{}", message),
        ServerMessage::Welcome { player_id, name } => {
            if let Ok(mut id) = my_id.lock() {
                *id = Some(*player_id);
            }
            println!("\n欢迎，{}！你的ID是 {}", name, player_id);
        }
        ServerMessage::State { payload } => {
            let me = my_id.lock().ok().and_then(|id| *id);
            print_state(payload, me);
        }
        ServerMessage::Deal => println!("\n--- 新的一局开始了 ---"),
        ServerMessage::Hand { payload } => println!("\n你的手牌: {}", format_cards(payload)),
        ServerMessage::Win { payload } => {
            println!("\n*** {} 获胜！倍数 {}x ***", payload.name, payload.multiplier)
        }
        ServerMessage::Info { message } => println!("\n[提示] {}", message),
        ServerMessage::Error { message } => println!("\n[错误] {}", message),
    }
}

fn print_state(state: &StateSnapshot, me: Option<Uuid>) {
    println!();
    for player in &state.players {
        let marker = if state.started && state.turn == Some(player.id) { "->" } else { "  " };
        let ready = if player.ready { "已准备" } else { "" };
        println!("{} {:<8} {:>2} 张 {}", marker, player.name, player.card_count, ready);
    }
    if let Some(last) = &state.last_play {
        println!("上一手: {} {}", last.combination.kind, format_cards(&last.cards));
    }
    println!("倍数: {}x", state.multiplier);
    if state.started && me.is_some() && state.turn == me {
        println!(">>> 轮到你了");
    }
}

fn format_cards(cards: &[Card]) -> String {
    cards.iter().map(|c| c.id.as_str()).collect::<Vec<_>>().join(" ")
}
