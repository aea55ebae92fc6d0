#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::time;
use tokio_tungstenite::tungstenite;

use lobby_api::config::Config;
use lobby_api::models::table::{Table, TableId, UserId};
use lobby_api::AppState;

pub type Ws =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Build a test AppState with default configuration and empty registries.
pub fn test_state() -> AppState {
    AppState::new(Config::default())
}

/// A game that has started, with every player present.
pub fn running_game(table_id: TableId, players: &[(UserId, &str)]) -> Table {
    let mut table = Table::game(table_id, format!("game {table_id}"));
    table.running = true;
    for &(user_id, username) in players {
        table.add_player(user_id, username);
    }
    table
}

/// A replay with the given viewers.
pub fn replay(table_id: TableId, spectators: &[(UserId, &str)]) -> Table {
    let mut table = Table::replay(table_id, format!("replay {table_id}"));
    for &(user_id, username) in spectators {
        table.add_spectator(user_id, username);
    }
    table
}

/// Start an actual TCP server for WebSocket testing. The server runs in the
/// background.
pub async fn start_ws_server(state: AppState) -> SocketAddr {
    let app = lobby_api::routes::router().with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

/// Connect to the gateway and send IDENTIFY. Returns the stream and the
/// READY payload.
pub async fn connect_and_identify(
    addr: SocketAddr,
    user_id: UserId,
    username: &str,
) -> (Ws, serde_json::Value) {
    let url = format!("ws://{addr}/gateway");
    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");

    let identify = serde_json::json!({
        "op": 2,
        "d": { "user_id": user_id, "username": username }
    });
    send_json(&mut ws, identify).await;

    let ready = next_frame(&mut ws).await;
    assert_eq!(ready["op"], 0, "READY should be op=0 (DISPATCH)");
    assert_eq!(ready["t"], "READY");
    (ws, ready["d"].clone())
}

pub async fn send_json(ws: &mut Ws, value: serde_json::Value) {
    ws.send(tungstenite::Message::Text(value.to_string().into()))
        .await
        .expect("send frame");
}

pub async fn send_unattend(ws: &mut Ws) {
    send_json(ws, serde_json::json!({ "op": 10 })).await;
}

/// Read the next text frame as JSON.
pub async fn next_frame(ws: &mut Ws) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for frame")
            .expect("stream ended")
            .expect("ws read error");
        if let tungstenite::Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("parse frame");
        }
    }
}

/// Skip frames until a dispatch named `event` arrives; returns its data.
pub async fn next_event(ws: &mut Ws, event: &str) -> serde_json::Value {
    loop {
        let frame = next_frame(ws).await;
        if frame["t"] == event {
            return frame["d"].clone();
        }
    }
}

/// Collect dispatch names up to and including `event`.
pub async fn events_until(ws: &mut Ws, event: &str) -> Vec<String> {
    let mut names = Vec::new();
    loop {
        let frame = next_frame(ws).await;
        if let Some(name) = frame["t"].as_str() {
            names.push(name.to_string());
            if name == event {
                return names;
            }
        }
    }
}
