//! Integration tests for the BoxFit server over real WebSocket connections.

use std::time::Duration;

use boxfit::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server_with(builder: BoxfitServerBuilder) -> String {
    let server = builder
        .bind("127.0.0.1:0")
        .piece_seed(7)
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

async fn start_server() -> String {
    start_server_with(BoxfitServer::builder()).await
}

async fn connect_path(addr: &str, path: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("should connect");
    ws
}

async fn connect(addr: &str, room: &str, name: &str) -> ClientWs {
    connect_path(addr, &format!("/api/ws/{room}/{name}")).await
}

/// Receives the next data message, skipping pings, and decodes it.
async fn recv(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("recv failed");
        if msg.is_ping() || msg.is_pong() {
            continue;
        }
        assert!(msg.is_text(), "expected a text frame, got {msg:?}");
        return serde_json::from_slice(&msg.into_data()).expect("decode");
    }
}

/// Receives messages until one of type `kind` arrives.
async fn recv_type(ws: &mut ClientWs, kind: &str) -> Value {
    loop {
        let msg = recv(ws).await;
        if msg["type"] == kind {
            return msg;
        }
    }
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send");
}

fn place(kind: PieceKind, x: i32, y: i32) -> Value {
    json!({
        "type": "place_piece",
        "data": {
            "shape": kind.shape(),
            "position": {"x": x, "y": y},
            "color": kind.color(),
        }
    })
}

/// Expects the server to close the connection.
async fn expect_closed(ws: &mut ClientWs) {
    loop {
        let result =
            tokio::time::timeout(Duration::from_secs(2), ws.next()).await;
        match result {
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => return, // expected
            Ok(Some(Err(_))) => return,                            // also fine
            other => panic!("expected close, got {other:?}"),
        }
    }
}

/// Connects two players to the same room and drains their join traffic.
async fn two_players(addr: &str, room: &str) -> (ClientWs, ClientWs) {
    let mut alice = connect(addr, room, "alice").await;
    recv_type(&mut alice, "game_state").await;
    let mut bob = connect(addr, room, "bob").await;
    recv_type(&mut bob, "game_state").await;
    recv_type(&mut alice, "player_joined").await;
    (alice, bob)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_join_receives_game_state() {
    let addr = start_server().await;
    let mut ws = connect(&addr, "lobby", "alice").await;

    let msg = recv(&mut ws).await;
    assert_eq!(msg["type"], "game_state");
    let data = &msg["data"];
    assert_eq!(data["player_name"], "alice");
    assert_eq!(data["player_color"], "#3B82F6");
    assert_eq!(data["score"], 0);
    assert_eq!(data["players"]["alice"]["connected"], true);
    assert_eq!(data["grid"].as_array().unwrap().len(), 10);
    assert!(data["grid"][0].as_array().unwrap().iter().all(Value::is_null));
    assert!(data["next_piece"]["type"].is_string());
}

#[tokio::test]
async fn test_percent_encoded_name_is_decoded() {
    let addr = start_server().await;
    let mut ws = connect_path(&addr, "/api/ws/lobby/Zo%C3%AB").await;

    let msg = recv(&mut ws).await;
    assert_eq!(msg["data"]["player_name"], "Zoë");
}

#[tokio::test]
async fn test_bad_path_gets_malformed_error_and_close() {
    let addr = start_server().await;
    let mut ws = connect_path(&addr, "/api/ws/only-a-room").await;

    let msg = recv(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["data"]["kind"], "malformed_intent");
    assert_eq!(msg["data"]["code"], 400);
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_name_conflict_rejected_and_closed() {
    let addr = start_server().await;
    let mut first = connect(&addr, "lobby", "alice").await;
    recv_type(&mut first, "game_state").await;

    let mut second = connect(&addr, "lobby", "alice").await;
    let msg = recv(&mut second).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["data"]["kind"], "name_conflict");
    assert_eq!(msg["data"]["code"], 409);
    expect_closed(&mut second).await;

    // The original connection is unaffected.
    send(&mut first, place(PieceKind::O, 0, 0)).await;
    let placed = recv(&mut first).await;
    assert_eq!(placed["type"], "piece_placed");
}

#[tokio::test]
async fn test_place_broadcasts_to_both_clients() {
    let addr = start_server().await;
    let (mut alice, mut bob) = two_players(&addr, "r").await;

    send(&mut alice, place(PieceKind::O, 0, 0)).await;

    for ws in [&mut alice, &mut bob] {
        let msg = recv(ws).await;
        assert_eq!(msg["type"], "piece_placed");
        let data = &msg["data"];
        assert_eq!(data["score"], 4);
        assert_eq!(data["placed_by"], "alice");
        assert_eq!(data["grid"][0][0], json!({"color": "#FFFF00", "player": "alice"}));
        assert_eq!(data["grid"][1][1]["player"], "alice");
        assert!(data["next_piece"]["shape"].is_array());
    }
}

#[tokio::test]
async fn test_invalid_placement_error_only_to_requester() {
    let addr = start_server().await;
    let (mut alice, mut bob) = two_players(&addr, "r").await;

    send(&mut alice, place(PieceKind::I, 7, 0)).await;
    let msg = recv(&mut alice).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["data"]["kind"], "invalid_placement");
    assert_eq!(msg["data"]["code"], 422);

    // Bob's next message is his own placement, not the rejection.
    send(&mut bob, place(PieceKind::O, 0, 0)).await;
    let msg = recv(&mut bob).await;
    assert_eq!(msg["type"], "piece_placed");
    assert_eq!(msg["data"]["score"], 4);
}

#[tokio::test]
async fn test_undecodable_intent_keeps_connection_open() {
    let addr = start_server().await;
    let mut ws = connect(&addr, "r", "alice").await;
    recv_type(&mut ws, "game_state").await;

    ws.send(Message::text("not json")).await.expect("send");
    let msg = recv(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["data"]["kind"], "malformed_intent");

    send(&mut ws, json!({"type": "place_piece", "data": {"shape": [[1, 1], [1]]}})).await;
    let msg = recv(&mut ws).await;
    assert_eq!(msg["data"]["kind"], "malformed_intent");

    send(&mut ws, place(PieceKind::O, 4, 4)).await;
    let msg = recv(&mut ws).await;
    assert_eq!(msg["type"], "piece_placed");
}

#[tokio::test]
async fn test_rotate_broadcasts_piece_rotated() {
    let addr = start_server().await;
    let mut alice = connect(&addr, "r", "alice").await;
    let state = recv_type(&mut alice, "game_state").await;
    let mut bob = connect(&addr, "r", "bob").await;
    recv_type(&mut bob, "game_state").await;
    recv_type(&mut alice, "player_joined").await;

    let piece = &state["data"]["next_piece"];
    let shape: Shape = serde_json::from_value(piece["shape"].clone()).unwrap();
    send(
        &mut bob,
        json!({
            "type": "rotate_piece",
            "data": {"shape": shape, "generation": state["data"]["generation"]}
        }),
    )
    .await;

    let expected = serde_json::to_value(shape.rotated()).unwrap();
    for ws in [&mut alice, &mut bob] {
        let msg = recv(ws).await;
        assert_eq!(msg["type"], "piece_rotated");
        assert_eq!(msg["data"]["shape"], expected);
        assert_eq!(msg["data"]["rotated_by"], "bob");
    }
}

#[tokio::test]
async fn test_stale_rotation_rejected_after_placement() {
    let addr = start_server().await;
    let mut ws = connect(&addr, "r", "alice").await;
    let state = recv_type(&mut ws, "game_state").await;

    send(&mut ws, place(PieceKind::O, 0, 0)).await;
    let placed = recv_type(&mut ws, "piece_placed").await;

    send(
        &mut ws,
        json!({
            "type": "rotate_piece",
            "data": {
                "shape": placed["data"]["next_piece"]["shape"],
                "generation": state["data"]["generation"],
            }
        }),
    )
    .await;
    let msg = recv(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["data"]["kind"], "stale_piece");
}

#[tokio::test]
async fn test_disconnect_broadcasts_player_left() {
    let addr = start_server().await;
    let (mut alice, mut bob) = two_players(&addr, "r").await;

    bob.close(None).await.expect("close");

    let msg = recv_type(&mut alice, "player_left").await;
    assert_eq!(msg["data"]["player_name"], "bob");
    assert_eq!(msg["data"]["players"]["bob"]["connected"], false);
}

#[tokio::test]
async fn test_rejoin_keeps_color() {
    let addr = start_server().await;
    let (mut alice, mut bob) = two_players(&addr, "r").await;

    bob.close(None).await.expect("close");
    recv_type(&mut alice, "player_left").await;

    let mut bob = connect(&addr, "r", "bob").await;
    let state = recv(&mut bob).await;
    assert_eq!(state["type"], "game_state");
    assert_eq!(state["data"]["player_color"], "#EF4444");

    let joined = recv_type(&mut alice, "player_joined").await;
    assert_eq!(joined["data"]["players"]["bob"]["connected"], true);
}

#[tokio::test]
async fn test_leave_room_removes_player_and_closes() {
    let addr = start_server().await;
    let (mut alice, mut bob) = two_players(&addr, "r").await;

    send(&mut bob, json!({"type": "leave_room"})).await;
    expect_closed(&mut bob).await;

    let msg = recv_type(&mut alice, "player_left").await;
    assert_eq!(msg["data"]["player_name"], "bob");
    assert!(msg["data"]["players"].get("bob").is_none());
}

#[tokio::test]
async fn test_rooms_are_independent() {
    let addr = start_server().await;
    let mut a = connect(&addr, "one", "alice").await;
    recv_type(&mut a, "game_state").await;
    let mut b = connect(&addr, "two", "alice").await;
    recv_type(&mut b, "game_state").await;

    send(&mut a, place(PieceKind::O, 0, 0)).await;
    recv_type(&mut a, "piece_placed").await;

    send(&mut b, place(PieceKind::O, 0, 0)).await;
    let msg = recv(&mut b).await;
    assert_eq!(msg["type"], "piece_placed");
    assert_eq!(msg["data"]["score"], 4);
}

#[tokio::test]
async fn test_idle_timeout_closes_connection() {
    let addr = start_server_with(
        BoxfitServer::builder().idle_timeout(Some(Duration::from_millis(100))),
    )
    .await;
    let mut ws = connect(&addr, "r", "alice").await;
    recv_type(&mut ws, "game_state").await;

    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_silent_tcp_peer_does_not_block_other_players() {
    let addr = start_server().await;

    // Opens TCP and never sends the upgrade request.
    let _silent = tokio::net::TcpStream::connect(&addr).await.unwrap();

    let mut ws = tokio::time::timeout(
        Duration::from_secs(3),
        connect(&addr, "r", "alice"),
    )
    .await
    .expect("a silent peer must not stall accepting");
    let msg = recv(&mut ws).await;
    assert_eq!(msg["type"], "game_state");
}

#[tokio::test]
async fn test_handshake_timeout_drops_silent_peer() {
    use tokio::io::AsyncReadExt;

    let addr = start_server_with(
        BoxfitServer::builder().handshake_timeout(Duration::from_millis(100)),
    )
    .await;
    let mut silent = tokio::net::TcpStream::connect(&addr).await.unwrap();

    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(Duration::from_secs(2), silent.read(&mut buf))
        .await
        .expect("server should drop the stream");
    // EOF or reset, either way nothing was sent.
    assert!(matches!(read, Ok(0) | Err(_)), "got {read:?}");
}

#[tokio::test]
async fn test_unresponsive_peer_is_dropped_and_name_freed() {
    let addr = start_server_with(
        BoxfitServer::builder()
            .heartbeat_interval(Some(Duration::from_millis(100))),
    )
    .await;
    // Bob is never polled again, so he never answers a ping.
    let (mut alice, _bob) = two_players(&addr, "r").await;

    let left = recv_type(&mut alice, "player_left").await;
    assert_eq!(left["data"]["player_name"], "bob");
    assert_eq!(left["data"]["players"]["bob"]["connected"], false);

    let mut bob = connect(&addr, "r", "bob").await;
    let state = recv(&mut bob).await;
    assert_eq!(state["type"], "game_state");
    assert_eq!(state["data"]["player_name"], "bob");
}

#[tokio::test]
async fn test_responsive_peer_survives_heartbeats() {
    let addr = start_server_with(
        BoxfitServer::builder()
            .heartbeat_interval(Some(Duration::from_millis(50))),
    )
    .await;
    let mut ws = connect(&addr, "r", "alice").await;
    recv_type(&mut ws, "game_state").await;

    // Keep reading for several periods; pongs go out as pings arrive.
    let quiet = tokio::time::timeout(Duration::from_millis(400), recv(&mut ws)).await;
    assert!(quiet.is_err(), "no data expected, got {quiet:?}");

    send(&mut ws, place(PieceKind::O, 0, 0)).await;
    let msg = recv(&mut ws).await;
    assert_eq!(msg["type"], "piece_placed");
}
