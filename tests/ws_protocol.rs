//! WebSocket protocol integration tests.
//!
//! Drives real client connections through join / call / push-back flows
//! and asserts on the event frames coming back.

mod fixtures;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use fixtures::TestServer;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(server: &TestServer) -> WsClient {
    let (ws, _) = connect_async(server.ws_url())
        .await
        .expect("Failed to connect WebSocket");
    ws
}

async fn send_event(ws: &mut WsClient, event: serde_json::Value) {
    ws.send(Message::Text(event.to_string().into()))
        .await
        .expect("Failed to send frame");
}

/// Read frames until one carries the wanted event name. Panics after two
/// seconds without a match.
async fn recv_event(ws: &mut WsClient, event: &str) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())
            .unwrap_or_else(|| panic!("timed out waiting for '{event}'"));
        let frame = tokio::time::timeout(remaining, ws.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for '{event}'"))
            .expect("connection closed")
            .expect("WebSocket error");
        if let Message::Text(text) = frame {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            if value["event"] == event {
                return value["data"].clone();
            }
        }
    }
}

async fn register(ws: &mut WsClient, user_id: &str, room: &str) {
    send_event(
        ws,
        serde_json::json!({
            "event": "register-user",
            "data": {"userId": user_id, "room": room}
        }),
    )
    .await;
    recv_event(ws, "restore-entries").await;
}

async fn join_marking(ws: &mut WsClient, user_id: &str, room: &str, name: &str) -> serde_json::Value {
    send_event(
        ws,
        serde_json::json!({
            "event": "join-marking",
            "data": {
                "name": name,
                "studentId": "1234",
                "userId": user_id,
                "room": room
            }
        }),
    )
    .await;
    recv_event(ws, "joined-queue").await
}

#[tokio::test]
async fn test_connect_receives_rooms_list() {
    let server = TestServer::start(19180);
    server.wait_ready().await;

    let mut ws = connect(&server).await;

    let rooms = recv_event(&mut ws, "rooms-list-update").await;
    assert_eq!(rooms, serde_json::json!([]));
}

#[tokio::test]
async fn test_join_marking_full_flow() {
    let server = TestServer::start(19181);
    server.wait_ready().await;
    let mut ws = connect(&server).await;
    register(&mut ws, "u1", "lab-1").await;

    send_event(
        &mut ws,
        serde_json::json!({
            "event": "join-marking",
            "data": {
                "name": "Alice",
                "studentId": "1234",
                "userId": "u1",
                "room": "lab-1"
            }
        }),
    )
    .await;

    // The room broadcast arrives first and carries the entry with its
    // derived position; the targeted ack follows.
    let update = recv_event(&mut ws, "queues-update").await;
    assert_eq!(update["marking"][0]["name"], "Alice");
    assert_eq!(update["marking"][0]["studentId"], "1234");
    assert_eq!(update["marking"][0]["position"], 1);
    assert_eq!(update["marking"][0]["status"], "waiting");

    let joined = recv_event(&mut ws, "joined-queue").await;
    assert_eq!(joined["queueType"], "marking");
    assert_eq!(joined["position"], 1);
    assert!(joined["entryId"].is_string());
}

#[tokio::test]
async fn test_cross_room_join_rejected() {
    // Scenario: userA queued in room "r1" must not enter room "r2".
    let server = TestServer::start(19182);
    server.wait_ready().await;
    let mut ws = connect(&server).await;
    register(&mut ws, "userA", "r1").await;
    join_marking(&mut ws, "userA", "r1", "Alice").await;

    send_event(
        &mut ws,
        serde_json::json!({
            "event": "join-question",
            "data": {
                "name": "Alice",
                "description": "also this",
                "userId": "userA",
                "room": "r2"
            }
        }),
    )
    .await;

    let error = recv_event(&mut ws, "error").await;
    let message = error["message"].as_str().unwrap();
    assert!(message.contains("r1"), "error should name the conflicting room: {message}");
}

#[tokio::test]
async fn test_checkin_calls_in_join_order_and_skips_called() {
    // Scenario: U1, U2 join the question queue; checkin calls U1; a second
    // checkin calls U2, not U1 again; a third finds nobody waiting.
    let server = TestServer::start(19183);
    server.wait_ready().await;

    let mut u1 = connect(&server).await;
    register(&mut u1, "u1", "r").await;
    let mut u2 = connect(&server).await;
    register(&mut u2, "u2", "r").await;
    let mut ta = connect(&server).await;
    register(&mut ta, "ta", "r").await;

    for (ws, id) in [(&mut u1, "u1"), (&mut u2, "u2")] {
        send_event(
            ws,
            serde_json::json!({
                "event": "join-question",
                "data": {"name": id, "description": "q", "userId": id, "room": "r"}
            }),
        )
        .await;
        recv_event(ws, "joined-queue").await;
    }

    let checkin = serde_json::json!({
        "event": "ta-checkin",
        "data": {"queueType": "question", "room": "r"}
    });

    send_event(&mut ta, checkin.clone()).await;
    let called = recv_event(&mut u1, "being-called").await;
    assert_eq!(called["queueType"], "question");
    assert_eq!(
        called["message"],
        "TA will be with you shortly. Please raise your hand."
    );

    send_event(&mut ta, checkin.clone()).await;
    recv_event(&mut u2, "being-called").await;

    // Both entries are called now, so nothing is waiting.
    send_event(&mut ta, checkin).await;
    let error = recv_event(&mut ta, "error").await;
    assert_eq!(error["message"], "No one waiting in the question queue.");
}

#[tokio::test]
async fn test_push_back_reorders_queue() {
    // Scenario: A then B join marking; A pushes back; order becomes [B, A].
    let server = TestServer::start(19184);
    server.wait_ready().await;

    let mut a = connect(&server).await;
    register(&mut a, "userA", "r").await;
    let mut b = connect(&server).await;
    register(&mut b, "userB", "r").await;

    let joined_a = join_marking(&mut a, "userA", "r", "A").await;
    join_marking(&mut b, "userB", "r", "B").await;

    send_event(
        &mut a,
        serde_json::json!({
            "event": "push-back",
            "data": {
                "queueType": "marking",
                "entryId": joined_a["entryId"],
                "userId": "userA",
                "room": "r"
            }
        }),
    )
    .await;

    let pushed = recv_event(&mut a, "pushed-back").await;
    assert_eq!(pushed["position"], 2);

    // B moved to the front and hears about it.
    let notice = recv_event(&mut b, "turn-approaching").await;
    assert_eq!(notice["position"], 1);
    assert_eq!(notice["message"], "You're next! Please be ready.");

    let update = recv_event(&mut a, "queues-update").await;
    assert_eq!(update["marking"][0]["name"], "B");
    assert_eq!(update["marking"][1]["name"], "A");
}

#[tokio::test]
async fn test_register_restores_entry_after_reconnect() {
    let server = TestServer::start(19185);
    server.wait_ready().await;

    let mut ws = connect(&server).await;
    register(&mut ws, "u1", "r").await;
    let joined = join_marking(&mut ws, "u1", "r", "Alice").await;
    drop(ws);

    // A fresh connection for the same user gets its entry back.
    let mut reconnected = connect(&server).await;
    send_event(
        &mut reconnected,
        serde_json::json!({
            "event": "register-user",
            "data": {"userId": "u1", "room": "r"}
        }),
    )
    .await;
    let restore = recv_event(&mut reconnected, "restore-entries").await;
    assert_eq!(restore["marking"]["entryId"], joined["entryId"]);
    assert_eq!(restore["marking"]["position"], 1);
    assert_eq!(restore["marking"]["status"], "waiting");
    assert!(restore["question"].is_null());
}

#[tokio::test]
async fn test_state_survives_restart() {
    // Two server instances share a state file; the second sees what the
    // first persisted.
    let first = TestServer::start(19186);
    first.wait_ready().await;
    let data_file = first.data_file().clone();

    let mut ws = connect(&first).await;
    register(&mut ws, "u1", "persistent").await;
    join_marking(&mut ws, "u1", "persistent", "Alice").await;

    // Wait until the coalesced writer has hit the disk.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !data_file.exists() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "state file was never written"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let second = TestServer::start_with_data_file(19187, data_file);
    second.wait_ready().await;

    let client = reqwest::Client::new();
    let rooms: serde_json::Value = client
        .get(format!("{}/api/rooms", second.base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rooms[0]["name"], "persistent");
    assert_eq!(rooms[0]["markingCount"], 1);
}

#[tokio::test]
async fn test_malformed_frame_gets_error_event() {
    let server = TestServer::start(19188);
    server.wait_ready().await;
    let mut ws = connect(&server).await;

    ws.send(Message::Text("not json at all".to_string().into()))
        .await
        .unwrap();

    let error = recv_event(&mut ws, "error").await;
    assert_eq!(error["message"], "Invalid message format.");
}

#[tokio::test]
async fn test_assist_and_finish_flow() {
    let server = TestServer::start(19190);
    server.wait_ready().await;

    let mut student = connect(&server).await;
    register(&mut student, "u1", "r").await;
    let joined = join_marking(&mut student, "u1", "r", "Alice").await;

    let mut ta = connect(&server).await;
    register(&mut ta, "ta", "r").await;

    send_event(
        &mut ta,
        serde_json::json!({
            "event": "ta-start-assisting",
            "data": {"queueType": "marking", "entryId": joined["entryId"], "room": "r"}
        }),
    )
    .await;
    let assisting = recv_event(&mut student, "assisting-started").await;
    assert_eq!(assisting["message"], "The TA is assisting you now.");

    send_event(
        &mut ta,
        serde_json::json!({
            "event": "ta-next",
            "data": {"queueType": "combined", "room": "r"}
        }),
    )
    .await;
    let finished = recv_event(&mut student, "finished-assisting").await;
    assert_eq!(
        finished["message"],
        "The TA has finished assisting you. Hope that helped!"
    );

    // The broadcast following the finish shows the emptied queue.
    let update = recv_event(&mut student, "queues-update").await;
    assert_eq!(update["marking"], serde_json::json!([]));
}

#[tokio::test]
async fn test_ta_clear_all_notifies_every_member() {
    let server = TestServer::start(19189);
    server.wait_ready().await;

    let mut queued = connect(&server).await;
    register(&mut queued, "u1", "r").await;
    join_marking(&mut queued, "u1", "r", "Alice").await;

    let mut bystander = connect(&server).await;
    register(&mut bystander, "u2", "r").await;

    let mut ta = connect(&server).await;
    register(&mut ta, "ta", "r").await;
    send_event(
        &mut ta,
        serde_json::json!({"event": "ta-clear-all", "data": {"room": "r"}}),
    )
    .await;

    for ws in [&mut queued, &mut bystander] {
        let reset = recv_event(ws, "removed-from-queue").await;
        assert_eq!(reset["message"], "The queue has been reset by the TA.");
        assert!(reset.get("queueType").is_none());
    }
}
