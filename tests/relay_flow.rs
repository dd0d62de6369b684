//! End-to-end relay tests against a fake upstream server and login endpoint.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Form, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::tungstenite::Message as ObserverMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use showdown_relay::app_state::AppState;
use showdown_relay::config::RelayConfig;
use showdown_relay::server;

const WAIT: Duration = Duration::from_secs(5);

/// Frame that makes the fake upstream close the socket.
const DROP_CONNECTION: &str = "/drop-connection";

type Observer = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone)]
enum LoginReply {
    Fixed(&'static str),
    PerName,
}

#[derive(Clone)]
struct FakeState {
    frames: mpsc::UnboundedSender<String>,
    logins: mpsc::UnboundedSender<HashMap<String, String>>,
    reply: LoginReply,
    gate: Option<Arc<Notify>>,
}

struct FakeShowdown {
    ws_url: String,
    login_url: String,
    frames: mpsc::UnboundedReceiver<String>,
    logins: mpsc::UnboundedReceiver<HashMap<String, String>>,
}

impl FakeShowdown {
    async fn next_frame(&mut self) -> String {
        tokio::time::timeout(WAIT, self.frames.recv())
            .await
            .expect("timed out waiting for upstream frame")
            .expect("fake upstream gone")
    }

    async fn frame_matching(&mut self, expected: &str) {
        loop {
            if self.next_frame().await == expected {
                return;
            }
        }
    }
}

async fn upstream_ws(ws: WebSocketUpgrade, State(state): State<FakeState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| upstream_session(socket, state))
}

async fn upstream_session(mut socket: WebSocket, state: FakeState) {
    for greeting in ["|updateuser| Guest 1|0|1|", "|challstr|1|abcdef"] {
        if socket.send(Message::text(greeting)).await.is_err() {
            return;
        }
    }
    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Text(text) = msg {
            if text.as_str() == DROP_CONNECTION {
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
            let _ = state.frames.send(text.as_str().to_string());
        }
    }
}

async fn login(State(state): State<FakeState>, Form(form): Form<HashMap<String, String>>) -> String {
    if let Some(gate) = &state.gate {
        gate.notified().await;
    }
    let name = form.get("name").cloned().unwrap_or_default();
    let _ = state.logins.send(form);
    match state.reply {
        LoginReply::Fixed(body) => body.to_string(),
        LoginReply::PerName => format!(r#"]{{"assertion":"tok-{name}"}}"#),
    }
}

async fn spawn_router(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_fake(reply: LoginReply, gate: Option<Arc<Notify>>) -> FakeShowdown {
    let (frames_tx, frames) = mpsc::unbounded_channel();
    let (logins_tx, logins) = mpsc::unbounded_channel();
    let state = FakeState {
        frames: frames_tx,
        logins: logins_tx,
        reply,
        gate,
    };
    let app = Router::new()
        .route("/showdown/websocket", get(upstream_ws))
        .route("/action.php", post(login))
        .with_state(state);
    let addr = spawn_router(app).await;

    FakeShowdown {
        ws_url: format!("ws://{addr}/showdown/websocket"),
        login_url: format!("http://{addr}/action.php"),
        frames,
        logins,
    }
}

async fn spawn_relay(fake: &FakeShowdown) -> String {
    let config = RelayConfig {
        showdown_ws_url: fake.ws_url.clone(),
        showdown_login_url: fake.login_url.clone(),
        upstream_connect_timeout: Duration::from_secs(2),
        login_timeout: Duration::from_secs(10),
        ..RelayConfig::default()
    };
    let state = AppState::new(&config).unwrap();
    let addr = spawn_router(server::build_app(state, &config)).await;
    format!("http://{addr}")
}

async fn post_json(base: &str, path: &str, body: Value) -> (u16, String) {
    let response = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

async fn connect(base: &str, username: &str, password: &str) -> (u16, String) {
    post_json(base, "/connect", json!({ "username": username, "password": password })).await
}

async fn send(base: &str, message: &str) -> (u16, String) {
    post_json(base, "/send", json!({ "message": message })).await
}

async fn status(base: &str) -> Value {
    reqwest::get(format!("{base}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn wait_for_state(base: &str, state: &str) -> Value {
    tokio::time::timeout(WAIT, async {
        loop {
            let current = status(base).await;
            if current["state"] == state {
                return current;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("session never reached {state}"))
}

async fn next_json(observer: &mut Observer) -> Value {
    loop {
        let msg = tokio::time::timeout(WAIT, observer.next())
            .await
            .expect("timed out waiting for observer message")
            .expect("observer stream ended")
            .unwrap();
        if let ObserverMessage::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn send_before_connect_is_not_connected() {
    let fake = spawn_fake(LoginReply::Fixed(r#"]{"assertion":"tok123"}"#), None).await;
    let base = spawn_relay(&fake).await;

    let (code, body) = send(&base, "/cmd rooms").await;
    assert_eq!(code, 400);
    assert_eq!(body, "Not connected to Showdown");
}

#[tokio::test]
async fn login_then_forward_frames_in_order() {
    let mut fake = spawn_fake(LoginReply::Fixed(r#"]{"assertion":"tok123"}"#), None).await;
    let base = spawn_relay(&fake).await;

    let (code, body) = connect(&base, "alice", "secret").await;
    assert_eq!(code, 200);
    assert_eq!(body, "Connecting to Showdown...");

    assert_eq!(fake.next_frame().await, "|/trn alice,0,tok123");

    let form = tokio::time::timeout(WAIT, fake.logins.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(form["act"], "login");
    assert_eq!(form["name"], "alice");
    assert_eq!(form["pass"], "secret");
    assert_eq!(form["challstr"], "1|abcdef");

    let current = wait_for_state(&base, "authenticated").await;
    assert_eq!(current["authenticated"], true);
    assert_eq!(current["username"], "alice");

    let payloads = ["/cmd userdetails alice", "/pm bob, hi", "|/join lobby"];
    for payload in payloads {
        let (code, body) = send(&base, payload).await;
        assert_eq!(code, 200);
        assert_eq!(body, "Message sent to Showdown");
    }
    for payload in payloads {
        assert_eq!(fake.next_frame().await, payload);
    }
}

#[tokio::test]
async fn login_name_is_forwarded_verbatim() {
    let mut fake = spawn_fake(LoginReply::Fixed(r#"]{"assertion":"tok123"}"#), None).await;
    let base = spawn_relay(&fake).await;

    let (code, _) = connect(&base, " alice ", "secret").await;
    assert_eq!(code, 200);
    assert_eq!(fake.next_frame().await, "|/trn  alice ,0,tok123");

    let form = tokio::time::timeout(WAIT, fake.logins.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(form["name"], " alice ");
}

#[tokio::test]
async fn send_before_login_completes_is_not_logged_in() {
    let gate = Arc::new(Notify::new());
    let mut fake = spawn_fake(
        LoginReply::Fixed(r#"]{"assertion":"tok123"}"#),
        Some(Arc::clone(&gate)),
    )
    .await;
    let base = spawn_relay(&fake).await;

    let (code, _) = connect(&base, "alice", "secret").await;
    assert_eq!(code, 200);

    let (code, body) = send(&base, "/cmd rooms").await;
    assert_eq!(code, 400);
    assert_eq!(body, "Not logged in yet");

    gate.notify_one();
    assert_eq!(fake.next_frame().await, "|/trn alice,0,tok123");
    wait_for_state(&base, "authenticated").await;

    let (code, _) = send(&base, "/cmd rooms").await;
    assert_eq!(code, 200);
    assert_eq!(fake.next_frame().await, "/cmd rooms");
}

#[tokio::test]
async fn null_assertion_leaves_session_unauthenticated() {
    let fake = spawn_fake(LoginReply::Fixed(r#"]{"assertion":null}"#), None).await;
    let base = spawn_relay(&fake).await;

    let (code, _) = connect(&base, "alice", "wrong").await;
    assert_eq!(code, 200);

    let current = wait_for_state(&base, "login_failed").await;
    assert_eq!(current["authenticated"], false);
    assert!(current["last_error"].as_str().unwrap().contains("no assertion"));

    let (code, body) = send(&base, "/cmd rooms").await;
    assert_eq!(code, 400);
    assert_eq!(body, "Not logged in yet");
}

#[tokio::test]
async fn concurrent_connects_leave_one_consistent_session() {
    let mut fake = spawn_fake(LoginReply::PerName, None).await;
    let base = spawn_relay(&fake).await;

    let ((code_a, _), (code_b, _)) =
        tokio::join!(connect(&base, "alice", "a"), connect(&base, "bob", "b"));
    for code in [code_a, code_b] {
        assert!(code == 200 || code == 409, "unexpected status {code}");
    }
    assert!(code_a == 200 || code_b == 200);

    let current = wait_for_state(&base, "authenticated").await;
    let username = current["username"].as_str().unwrap().to_string();
    assert!(username == "alice" || username == "bob");
    fake.frame_matching(&format!("|/trn {username},0,tok-{username}"))
        .await;

    let (code, _) = send(&base, "hello").await;
    assert_eq!(code, 200);
    fake.frame_matching("hello").await;

    let after = status(&base).await;
    assert_eq!(after["username"], username.as_str());
    assert_eq!(after["attempt_id"], current["attempt_id"]);
}

#[tokio::test]
async fn upstream_close_resets_session() {
    let mut fake = spawn_fake(LoginReply::Fixed(r#"]{"assertion":"tok123"}"#), None).await;
    let base = spawn_relay(&fake).await;

    connect(&base, "alice", "secret").await;
    assert_eq!(fake.next_frame().await, "|/trn alice,0,tok123");
    wait_for_state(&base, "authenticated").await;

    let (code, _) = send(&base, DROP_CONNECTION).await;
    assert_eq!(code, 200);

    let current = wait_for_state(&base, "disconnected").await;
    assert_eq!(current["authenticated"], false);
    assert!(current["last_error"].as_str().unwrap().contains("closed"));

    let (code, body) = send(&base, "/cmd rooms").await;
    assert_eq!(code, 400);
    assert_eq!(body, "Not connected to Showdown");
}

#[tokio::test]
async fn disconnect_drops_the_session() {
    let mut fake = spawn_fake(LoginReply::Fixed(r#"]{"assertion":"tok123"}"#), None).await;
    let base = spawn_relay(&fake).await;

    connect(&base, "alice", "secret").await;
    assert_eq!(fake.next_frame().await, "|/trn alice,0,tok123");
    wait_for_state(&base, "authenticated").await;

    let (code, body) = post_json(&base, "/disconnect", json!({})).await;
    assert_eq!(code, 200);
    assert_eq!(body, "Disconnected from Showdown");
    assert_eq!(status(&base).await["state"], "disconnected");

    let (code, body) = send(&base, "/cmd rooms").await;
    assert_eq!(code, 400);
    assert_eq!(body, "Not connected to Showdown");
}

#[tokio::test]
async fn observer_receives_login_events() {
    let fake = spawn_fake(LoginReply::Fixed(r#"]{"assertion":"tok123"}"#), None).await;
    let base = spawn_relay(&fake).await;
    let ws_url = format!("{}/ws", base.replacen("http://", "ws://", 1));

    let (mut observer, _) = tokio_tungstenite::connect_async(ws_url).await.unwrap();
    let subscribe = json!({
        "id": "sub-1",
        "type": "command",
        "payload": { "command": "subscribe", "topics": ["*"] }
    });
    observer
        .send(ObserverMessage::text(subscribe.to_string()))
        .await
        .unwrap();

    let reply = next_json(&mut observer).await;
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["id"], "sub-1");
    assert_eq!(reply["payload"]["subscribed"], json!(["session", "upstream", "outbound"]));

    let (code, _) = connect(&base, "alice", "secret").await;
    assert_eq!(code, 200);

    let mut saw_challenge = false;
    loop {
        let event = next_json(&mut observer).await;
        assert_eq!(event["type"], "event");
        let payload = &event["payload"];
        if payload["event_type"] == "upstream_frame" && payload["kind"] == "challstr" {
            saw_challenge = true;
        }
        if payload["event_type"] == "login_succeeded" {
            assert_eq!(payload["username"], "alice");
            break;
        }
    }
    assert!(saw_challenge);
}
