//! End-to-end: the sync engine against the in-memory reference server.

use std::future::Future;
use std::time::Duration;

use futures_util::SinkExt;
use reqwest::Client;
use tokio_tungstenite::tungstenite::Message;

use roomchat_client::directory::UNKNOWN_USER;
use roomchat_client::{
    ClientConfig, ClientError, HttpSnapshotLoader, SendOutcome, SessionState, SyncEngine,
    register as register_session,
};
use roomchat_types::api::RegisterResponse;
use roomchat_types::models::Message as ChatMessage;

async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(roomchat_server::serve(listener, roomchat_server::new_state()));
    format!("http://127.0.0.1:{}", addr.port())
}

async fn register(server: &str, name: &str) -> u64 {
    Client::new()
        .post(format!("{}/register/{}", server, name))
        .send()
        .await
        .unwrap()
        .json::<RegisterResponse>()
        .await
        .unwrap()
        .user_id
}

async fn create_room(server: &str, user_id: u64, room: &str) {
    let resp = Client::new()
        .post(format!("{}/rooms/{}", server, room))
        .bearer_auth(user_id)
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
}

fn engine_for(server: &str, user_id: u64) -> SyncEngine<HttpSnapshotLoader> {
    let config = ClientConfig::new(server, user_id);
    SyncEngine::new(config.clone(), HttpSnapshotLoader::new(&config))
}

async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}

fn lobby_texts(dir: &roomchat_client::Directory) -> Vec<String> {
    dir.get_room("lobby")
        .map(|r| r.messages.iter().map(|m| m.text.clone()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn bootstrap_loads_rooms_and_users_then_opens() {
    let server = spawn_server().await;
    let ada = register(&server, "Ada").await;
    create_room(&server, ada, "lobby").await;

    let engine = engine_for(&server, ada);
    assert_eq!(engine.state(), SessionState::Idle);
    assert_eq!(within(engine.start()).await, SessionState::Open);

    let dir = engine.directory().await;
    assert_eq!(dir.room_names(), vec!["lobby"]);
    assert!(dir.get_room("lobby").unwrap().participant_ids.contains(&ada));
    assert_eq!(dir.user(ada).unwrap().name, "Ada");
}

#[tokio::test]
async fn own_sends_appear_only_after_the_server_echo() {
    let server = spawn_server().await;
    let ada = register(&server, "Ada").await;
    create_room(&server, ada, "lobby").await;

    let engine = engine_for(&server, ada);
    assert_eq!(within(engine.start()).await, SessionState::Open);

    assert_eq!(engine.send(Some("lobby"), "hello").unwrap(), SendOutcome::Sent);
    assert_eq!(engine.send(Some("lobby"), "").unwrap(), SendOutcome::Skipped);
    assert_eq!(engine.send(Some("lobby"), "multi\nline").unwrap(), SendOutcome::Sent);

    within(engine.wait_for(|d| lobby_texts(d).len() == 2)).await;

    let dir = engine.directory().await;
    let room = dir.get_room("lobby").unwrap();
    assert_eq!(
        room.messages,
        vec![
            ChatMessage { user_id: Some(ada), text: "hello".into() },
            ChatMessage { user_id: Some(ada), text: "multi\nline".into() },
        ]
    );
    assert_eq!(dir.author_name(&room.messages[0]), "Ada");
}

#[tokio::test]
async fn late_registered_sender_is_repaired() {
    let server = spawn_server().await;
    let ada = register(&server, "Ada").await;
    create_room(&server, ada, "lobby").await;

    let engine = engine_for(&server, ada);
    assert_eq!(within(engine.start()).await, SessionState::Open);

    // Registered after Ada's bootstrap, so Ada has never seen Grace.
    let grace = register(&server, "Grace").await;
    assert!(!engine.directory().await.has_user(grace));

    let (mut grace_ws, _) =
        tokio_tungstenite::connect_async(format!("{}/{}", server.replace("http", "ws"), grace))
            .await
            .unwrap();
    grace_ws.send(Message::text("lobby\nhi from grace")).await.unwrap();

    within(engine.wait_for(|d| d.has_user(grace))).await;

    let dir = engine.directory().await;
    let room = dir.get_room("lobby").unwrap();
    assert_eq!(room.messages.len(), 1);
    assert_eq!(room.messages[0].user_id, Some(grace));
    assert_eq!(dir.author_name(&room.messages[0]), "Grace");
    assert_ne!(dir.author_name(&room.messages[0]), UNKNOWN_USER);
}

#[tokio::test]
async fn unknown_session_never_opens_and_cannot_send() {
    let server = spawn_server().await;

    // Not registered: snapshots are 401 and the channel upgrade is refused.
    let engine = engine_for(&server, 99);
    assert_eq!(within(engine.start()).await, SessionState::Closed);

    let dir = engine.directory().await;
    assert!(dir.rooms().is_empty());
    assert!(dir.users().is_empty());
    drop(dir);

    assert!(matches!(
        engine.send(Some("lobby"), "hi"),
        Err(ClientError::ChannelNotOpen { state: SessionState::Closed })
    ));
}

#[tokio::test]
async fn client_registration_yields_a_working_session() {
    let server = spawn_server().await;
    let ada = register(&server, "Ada").await;
    create_room(&server, ada, "lobby").await;

    let grace = register_session(&format!("{}/", server), "Grace Hopper").await.unwrap();
    assert_ne!(grace, ada);

    let engine = engine_for(&server, grace);
    assert_eq!(within(engine.start()).await, SessionState::Open);
    assert_eq!(engine.directory().await.user(grace).unwrap().name, "Grace Hopper");

    assert!(matches!(
        register_session(&server, "two\nlines").await,
        Err(ClientError::InvalidName { .. })
    ));
    assert_eq!(engine.directory().await.users().len(), 2);
}
