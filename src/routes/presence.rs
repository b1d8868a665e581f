use axum::{
    extract::{
        ws::{Message, WebSocket},
        WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::player::SessionId;
use crate::services::movement::Bounds;
use crate::services::presence::PresenceSession;
use crate::services::store::Players;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    Join {
        #[serde(default)]
        name: Option<String>,
    },
    Move { keys: Vec<String> },
    Leave,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage<'a> {
    Welcome { id: SessionId, bounds: Bounds },
    Players { players: &'a Players },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Extension(app_state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = PresenceSession::new(app_state.store.clone(), app_state.grid);
    let mut subscription = app_state.store.subscribe().await;
    let id = session.id();

    info!(session = %id, subscribers = app_state.store.subscriber_count(), "client connected");

    session.observe(&subscription.initial);
    let welcome = ServerMessage::Welcome { id, bounds: app_state.grid.bounds };
    if let Err(e) = send(&mut sender, &welcome).await {
        warn!(session = %id, error = %e, "failed to send welcome");
        return;
    }
    if let Err(e) = send(&mut sender, &ServerMessage::Players { players: &subscription.initial }).await {
        warn!(session = %id, error = %e, "failed to send initial players");
        return;
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let msg = match incoming {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!(session = %id, error = %e, "websocket receive error");
                        break;
                    }
                    None => break,
                };
                match msg {
                    Message::Text(text) => {
                        let Some(client_msg) = parse(&text) else {
                            warn!(session = %id, text = %text, "unparseable client message");
                            continue;
                        };
                        if dispatch(&mut session, client_msg).await == Flow::Stop {
                            break;
                        }
                    }
                    Message::Close(_) => {
                        debug!(session = %id, "client sent close");
                        break;
                    }
                    other => debug!(session = %id, message = ?other, "ignoring non-text message"),
                }
            }
            update = subscription.next() => {
                let Some(snapshot) = update else { break };
                session.observe(&snapshot);
                if let Err(e) = send(&mut sender, &ServerMessage::Players { players: &snapshot }).await {
                    warn!(session = %id, error = %e, "failed to push snapshot");
                    break;
                }
            }
        }
    }

    // best effort: the client may vanish without a Leave
    session.leave().await;
    info!(session = %id, "client disconnected");
}

pub fn parse(text: &str) -> Option<ClientMessage> {
    serde_json::from_str(text).ok()
}

/// Applies one client message to the session.
pub async fn dispatch(session: &mut PresenceSession, msg: ClientMessage) -> Flow {
    match msg {
        ClientMessage::Join { name } => {
            session.join(name).await;
            Flow::Continue
        }
        ClientMessage::Move { keys } => {
            if let Some(record) = session.handle_keys(keys.iter().map(String::as_str)).await {
                debug!(session = %session.id(), x = record.x, y = record.y, "moved");
            }
            Flow::Continue
        }
        ClientMessage::Leave => {
            session.leave().await;
            Flow::Stop
        }
    }
}

async fn send(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage<'_>,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridSettings;
    use crate::services::store::PresenceStore;

    fn session(store: &PresenceStore) -> PresenceSession {
        PresenceSession::new(
            store.clone(),
            GridSettings {
                bounds: Bounds { width: 500, height: 500, box_size: 50 },
                step: 10,
                start_x: 100,
                start_y: 100,
            },
        )
    }

    #[test]
    fn parses_client_messages() {
        assert_eq!(
            parse(r#"{"type":"Join","payload":{"name":"ann"}}"#),
            Some(ClientMessage::Join { name: Some("ann".into()) })
        );
        assert_eq!(parse(r#"{"type":"Join","payload":{}}"#), Some(ClientMessage::Join { name: None }));
        assert_eq!(
            parse(r#"{"type":"Move","payload":{"keys":["ArrowUp","ArrowLeft"]}}"#),
            Some(ClientMessage::Move { keys: vec!["ArrowUp".into(), "ArrowLeft".into()] })
        );
        assert_eq!(parse(r#"{"type":"Leave"}"#), Some(ClientMessage::Leave));
        assert_eq!(parse(r#"{"type":"Teleport","payload":{"x":1}}"#), None);
        assert_eq!(parse("not json"), None);
    }

    #[test]
    fn players_message_shape() {
        let store_players = Players::new();
        let json = serde_json::to_value(ServerMessage::Players { players: &store_players }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "Players", "payload": { "players": {} } }));
    }

    #[test]
    fn welcome_message_shape() {
        let id = crate::models::player::new_session_id();
        let bounds = Bounds { width: 500, height: 400, box_size: 50 };
        let text = serde_json::to_string(&ServerMessage::Welcome { id, bounds }).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "Welcome",
                "payload": { "id": id.to_string(), "bounds": { "width": 500, "height": 400, "box_size": 50 } }
            })
        );
    }

    mod socket {
        use crate::config::GridSettings;
        use crate::models::player::SessionId;
        use crate::services::movement::Bounds;
        use crate::services::store::PresenceStore;
        use crate::state::AppState;
        use futures::{SinkExt, StreamExt};
        use serde_json::{json, Value};
        use std::sync::Arc;
        use std::net::SocketAddr;
        use std::time::Duration;
        use tokio::net::{TcpListener, TcpStream};
        use tokio_tungstenite::{
            connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
        };

        type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

        const WAIT: Duration = Duration::from_secs(2);

        async fn start_server() -> (SocketAddr, Arc<AppState>) {
            let app_state = Arc::new(AppState {
                store: PresenceStore::new(64),
                grid: GridSettings {
                    bounds: Bounds { width: 500, height: 500, box_size: 50 },
                    step: 10,
                    start_x: 100,
                    start_y: 100,
                },
            });
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let router = crate::routes::app(app_state.clone());
            tokio::spawn(async move {
                axum::serve(listener, router.into_make_service()).await.unwrap();
            });
            (addr, app_state)
        }

        async fn next_json(client: &mut Client) -> Value {
            loop {
                let msg = tokio::time::timeout(WAIT, client.next())
                    .await
                    .expect("timed out waiting for server message")
                    .expect("socket closed")
                    .unwrap();
                if let WsMessage::Text(text) = msg {
                    return serde_json::from_str(&text).unwrap();
                }
            }
        }

        /// Connects and consumes the handshake, returning the session id.
        async fn connect(addr: SocketAddr) -> (Client, String) {
            let (mut client, _) = connect_async(format!("ws://{addr}/api/ws")).await.unwrap();
            let welcome = next_json(&mut client).await;
            assert_eq!(welcome["type"], "Welcome");
            assert_eq!(welcome["payload"]["bounds"], json!({ "width": 500, "height": 500, "box_size": 50 }));
            let id = welcome["payload"]["id"].as_str().unwrap().to_string();
            let players = next_json(&mut client).await;
            assert_eq!(players["type"], "Players");
            (client, id)
        }

        /// Reads snapshots until one carries `id` and satisfies `pred`.
        async fn wait_for_player<F>(client: &mut Client, id: &str, pred: F) -> Value
        where
            F: Fn(&Value) -> bool,
        {
            loop {
                let msg = next_json(client).await;
                if msg["type"] != "Players" {
                    continue;
                }
                let record = &msg["payload"]["players"][id];
                if !record.is_null() && pred(record) {
                    return record.clone();
                }
            }
        }

        async fn send_json(client: &mut Client, value: Value) {
            client.send(WsMessage::Text(value.to_string())).await.unwrap();
        }

        fn right() -> Value {
            json!({ "type": "Move", "payload": { "keys": ["ArrowRight"] } })
        }

        #[tokio::test]
        async fn back_to_back_moves_all_apply() {
            let (addr, app_state) = start_server().await;
            let (mut client, id) = connect(addr).await;

            send_json(&mut client, json!({ "type": "Join", "payload": { "name": "ann" } })).await;
            let joined = wait_for_player(&mut client, &id, |_| true).await;
            assert_eq!(joined, json!({ "x": 100, "y": 100, "color": joined["color"], "name": "ann" }));

            for _ in 0..3 {
                send_json(&mut client, right()).await;
            }
            wait_for_player(&mut client, &id, |r| r["x"] == 130).await;

            let uuid: SessionId = id.parse().unwrap();
            let snapshot = app_state.store.snapshot().await;
            assert_eq!((snapshot[&uuid].x, snapshot[&uuid].y), (130, 100));
        }

        #[tokio::test]
        async fn other_clients_see_moves() {
            let (addr, _) = start_server().await;
            let (mut mover, mover_id) = connect(addr).await;
            let (mut watcher, _) = connect(addr).await;

            send_json(&mut mover, json!({ "type": "Join", "payload": {} })).await;
            wait_for_player(&mut mover, &mover_id, |_| true).await;
            send_json(&mut mover, right()).await;

            let seen = wait_for_player(&mut watcher, &mover_id, |r| r["x"] == 110).await;
            assert_eq!(seen["y"], 100);
        }

        #[tokio::test]
        async fn dropped_client_is_removed() {
            let (addr, app_state) = start_server().await;
            let (mut client, id) = connect(addr).await;
            send_json(&mut client, json!({ "type": "Join", "payload": {} })).await;
            wait_for_player(&mut client, &id, |_| true).await;
            let uuid: SessionId = id.parse().unwrap();
            assert!(app_state.store.snapshot().await.contains_key(&uuid));

            // no Leave, no close frame
            drop(client);

            let gone = tokio::time::timeout(WAIT, async {
                while app_state.store.snapshot().await.contains_key(&uuid) {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await;
            assert!(gone.is_ok(), "record still present after disconnect");
        }
    }

    #[tokio::test]
    async fn dispatch_drives_lifecycle() {
        let store = PresenceStore::new(16);
        let mut session = session(&store);
        let id = session.id();

        assert_eq!(dispatch(&mut session, ClientMessage::Move { keys: vec!["ArrowDown".into()] }).await, Flow::Continue);
        assert!(store.snapshot().await.is_empty());

        dispatch(&mut session, ClientMessage::Join { name: None }).await;
        session.observe(&store.snapshot().await);
        dispatch(&mut session, ClientMessage::Move { keys: vec!["ArrowDown".into()] }).await;
        assert_eq!(store.snapshot().await[&id].y, 110);

        assert_eq!(dispatch(&mut session, ClientMessage::Leave).await, Flow::Stop);
        assert!(!store.snapshot().await.contains_key(&id));
    }
}
