// src/ws.rs
use crate::types::{IncomingMessage, OutgoingMessage};
use crossbeam_channel::Sender;
use futures::{SinkExt, StreamExt};
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use warp::Filter;

pub async fn start_server(
    addr: SocketAddr,
    manager_tx: Sender<IncomingMessage>,
    mut manager_event_rx: broadcast::Receiver<OutgoingMessage>,
) {
    // Shared broadcast channel for WS clients
    let (ws_tx, _) = broadcast::channel::<OutgoingMessage>(32);
    let ws_tx = Arc::new(ws_tx);

    // 1. Forward manager output -> all WS clients
    let ws_tx_clone = ws_tx.clone();
    tokio::spawn(async move {
        while let Ok(msg) = manager_event_rx.recv().await {
            let _ = ws_tx_clone.send(msg);
        }
    });

    // 2. WS route at the root path
    let ws_route = warp::path::end()
        .and(warp::ws())
        .map(move |ws: warp::ws::Ws| {
            let manager_tx = manager_tx.clone();
            let ws_tx = ws_tx.clone();

            ws.on_upgrade(move |socket| handle_connection(socket, manager_tx, ws_tx))
        });

    let routes = ws_route.with(warp::cors().allow_any_origin());

    info!("WebSocket server running on ws://{}", addr);
    warp::serve(routes).run(addr).await;
}

async fn handle_connection(
    ws: warp::ws::WebSocket,
    manager_tx: Sender<IncomingMessage>,
    ws_tx: Arc<broadcast::Sender<OutgoingMessage>>,
) {
    let (mut client_ws_tx, mut client_ws_rx) = ws.split();
    let mut rx_broadcast = ws_tx.subscribe();

    // Broadcasts -> this client
    tokio::spawn(async move {
        while let Ok(msg) = rx_broadcast.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(err) => {
                    warn!("Failed to serialize outgoing message: {}", err);
                    continue;
                }
            };
            if client_ws_tx
                .send(warp::ws::Message::text(json))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Platform signals from this client -> manager thread. Frames that
    // do not deserialize at all are logged and dropped here; shapeless
    // discovery payloads still parse and degrade inside the dispatcher.
    while let Some(result) = client_ws_rx.next().await {
        if let Ok(msg) = result {
            if msg.is_text() {
                if let Ok(text) = msg.to_str() {
                    match serde_json::from_str::<IncomingMessage>(text) {
                        Ok(parsed) => {
                            let _ = manager_tx.send(parsed);
                        }
                        Err(err) => warn!("Dropping unparseable frame: {}", err),
                    }
                }
            }
        }
    }
}
