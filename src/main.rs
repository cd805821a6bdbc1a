mod codec;
mod decoder;
mod hw_state;
mod manager;
mod ndef;
mod smart_poster;
mod types;
mod ws;

use std::net::SocketAddr;

use crossbeam_channel::unbounded;
use log::{error, info};
use tokio::sync::broadcast;

const DEFAULT_ADDR: &str = "127.0.0.1:3500";

#[tokio::main]
async fn main() {
    env_logger::init();
    info!("Starting NFC gateway...");

    let addr: SocketAddr = match std::env::var("NFC_GATEWAY_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
    {
        Ok(addr) => addr,
        Err(err) => {
            error!("Invalid NFC_GATEWAY_ADDR: {}", err);
            return;
        }
    };

    // Channel: WS -> manager (platform signals). Crossbeam, because the
    // manager runs on a blocking OS thread.
    let (signal_tx, signal_rx) = unbounded::<types::IncomingMessage>();

    // Channel: manager -> WS clients (envelopes, driver calls, events).
    let (event_tx, event_rx) = broadcast::channel::<types::OutgoingMessage>(100);

    // The manager thread feeds a crossbeam bridge; a second thread pumps
    // the bridge into the tokio broadcast.
    let event_tx_clone = event_tx.clone();
    std::thread::spawn(move || {
        let (bridge_tx, bridge_rx) = unbounded::<types::OutgoingMessage>();

        std::thread::spawn(move || {
            manager::run(bridge_tx, signal_rx);
        });

        while let Ok(msg) = bridge_rx.recv() {
            let _ = event_tx_clone.send(msg);
        }
    });

    ws::start_server(addr, signal_tx, event_rx).await;
}
