//! Manual relay client: registers an id, joins a room and prints everything
//! the relay sends. Lines typed on stdin are sent verbatim as JSON.
//!
//! usage: relay_cli <room> [client-id] [relay-url]

use std::error::Error;

use futures_util::{SinkExt, StreamExt};
use pairlink::config::CoordinatorConfig;
use pairlink::signaling::{ClientId, RoomName, SignalingMessage};
use tokio::io::{self, AsyncBufReadExt};
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let Some(room) = args.next() else {
        eprintln!("usage: relay_cli <room> [client-id] [relay-url]");
        std::process::exit(2);
    };
    let client_id = args.next().map(ClientId::from).unwrap_or_else(ClientId::generate);
    let relay_url = args
        .next()
        .unwrap_or_else(|| CoordinatorConfig::from_env().relay_url);

    let url = format!("{}/ws/{}", relay_url.trim_end_matches('/'), client_id);
    let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    info!("Connected to {} as {}", url, client_id);

    let join = SignalingMessage::Join {
        room: RoomName::from(room.as_str()),
    };
    ws_tx
        .send(Message::Text(serde_json::to_string(&join)?.into()))
        .await?;

    tokio::spawn(async move {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<SignalingMessage>(&text) {
                    Ok(parsed) => println!("< {}: {}", parsed.kind(), text),
                    Err(_) => println!("< (unparsed) {}", text),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
            }
        }
        println!("Relay closed the connection");
        std::process::exit(0);
    });

    println!("Type a JSON message and press Enter (Ctrl+D to leave):");
    let mut stdin = io::BufReader::new(io::stdin()).lines();
    while let Ok(Some(line)) = stdin.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        ws_tx.send(Message::Text(line.to_string().into())).await?;
    }

    ws_tx
        .send(Message::Text(serde_json::to_string(&SignalingMessage::Leave)?.into()))
        .await?;
    ws_tx.send(Message::Close(None)).await?;
    Ok(())
}
