use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::capability::{SignalingConnector, SignalingError, SignalingLink};
use super::event::SignalingEventSender;
use crate::signaling::{ClientId, SignalingMessage};

/// Connects to the relay over WebSocket at `{base_url}/ws/{clientId}`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: String,
}

impl WsConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, client_id: &ClientId) -> String {
        format!("{}/ws/{}", self.base_url.trim_end_matches('/'), client_id)
    }
}

#[async_trait]
impl SignalingConnector for WsConnector {
    async fn connect(
        &self,
        client_id: &ClientId,
        events: SignalingEventSender,
    ) -> Result<Box<dyn SignalingLink>, SignalingError> {
        let url = self.url_for(client_id);
        info!("Connecting to relay: {}", url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| SignalingError::Connect(e.to_string()))?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if ws_tx.send(msg).await.is_err() || closing {
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_rx.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<SignalingMessage>(&text) {
                            Ok(message) => events.inbound(message),
                            Err(e) => warn!("Ignoring malformed relay message: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            debug!("Relay connection closed");
            events.closed();
        });

        Ok(Box::new(WsLink { tx, reader }))
    }
}

struct WsLink {
    tx: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
}

impl SignalingLink for WsLink {
    fn send(&mut self, msg: &SignalingMessage) -> Result<(), SignalingError> {
        let json = serde_json::to_string(msg)?;
        self.tx
            .send(Message::Text(json.into()))
            .map_err(|_| SignalingError::Closed)
    }

    fn close(&mut self) {
        // Queued messages (e.g. `leave`) go out before the close frame.
        let _ = self.tx.send(Message::Close(None));
        self.reader.abort();
    }
}

impl Drop for WsLink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_appends_client_id() {
        let connector = WsConnector::new("ws://127.0.0.1:8081/");
        assert_eq!(
            connector.url_for(&ClientId::from("client-abc")),
            "ws://127.0.0.1:8081/ws/client-abc"
        );
    }
}
