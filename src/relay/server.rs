use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, error, info, warn};

use super::actor::RelayHandle;
use super::types::RelayError;
use crate::config::RelayConfig;
use crate::signaling::{ClientId, Envelope, ErrorCode, OutboundMessage, SignalingMessage};

pub const DEFAULT_RELAY_PORT: u16 = 8081;

const WS_PATH_PREFIX: &str = "/ws/";

/// Shortest heartbeat period; tokio intervals cannot tick at zero.
const MIN_HEARTBEAT: Duration = Duration::from_secs(1);

const MAX_REQUEST_HEAD: usize = 8192;
const HEAD_PEEK_ATTEMPTS: usize = 100;
const HEAD_PEEK_BACKOFF: Duration = Duration::from_millis(10);

pub struct RelayServer {
    listener: TcpListener,
    handle: RelayHandle,
    ping_interval: Duration,
    pong_timeout: Duration,
}

impl RelayServer {
    /// Bind the listener and start the registry actor.
    pub async fn bind(config: &RelayConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).await?;
        info!("Signaling relay listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            handle: RelayHandle::spawn(),
            ping_interval: config.ping_interval.max(MIN_HEARTBEAT),
            pong_timeout: config.pong_timeout.max(MIN_HEARTBEAT),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let handle = self.handle.clone();
            let heartbeat = Heartbeat {
                interval: self.ping_interval,
                timeout: self.pong_timeout,
            };

            tokio::spawn(async move {
                if let Err(e) = serve(stream, addr, handle, heartbeat).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

#[derive(Clone, Copy)]
struct Heartbeat {
    interval: Duration,
    timeout: Duration,
}

/// `/ws/{clientId}` identifies the client up front; any other path waits for
/// a `hello` message.
fn client_id_from_path(path: &str) -> Option<ClientId> {
    let id = ClientId::from(path.strip_prefix(WS_PATH_PREFIX)?.trim_end_matches('/'));
    id.is_valid().then_some(id)
}

/// Plain HTTP requests get the status routes; WebSocket upgrades become
/// signaling connections.
async fn serve(
    stream: TcpStream,
    addr: SocketAddr,
    handle: RelayHandle,
    heartbeat: Heartbeat,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some((head, head_len)) = peek_request_head(&stream).await? else {
        debug!("{} closed before sending a request", addr);
        return Ok(());
    };

    if is_websocket_upgrade(&head) {
        handle_connection(stream, addr, handle, heartbeat).await
    } else {
        serve_http(stream, &head, head_len, &handle).await?;
        Ok(())
    }
}

/// Look at the request head without consuming it, so the WebSocket
/// handshake still reads it in full. Returns the head and its length.
async fn peek_request_head(stream: &TcpStream) -> std::io::Result<Option<(String, usize)>> {
    let mut buf = vec![0u8; MAX_REQUEST_HEAD];
    let mut seen = 0;

    for _ in 0..HEAD_PEEK_ATTEMPTS {
        seen = stream.peek(&mut buf).await?;
        if seen == 0 {
            return Ok(None);
        }
        if let Some(end) = buf[..seen].windows(4).position(|w| w == b"\r\n\r\n") {
            let len = end + 4;
            return Ok(Some((String::from_utf8_lossy(&buf[..len]).into_owned(), len)));
        }
        if seen == buf.len() {
            break;
        }
        tokio::time::sleep(HEAD_PEEK_BACKOFF).await;
    }

    Ok(Some((String::from_utf8_lossy(&buf[..seen]).into_owned(), seen)))
}

fn is_websocket_upgrade(head: &str) -> bool {
    head.lines().skip(1).any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("upgrade")
                && value.to_ascii_lowercase().contains("websocket")
        })
    })
}

async fn serve_http(
    mut stream: TcpStream,
    head: &str,
    head_len: usize,
    handle: &RelayHandle,
) -> std::io::Result<()> {
    // Consume the request so closing the socket does not reset it.
    let mut discard = vec![0u8; head_len];
    stream.read_exact(&mut discard).await?;

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default();
    let path = request_line
        .next()
        .and_then(|target| target.split('?').next())
        .unwrap_or_default();
    debug!("HTTP {} {}", method, path);

    let (status, body) = match (method, path) {
        ("GET", "/health") => (StatusCode::OK, json!({ "status": "healthy" })),
        ("GET", "/") => match handle.stats().await {
            Ok(stats) => (StatusCode::OK, stats.status_body()),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": e.to_string() }),
            ),
        },
        (_, "/" | "/health") => (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "error": "method not allowed" }),
        ),
        _ => (StatusCode::NOT_FOUND, json!({ "error": "not found" })),
    };

    write_json(&mut stream, status, &body).await
}

async fn write_json(
    stream: &mut TcpStream,
    status: StatusCode,
    body: &serde_json::Value,
) -> std::io::Result<()> {
    let body = body.to_string();
    let head = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.shutdown().await
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handle: RelayHandle,
    heartbeat: Heartbeat,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut path = String::new();
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        path = req.uri().path().to_owned();
        Ok::<_, ErrorResponse>(resp)
    })
    .await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    info!("WebSocket connection from {} on {}", addr, path);

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();

    // Everything that can fail is set up before the id is registered, so a
    // registered id always reaches the disconnect below.
    let first_ping = tokio::time::Instant::now() + heartbeat.interval;
    let mut ping_interval = tokio::time::interval_at(first_ping, heartbeat.interval);
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    let mut client_id: Option<ClientId> = None;
    if let Some(id) = client_id_from_path(&path) {
        if let Err(e) = register(&id, &tx, &handle, &mut client_id).await {
            warn!("Could not answer {}: {}", addr, e);
        }
    }

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let ws_msg = Message::Text(msg.into_inner());
                    if ws_tx.send(ws_msg).await.is_err() {
                        break;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("No Pong received, disconnecting {}", addr);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + heartbeat.timeout);
                debug!("Ping sent to {}", addr);
            }

            _ = pong_timeout => {
                warn!("Pong timeout, disconnecting {}", addr);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        let handled =
                            handle_text_message(&text, &tx, &handle, &mut client_id).await;
                        if let Err(e) = handled {
                            warn!("Message handling error: {}", e);
                        }
                    }
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!("Pong received from {}", addr);
                    }
                    Message::Close(_) => {
                        info!("Close received from {}", addr);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    if let Some(id) = client_id {
        handle.disconnect(id).await;
    }

    send_task.abort();
    info!("WebSocket disconnected: {}", addr);

    Ok(())
}

async fn register(
    id: &ClientId,
    tx: &mpsc::UnboundedSender<OutboundMessage>,
    handle: &RelayHandle,
    client_id: &mut Option<ClientId>,
) -> Result<(), serde_json::Error> {
    match handle.connect(id.clone(), tx.clone()).await {
        Ok(()) => *client_id = Some(id.clone()),
        Err(e) => reply_error(tx, &e)?,
    }
    Ok(())
}

fn reply_error(
    tx: &mpsc::UnboundedSender<OutboundMessage>,
    err: &RelayError,
) -> Result<(), serde_json::Error> {
    reply(tx, SignalingMessage::error(err.code(), err.to_string()))
}

fn reply(
    tx: &mpsc::UnboundedSender<OutboundMessage>,
    msg: SignalingMessage,
) -> Result<(), serde_json::Error> {
    let _ = tx.send(msg.to_outbound()?);
    Ok(())
}

async fn handle_text_message(
    text: &str,
    tx: &mpsc::UnboundedSender<OutboundMessage>,
    handle: &RelayHandle,
    client_id: &mut Option<ClientId>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let envelope = match Envelope::parse(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Dropping malformed message: {}", e);
            let detail = format!("Invalid message: {}", e);
            reply(tx, SignalingMessage::error(ErrorCode::MalformedMessage, detail))?;
            return Ok(());
        }
    };

    let msg = match envelope.message() {
        SignalingMessage::Hello { client_id: id } => {
            if let Some(current) = client_id.clone() {
                reply_error(tx, &RelayError::DuplicateClient(current))?;
            } else if !id.is_valid() {
                reply(
                    tx,
                    SignalingMessage::error(ErrorCode::MalformedMessage, "Invalid client id"),
                )?;
            } else {
                register(id, tx, handle, client_id).await?;
            }
            return Ok(());
        }
        other => other,
    };

    let Some(sender) = client_id.as_ref() else {
        reply_error(tx, &RelayError::NotRegistered)?;
        return Ok(());
    };

    debug!("Received from {}: {}", sender, msg.kind());

    if msg.is_directed() {
        handle.forward(sender.clone(), envelope).await;
        return Ok(());
    }

    match msg {
        SignalingMessage::Join { room } => {
            if let Err(e) = handle.join(sender.clone(), room.clone()).await {
                reply_error(tx, &e)?;
            }
        }

        SignalingMessage::Leave => {
            if let Err(e) = handle.leave(sender.clone()).await {
                reply_error(tx, &e)?;
            }
        }

        other => {
            warn!("Dropping relay-only message {} from {}", other.kind(), sender);
        }
    }

    Ok(())
}
