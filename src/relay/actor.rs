use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::types::{ClientState, Registry, RelayError, RelayStats, Room, RoomStats};
use crate::signaling::{ClientId, Envelope, OutboundMessage, RoomName, SignalingMessage};

/// Commands sent to the registry actor. The actor processes them one at a
/// time, so every membership snapshot is consistent with all joins and
/// leaves before it.
pub(crate) enum RelayCommand {
    Connect {
        client_id: ClientId,
        tx: mpsc::UnboundedSender<OutboundMessage>,
        reply: oneshot::Sender<Result<(), RelayError>>,
    },
    Join {
        client_id: ClientId,
        room: RoomName,
        reply: oneshot::Sender<Result<(), RelayError>>,
    },
    Forward {
        from: ClientId,
        envelope: Envelope,
    },
    Leave {
        client_id: ClientId,
        reply: oneshot::Sender<Result<(), RelayError>>,
    },
    Disconnect {
        client_id: ClientId,
    },
    Stats {
        reply: oneshot::Sender<RelayStats>,
    },
}

pub(crate) async fn registry_actor(mut rx: mpsc::Receiver<RelayCommand>) {
    let mut registry = Registry::default();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RelayCommand::Connect {
                client_id,
                tx,
                reply,
            } => {
                let _ = reply.send(registry.connect(client_id, tx));
            }

            RelayCommand::Join {
                client_id,
                room,
                reply,
            } => {
                let _ = reply.send(registry.join(&client_id, room));
            }

            RelayCommand::Forward { from, envelope } => registry.forward(&from, envelope),

            RelayCommand::Leave { client_id, reply } => {
                let result = match registry.leave(&client_id) {
                    Some(_) => Ok(()),
                    None => Err(RelayError::RoomNotFound(client_id)),
                };
                let _ = reply.send(result);
            }

            RelayCommand::Disconnect { client_id } => registry.disconnect(&client_id),

            RelayCommand::Stats { reply } => {
                let _ = reply.send(registry.stats());
            }
        }
    }
}

impl Registry {
    fn connect(
        &mut self,
        client_id: ClientId,
        tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<(), RelayError> {
        if self.clients.contains_key(&client_id) {
            warn!("Rejecting duplicate client {}", client_id);
            return Err(RelayError::DuplicateClient(client_id));
        }

        self.clients
            .insert(client_id.clone(), ClientState { tx, room: None });
        info!(
            "Client {} connected. Total connections: {}",
            client_id,
            self.clients.len()
        );
        Ok(())
    }

    fn join(&mut self, client_id: &ClientId, room: RoomName) -> Result<(), RelayError> {
        if room.is_empty() {
            return Err(RelayError::InvalidRoom);
        }

        let current_room = match self.clients.get(client_id) {
            Some(client) => client.room.clone(),
            None => return Err(RelayError::NotRegistered),
        };
        // A client belongs to at most one room: joining elsewhere is a move.
        if current_room.is_some() {
            self.leave(client_id);
        }

        let members = self.rooms.entry(room.clone()).or_default();
        let existing_members = members.members.clone();
        members.members.push(client_id.clone());
        if let Some(client) = self.clients.get_mut(client_id) {
            client.room = Some(room.clone());
        }

        // The joiner's snapshot is queued before any peer hears about it.
        self.send_to(
            client_id,
            &SignalingMessage::RoomJoined {
                room: room.clone(),
                existing_members: existing_members.clone(),
            },
        );
        let joined = SignalingMessage::UserJoined {
            client_id: client_id.clone(),
        };
        if let Some(msg) = serialize(&joined) {
            for member in &existing_members {
                self.send_raw(member, msg.clone());
            }
        }

        info!(
            "Client {} joined room {} ({} existing)",
            client_id,
            room,
            existing_members.len()
        );
        Ok(())
    }

    fn forward(&mut self, from: &ClientId, envelope: Envelope) {
        let message = envelope.message();
        let kind = message.kind();
        let Some(target) = message.target().cloned() else {
            warn!("Dropping non-directed {} from {}", kind, from);
            return;
        };

        let sender_room = self.clients.get(from).and_then(|c| c.room.as_ref());
        let target_room = self.clients.get(&target).and_then(|c| c.room.as_ref());
        match (sender_room, target_room) {
            (Some(a), Some(b)) if a == b => {}
            (_, None) if !self.clients.contains_key(&target) => {
                warn!(
                    "Dropping {} from {}: target {} not connected",
                    kind,
                    from,
                    target
                );
                return;
            }
            _ => {
                warn!(
                    "Dropping {} from {}: target {} not in the same room",
                    kind,
                    from,
                    target
                );
                return;
            }
        }

        match envelope.stamped_outbound(from) {
            Ok(msg) => {
                self.send_raw(&target, msg);
                info!("Forwarded {} from {} to {}", kind, from, target);
            }
            Err(e) => warn!("Failed to encode {} from {}: {}", kind, from, e),
        }
    }

    /// Remove the client from its room and tell whoever is left. Returns the
    /// room it was in, if any.
    fn leave(&mut self, client_id: &ClientId) -> Option<RoomName> {
        let room_name = self.clients.get_mut(client_id)?.room.take()?;

        let remaining = match self.rooms.get_mut(&room_name) {
            Some(room) => {
                room.members.retain(|m| m != client_id);
                room.members.clone()
            }
            None => Vec::new(),
        };

        if remaining.is_empty() {
            self.rooms.remove(&room_name);
            info!("Room {} removed (empty)", room_name);
        } else {
            let left = SignalingMessage::UserLeft {
                client_id: client_id.clone(),
            };
            if let Some(msg) = serialize(&left) {
                for member in &remaining {
                    self.send_raw(member, msg.clone());
                }
            }
        }

        info!("Client {} left room {}", client_id, room_name);
        Some(room_name)
    }

    fn disconnect(&mut self, client_id: &ClientId) {
        self.leave(client_id);
        if self.clients.remove(client_id).is_some() {
            info!(
                "Client {} cleanup complete. Total connections: {}",
                client_id,
                self.clients.len()
            );
        }
    }

    fn stats(&self) -> RelayStats {
        let mut rooms: Vec<RoomStats> = self
            .rooms
            .iter()
            .map(|(name, Room { members })| RoomStats {
                name: name.clone(),
                members: members.clone(),
            })
            .collect();
        rooms.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));

        RelayStats {
            active_connections: self.clients.len(),
            rooms,
        }
    }

    fn send_to(&self, client_id: &ClientId, message: &SignalingMessage) {
        if let Some(msg) = serialize(message) {
            self.send_raw(client_id, msg);
        }
    }

    fn send_raw(&self, client_id: &ClientId, msg: OutboundMessage) {
        if let Some(client) = self.clients.get(client_id) {
            if client.tx.send(msg).is_err() {
                debug!("Outbound channel of {} already closed", client_id);
            }
        }
    }
}

fn serialize(message: &SignalingMessage) -> Option<OutboundMessage> {
    match message.to_outbound() {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("Failed to serialize {}: {}", message.kind(), e);
            None
        }
    }
}

/// Handle to communicate with the registry actor
#[derive(Clone)]
pub struct RelayHandle {
    pub(crate) tx: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// Spawn a fresh registry actor on the current runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<RelayCommand>(1024);
        tokio::spawn(registry_actor(rx));
        Self { tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RelayCommand,
    ) -> Result<T, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| RelayError::Internal("actor channel closed".to_string()))?;
        reply_rx
            .await
            .map_err(|_| RelayError::Internal("actor channel closed".to_string()))
    }

    /// Register a connection under `client_id`; fails if the id is taken.
    pub async fn connect(
        &self,
        client_id: ClientId,
        tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<(), RelayError> {
        self.request(|reply| RelayCommand::Connect {
            client_id,
            tx,
            reply,
        })
        .await?
    }

    /// Join `room`, creating it if needed. The joiner receives `room-joined`
    /// before any existing member receives `user-joined`.
    pub async fn join(&self, client_id: ClientId, room: RoomName) -> Result<(), RelayError> {
        self.request(|reply| RelayCommand::Join {
            client_id,
            room,
            reply,
        })
        .await?
    }

    /// Route a directed message to its target with `from` set to the sender.
    /// Undeliverable messages are logged and dropped.
    pub async fn forward(&self, from: ClientId, envelope: impl Into<Envelope>) {
        let envelope = envelope.into();
        let _ = self.tx.send(RelayCommand::Forward { from, envelope }).await;
    }

    /// Leave the current room
    pub async fn leave(&self, client_id: ClientId) -> Result<(), RelayError> {
        self.request(|reply| RelayCommand::Leave { client_id, reply })
            .await?
    }

    /// Drop the connection: same room cleanup as `leave`, then forget the id.
    pub async fn disconnect(&self, client_id: ClientId) {
        let _ = self.tx.send(RelayCommand::Disconnect { client_id }).await;
    }

    pub async fn stats(&self) -> Result<RelayStats, RelayError> {
        self.request(|reply| RelayCommand::Stats { reply }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::SessionDescription;

    type Inbox = mpsc::UnboundedReceiver<OutboundMessage>;

    async fn connect(handle: &RelayHandle, id: &str) -> Inbox {
        let (tx, rx) = mpsc::unbounded_channel();
        handle.connect(ClientId::from(id), tx).await.unwrap();
        rx
    }

    fn next(inbox: &mut Inbox) -> SignalingMessage {
        let msg = inbox.try_recv().expect("expected a queued message");
        serde_json::from_str(msg.as_str()).unwrap()
    }

    fn assert_empty(inbox: &mut Inbox) {
        assert!(inbox.try_recv().is_err(), "unexpected queued message");
    }

    fn offer_to(target: &str) -> SignalingMessage {
        SignalingMessage::Offer {
            sdp: SessionDescription::offer("v=0"),
            from: None,
            target: ClientId::from(target),
        }
    }

    #[tokio::test]
    async fn duplicate_client_is_rejected() {
        let handle = RelayHandle::spawn();
        let _a = connect(&handle, "A").await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = handle.connect(ClientId::from("A"), tx).await.unwrap_err();
        assert!(matches!(err, RelayError::DuplicateClient(_)));
        assert_eq!(handle.stats().await.unwrap().active_connections, 1);
    }

    #[tokio::test]
    async fn first_joiner_sees_empty_room() {
        let handle = RelayHandle::spawn();
        let mut a = connect(&handle, "A").await;

        handle.join(ClientId::from("A"), RoomName::from("r1")).await.unwrap();

        assert_eq!(
            next(&mut a),
            SignalingMessage::RoomJoined {
                room: RoomName::from("r1"),
                existing_members: vec![],
            }
        );
        assert_empty(&mut a);
    }

    #[tokio::test]
    async fn joiner_gets_existing_members_in_join_order() {
        let handle = RelayHandle::spawn();
        let mut a = connect(&handle, "A").await;
        let mut b = connect(&handle, "B").await;
        let mut c = connect(&handle, "C").await;

        handle.join(ClientId::from("A"), RoomName::from("r1")).await.unwrap();
        handle.join(ClientId::from("B"), RoomName::from("r1")).await.unwrap();
        handle.join(ClientId::from("C"), RoomName::from("r1")).await.unwrap();

        next(&mut a);
        assert_eq!(
            next(&mut a),
            SignalingMessage::UserJoined {
                client_id: ClientId::from("B")
            }
        );
        assert_eq!(
            next(&mut a),
            SignalingMessage::UserJoined {
                client_id: ClientId::from("C")
            }
        );

        assert_eq!(
            next(&mut b),
            SignalingMessage::RoomJoined {
                room: RoomName::from("r1"),
                existing_members: vec![ClientId::from("A")],
            }
        );
        assert_eq!(
            next(&mut c),
            SignalingMessage::RoomJoined {
                room: RoomName::from("r1"),
                existing_members: vec![ClientId::from("A"), ClientId::from("B")],
            }
        );
        // Never notified of its own join
        assert_empty(&mut c);
    }

    #[tokio::test]
    async fn empty_room_name_is_rejected() {
        let handle = RelayHandle::spawn();
        let mut a = connect(&handle, "A").await;

        let err = handle
            .join(ClientId::from("A"), RoomName::from("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidRoom));
        assert_empty(&mut a);
    }

    #[tokio::test]
    async fn joining_another_room_moves_the_client() {
        let handle = RelayHandle::spawn();
        let mut a = connect(&handle, "A").await;
        let mut b = connect(&handle, "B").await;

        handle.join(ClientId::from("A"), RoomName::from("r1")).await.unwrap();
        handle.join(ClientId::from("B"), RoomName::from("r1")).await.unwrap();
        handle.join(ClientId::from("B"), RoomName::from("r2")).await.unwrap();

        next(&mut a);
        next(&mut a);
        assert_eq!(
            next(&mut a),
            SignalingMessage::UserLeft {
                client_id: ClientId::from("B")
            }
        );
        next(&mut b);
        assert_eq!(
            next(&mut b),
            SignalingMessage::RoomJoined {
                room: RoomName::from("r2"),
                existing_members: vec![],
            }
        );

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.room("r1").unwrap().members, vec![ClientId::from("A")]);
        assert_eq!(stats.room("r2").unwrap().members, vec![ClientId::from("B")]);
    }

    #[tokio::test]
    async fn offer_is_forwarded_with_stamped_sender() {
        let handle = RelayHandle::spawn();
        let mut a = connect(&handle, "A").await;
        let mut b = connect(&handle, "B").await;
        handle.join(ClientId::from("A"), RoomName::from("r1")).await.unwrap();
        handle.join(ClientId::from("B"), RoomName::from("r1")).await.unwrap();
        next(&mut a);
        next(&mut a);
        next(&mut b);

        let forged = match offer_to("A") {
            SignalingMessage::Offer { sdp, target, .. } => SignalingMessage::Offer {
                sdp,
                from: Some(ClientId::from("mallory")),
                target,
            },
            other => other,
        };
        handle.forward(ClientId::from("B"), forged).await;
        handle.stats().await.unwrap();

        let received = next(&mut a);
        assert_eq!(received.sender(), Some(&ClientId::from("B")));
        assert_empty(&mut b);
    }

    #[tokio::test]
    async fn forwarded_payload_is_delivered_verbatim() {
        let handle = RelayHandle::spawn();
        let mut a = connect(&handle, "A").await;
        let mut b = connect(&handle, "B").await;
        handle.join(ClientId::from("A"), RoomName::from("r1")).await.unwrap();
        handle.join(ClientId::from("B"), RoomName::from("r1")).await.unwrap();
        while a.try_recv().is_ok() {}
        while b.try_recv().is_ok() {}

        let text = r#"{"type":"ice-candidate","target":"A","candidate":{"candidate":"candidate:1","relayProtocol":"udp"},"seq":4}"#;
        handle.forward(ClientId::from("B"), Envelope::parse(text).unwrap()).await;
        handle.stats().await.unwrap();

        let raw = a.try_recv().expect("expected a queued message");
        let delivered: serde_json::Value = serde_json::from_str(raw.as_str()).unwrap();
        assert_eq!(delivered["from"], "B");
        assert_eq!(delivered["seq"], 4);
        assert_eq!(delivered["candidate"]["relayProtocol"], "udp");
    }

    #[tokio::test]
    async fn directed_message_to_absent_target_is_dropped() {
        let handle = RelayHandle::spawn();
        let mut a = connect(&handle, "A").await;
        let mut b = connect(&handle, "B").await;
        let mut c = connect(&handle, "C").await;
        handle.join(ClientId::from("A"), RoomName::from("r1")).await.unwrap();
        handle.join(ClientId::from("B"), RoomName::from("r1")).await.unwrap();
        handle.join(ClientId::from("C"), RoomName::from("r2")).await.unwrap();
        while a.try_recv().is_ok() {}
        while b.try_recv().is_ok() {}
        while c.try_recv().is_ok() {}

        handle.forward(ClientId::from("A"), offer_to("ghost")).await;
        handle.forward(ClientId::from("A"), offer_to("C")).await;

        // Actor still serves requests after dropping both
        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.active_connections, 3);
        assert_empty(&mut a);
        assert_empty(&mut b);
        assert_empty(&mut c);
    }

    #[tokio::test]
    async fn leave_broadcasts_user_left_and_removes_empty_room() {
        let handle = RelayHandle::spawn();
        let mut a = connect(&handle, "A").await;
        let mut b = connect(&handle, "B").await;
        handle.join(ClientId::from("A"), RoomName::from("r1")).await.unwrap();
        handle.join(ClientId::from("B"), RoomName::from("r1")).await.unwrap();
        next(&mut a);
        next(&mut a);
        next(&mut b);

        handle.leave(ClientId::from("A")).await.unwrap();
        assert_eq!(
            next(&mut b),
            SignalingMessage::UserLeft {
                client_id: ClientId::from("A")
            }
        );
        assert_empty(&mut a);
        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.room("r1").unwrap().members, vec![ClientId::from("B")]);

        handle.leave(ClientId::from("B")).await.unwrap();
        let stats = handle.stats().await.unwrap();
        assert!(stats.room("r1").is_none());
        // Still connected, just not in a room
        assert_eq!(stats.active_connections, 2);
    }

    #[tokio::test]
    async fn leave_outside_room_reports_room_not_found() {
        let handle = RelayHandle::spawn();
        let _a = connect(&handle, "A").await;

        let err = handle.leave(ClientId::from("A")).await.unwrap_err();
        assert!(matches!(err, RelayError::RoomNotFound(_)));
    }

    #[tokio::test]
    async fn disconnect_cleans_up_like_leave() {
        let handle = RelayHandle::spawn();
        let mut a = connect(&handle, "A").await;
        let mut b = connect(&handle, "B").await;
        handle.join(ClientId::from("A"), RoomName::from("r1")).await.unwrap();
        handle.join(ClientId::from("B"), RoomName::from("r1")).await.unwrap();
        next(&mut a);
        next(&mut a);
        next(&mut b);

        handle.disconnect(ClientId::from("A")).await;
        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.active_connections, 1);
        assert_eq!(
            next(&mut b),
            SignalingMessage::UserLeft {
                client_id: ClientId::from("A")
            }
        );

        // The id is free again
        let (tx, _rx) = mpsc::unbounded_channel();
        handle.connect(ClientId::from("A"), tx).await.unwrap();
    }
}
