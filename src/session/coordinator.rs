use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::capability::{
    MediaError, MediaHandle, MediaSource, PeerConnectionState, RemoteStream, SignalingConnector,
    SignalingError, SignalingLink, TransportConfig, TransportError, TransportFactory,
};
use super::event::{Command, Event, Notice, PeerEvent, PeerEventSender, SignalingEventSender};
use super::media::{LocalMedia, release_handle};
use super::peer::{PeerSession, Role, SignalingState};
use crate::config::CoordinatorConfig;
use crate::signaling::{
    ClientId, ErrorCode, IceCandidate, RoomName, SessionDescription, SignalingMessage,
};

const NOTICE_CAPACITY: usize = 256;

/// Coordinator errors. None of them is fatal: each leaves the coordinator in
/// `Idle` or `InRoom`, ready for another attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("room name must not be empty")]
    InvalidRoom,

    #[error("already joined or joining a room")]
    AlreadyJoined,

    #[error("{0}")]
    MediaAccessDenied(MediaError),

    #[error("negotiation with {remote} failed: {reason}")]
    TransportNegotiationFailed { remote: ClientId, reason: String },

    #[error("no session matches {0}")]
    StaleSession(String),

    #[error("relay unavailable: {0}")]
    SignalingUnavailable(String),

    #[error("relay rejected the connection: {0}")]
    Rejected(String),

    #[error("relay connection lost")]
    TransportDisconnect,
}

/// Coordinator lifecycle. Leaving from any state returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Joining,
    InRoom,
    Negotiating,
    Connected,
}

/// Client-side call state machine. Owns the local media, the relay link and
/// at most one `PeerSession`; every input arrives as an event and is
/// processed to completion before the next one.
pub struct Coordinator {
    config: CoordinatorConfig,
    fixed_id: Option<ClientId>,
    client_id: Option<ClientId>,
    media_source: Arc<dyn MediaSource>,
    transports: Arc<dyn TransportFactory>,
    connector: Arc<dyn SignalingConnector>,

    events_tx: async_channel::Sender<Event>,
    events_rx: async_channel::Receiver<Event>,
    /// Events that arrived while a transport step was in flight.
    backlog: VecDeque<Event>,
    notices_tx: async_channel::Sender<Notice>,
    notices_rx: async_channel::Receiver<Notice>,

    state: SessionState,
    room: Option<RoomName>,
    /// Bumped by every join and leave; results of older attempts are discarded.
    attempt: u64,
    /// Bumped for every new peer session.
    epoch: u64,
    room_joined_seen: bool,
    media: Option<LocalMedia>,
    link: Option<Box<dyn SignalingLink>>,
    peer: Option<PeerSession>,
    remote_stream: Option<RemoteStream>,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        media_source: Arc<dyn MediaSource>,
        transports: Arc<dyn TransportFactory>,
        connector: Arc<dyn SignalingConnector>,
    ) -> Self {
        let (events_tx, events_rx) = async_channel::unbounded();
        let (notices_tx, notices_rx) = async_channel::bounded(NOTICE_CAPACITY);

        Self {
            config,
            fixed_id: None,
            client_id: None,
            media_source,
            transports,
            connector,
            events_tx,
            events_rx,
            backlog: VecDeque::new(),
            notices_tx,
            notices_rx,
            state: SessionState::Idle,
            room: None,
            attempt: 0,
            epoch: 0,
            room_joined_seen: false,
            media: None,
            link: None,
            peer: None,
            remote_stream: None,
        }
    }

    /// Use `id` for every join instead of generating a fresh one.
    pub fn with_client_id(mut self, id: ClientId) -> Self {
        self.fixed_id = Some(id);
        self
    }

    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            tx: self.events_tx.clone(),
        }
    }

    pub fn notices(&self) -> async_channel::Receiver<Notice> {
        self.notices_rx.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    pub fn room(&self) -> Option<&RoomName> {
        self.room.as_ref()
    }

    pub fn remote_id(&self) -> Option<&ClientId> {
        self.peer.as_ref().map(PeerSession::remote_id)
    }

    pub fn role(&self) -> Option<Role> {
        self.peer.as_ref().map(PeerSession::role)
    }

    pub fn signaling_state(&self) -> Option<SignalingState> {
        self.peer.as_ref().map(PeerSession::signaling_state)
    }

    /// Transport connectivity of the current session, `Closed` without one.
    pub fn connection_state(&self) -> PeerConnectionState {
        self.peer
            .as_ref()
            .map_or(PeerConnectionState::Closed, PeerSession::connection_state)
    }

    pub fn has_peer_session(&self) -> bool {
        self.peer.is_some()
    }

    pub fn has_local_media(&self) -> bool {
        self.media.is_some()
    }

    pub fn buffered_remote_candidates(&self) -> usize {
        self.peer.as_ref().map_or(0, PeerSession::buffered_candidates)
    }

    pub fn audio_enabled(&self) -> Option<bool> {
        self.media.as_ref().map(LocalMedia::audio_enabled)
    }

    pub fn video_enabled(&self) -> Option<bool> {
        self.media.as_ref().map(LocalMedia::video_enabled)
    }

    pub fn remote_stream(&self) -> Option<&RemoteStream> {
        self.remote_stream.as_ref()
    }

    /// Process events until a `Shutdown` command arrives.
    pub async fn run(mut self) {
        while let Some(event) = self.next_event().await {
            if matches!(event, Event::Command(Command::Shutdown)) {
                self.leave();
                break;
            }
            self.dispatch(event).await;
        }
    }

    /// Wait for and process exactly one event.
    pub async fn step(&mut self) {
        if let Some(event) = self.next_event().await {
            self.dispatch(event).await;
        }
    }

    async fn next_event(&mut self) -> Option<Event> {
        match self.backlog.pop_front() {
            Some(event) => Some(event),
            None => self.events_rx.recv().await.ok(),
        }
    }

    /// Process every event already queued, without waiting. Returns how many
    /// were handled.
    pub async fn drain(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let event = match self.backlog.pop_front() {
                Some(event) => event,
                None => match self.events_rx.try_recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };
            self.dispatch(event).await;
            handled += 1;
        }
        handled
    }

    /// Start joining `room`: capture media, then connect to the relay. The
    /// outcome arrives later as events.
    pub fn join(&mut self, room: &str) -> Result<(), CoordinatorError> {
        self.join_room(RoomName::from(room))
    }

    fn join_room(&mut self, room: RoomName) -> Result<(), CoordinatorError> {
        if room.is_empty() {
            return Err(CoordinatorError::InvalidRoom);
        }
        if self.state != SessionState::Idle {
            return Err(CoordinatorError::AlreadyJoined);
        }

        self.attempt += 1;
        self.room = Some(room.clone());
        self.room_joined_seen = false;
        self.client_id = Some(self.fixed_id.clone().unwrap_or_else(ClientId::generate));
        self.set_state(SessionState::Joining);
        info!("Joining room {} (attempt {})", room, self.attempt);

        let attempt = self.attempt;
        let source = self.media_source.clone();
        let constraints = self.config.media.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = source.acquire(&constraints).await;
            let _ = tx.send(Event::MediaAcquired { attempt, result }).await;
        });

        Ok(())
    }

    /// Leave from any state: notify the relay, tear everything down, end in
    /// `Idle`. Pending capture or connect attempts are abandoned.
    pub fn leave(&mut self) {
        self.attempt += 1;

        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.send(&SignalingMessage::Leave) {
                debug!("Could not send leave: {}", e);
            }
            link.close();
        }
        self.close_peer();
        if let Some(media) = self.media.take() {
            media.release();
        }
        if let Some(room) = self.room.take() {
            info!("Left room {}", room);
        }
        self.room_joined_seen = false;
        self.client_id = None;
        self.set_state(SessionState::Idle);
    }

    /// Flip the microphone switch. Returns the new value, `None` without media.
    pub fn toggle_audio(&mut self) -> Option<bool> {
        let enabled = self.media.as_mut()?.toggle_audio();
        self.notify_local_media();
        Some(enabled)
    }

    /// Flip the camera switch. Returns the new value, `None` without media.
    pub fn toggle_video(&mut self) -> Option<bool> {
        let enabled = self.media.as_mut()?.toggle_video();
        self.notify_local_media();
        Some(enabled)
    }

    async fn dispatch(&mut self, event: Event) {
        match event {
            Event::Command(cmd) => self.on_command(cmd),
            Event::MediaAcquired { attempt, result } => self.on_media_acquired(attempt, result),
            Event::SignalingConnected { attempt, result } => {
                self.on_signaling_connected(attempt, result)
            }
            Event::Inbound { attempt, message } => {
                if attempt == self.attempt {
                    self.on_inbound(message).await;
                } else {
                    debug!("Dropping {} from a previous connection", message.kind());
                }
            }
            Event::SignalingClosed { attempt } => self.on_signaling_closed(attempt),
            Event::Peer { epoch, event } => self.on_peer_event(epoch, event).await,
        }
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Join(room) => {
                if let Err(e) = self.join_room(room) {
                    warn!("Join rejected: {}", e);
                    self.notify(Notice::Error(e));
                }
            }
            Command::Leave | Command::Shutdown => self.leave(),
            Command::ToggleAudio => {
                self.toggle_audio();
            }
            Command::ToggleVideo => {
                self.toggle_video();
            }
        }
    }

    fn on_media_acquired(&mut self, attempt: u64, result: Result<MediaHandle, MediaError>) {
        if attempt != self.attempt || self.state != SessionState::Joining {
            debug!("Capture finished after the join was abandoned");
            if let Ok(handle) = result {
                release_handle(&handle);
            }
            return;
        }

        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Could not access camera/microphone: {}", e);
                self.room = None;
                self.client_id = None;
                self.set_state(SessionState::Idle);
                self.notify(Notice::Error(CoordinatorError::MediaAccessDenied(e)));
                return;
            }
        };

        info!("Local stream initialized");
        self.media = Some(LocalMedia::new(handle));
        self.notify_local_media();

        let Some(client_id) = self.client_id.clone() else {
            return;
        };
        let connector = self.connector.clone();
        let events = SignalingEventSender::new(attempt, self.events_tx.clone());
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = connector.connect(&client_id, events).await;
            let _ = tx.send(Event::SignalingConnected { attempt, result }).await;
        });
    }

    fn on_signaling_connected(
        &mut self,
        attempt: u64,
        result: Result<Box<dyn SignalingLink>, SignalingError>,
    ) {
        if attempt != self.attempt || self.state != SessionState::Joining {
            if let Ok(mut link) = result {
                link.close();
            }
            return;
        }

        let mut link = match result {
            Ok(link) => link,
            Err(e) => {
                warn!("Failed to connect to relay: {}", e);
                self.leave();
                self.notify(Notice::Error(CoordinatorError::SignalingUnavailable(
                    e.to_string(),
                )));
                return;
            }
        };

        let Some(room) = self.room.clone() else {
            link.close();
            return;
        };
        if let Err(e) = link.send(&SignalingMessage::Join { room: room.clone() }) {
            warn!("Failed to send join: {}", e);
            link.close();
            self.leave();
            self.notify(Notice::Error(CoordinatorError::SignalingUnavailable(
                e.to_string(),
            )));
            return;
        }

        info!("Connected to relay, joining {}", room);
        self.link = Some(link);
        self.set_state(SessionState::InRoom);
    }

    fn on_signaling_closed(&mut self, attempt: u64) {
        if attempt != self.attempt || self.state == SessionState::Idle {
            return;
        }
        warn!("Disconnected from relay");
        self.link = None;
        self.leave();
        self.notify(Notice::Error(CoordinatorError::TransportDisconnect));
    }

    async fn on_inbound(&mut self, message: SignalingMessage) {
        debug!("Received message: {}", message.kind());

        match message {
            SignalingMessage::RoomJoined {
                room,
                existing_members,
            } => self.on_room_joined(room, existing_members).await,

            SignalingMessage::UserJoined { client_id } => {
                // The newcomer sends the offer; nothing to do but wait.
                info!("User {} joined, waiting for their offer", client_id);
            }

            SignalingMessage::Offer {
                sdp,
                from: Some(from),
                ..
            } => self.on_offer(sdp, from).await,

            SignalingMessage::Answer {
                sdp,
                from: Some(from),
                ..
            } => self.on_answer(sdp, from).await,

            SignalingMessage::IceCandidate {
                candidate,
                from: Some(from),
                ..
            } => self.on_remote_candidate(candidate, from).await,

            SignalingMessage::UserLeft { client_id } => {
                if self.remote_id() == Some(&client_id) {
                    info!("Remote user {} left", client_id);
                    self.drop_peer();
                } else {
                    debug!("User {} left", client_id);
                }
            }

            SignalingMessage::Error { code, message } => self.on_relay_error(code, message),

            other => warn!("Ignoring unexpected {} from relay", other.kind()),
        }
    }

    async fn on_room_joined(&mut self, room: RoomName, existing_members: Vec<ClientId>) {
        if self.room_joined_seen {
            debug!("Duplicate room-joined for {} ignored", room);
            return;
        }
        self.room_joined_seen = true;
        info!("Joined room {} with {} existing users", room, existing_members.len());

        match existing_members.into_iter().next() {
            Some(remote) => self.start_offer(remote).await,
            None => info!("No existing users in room, waiting for others to join"),
        }
    }

    fn on_relay_error(&mut self, code: ErrorCode, message: String) {
        warn!("Relay error {:?}: {}", code, message);
        match code {
            // The relay never registered this connection; nothing else will work.
            ErrorCode::DuplicateClient | ErrorCode::NotRegistered => {
                self.leave();
                self.notify(Notice::Error(CoordinatorError::Rejected(message)));
            }
            _ => {}
        }
    }

    /// Offerer side: fresh session towards `remote`, send our offer.
    async fn start_offer(&mut self, remote: ClientId) {
        info!("Creating offer to existing user {}", remote);
        if let Err(e) = self.open_peer(remote.clone(), Role::Offerer).await {
            self.negotiation_failed(remote, e);
            return;
        }

        let limit = self.config.negotiation_timeout;
        let Some(peer) = self.peer.as_mut() else {
            return;
        };
        let offer = interruptible(
            limit,
            &self.events_rx,
            &mut self.backlog,
            peer.create_offer(),
        )
        .await;
        match offer {
            Ok(offer) => {
                self.send(SignalingMessage::Offer {
                    sdp: offer,
                    from: None,
                    target: remote,
                });
                self.flush_local_candidates();
            }
            Err(e) => self.negotiation_failed(remote, e),
        }
    }

    async fn on_offer(&mut self, sdp: SessionDescription, from: ClientId) {
        if !matches!(
            self.state,
            SessionState::InRoom | SessionState::Negotiating | SessionState::Connected
        ) {
            debug!("Offer from {} outside a room ignored", from);
            return;
        }

        if let Some(peer) = &self.peer {
            if peer.remote_id() != &from {
                info!(
                    "Ignoring offer from {}: already in a session with {}",
                    from,
                    peer.remote_id()
                );
                return;
            }

            if peer.signaling_state() == SignalingState::HaveLocalOffer {
                // Both sides offered at once; the greater id keeps its offer.
                let ours_wins = self.client_id.as_ref().is_some_and(|me| *me > from);
                if ours_wins {
                    info!("Offer collision with {}: keeping our offer", from);
                    return;
                }
                info!("Offer collision with {}: yielding to their offer", from);
                self.close_peer();
            } else {
                info!("Renegotiation offer from {}", from);
                self.answer_offer(sdp, from).await;
                return;
            }
        }

        if let Err(e) = self.open_peer(from.clone(), Role::Answerer).await {
            self.negotiation_failed(from, e);
            return;
        }
        self.answer_offer(sdp, from).await;
    }

    /// Answerer side: apply the remote offer on the current session and reply.
    async fn answer_offer(&mut self, sdp: SessionDescription, from: ClientId) {
        let limit = self.config.negotiation_timeout;
        let Some(peer) = self.peer.as_mut() else {
            return;
        };
        let answer = interruptible(
            limit,
            &self.events_rx,
            &mut self.backlog,
            peer.accept_offer(sdp),
        )
        .await;
        match answer {
            Ok(answer) => {
                self.send(SignalingMessage::Answer {
                    sdp: answer,
                    from: None,
                    target: from,
                });
                self.flush_local_candidates();
            }
            Err(e) => self.negotiation_failed(from, e),
        }
    }

    async fn on_answer(&mut self, sdp: SessionDescription, from: ClientId) {
        let limit = self.config.negotiation_timeout;
        let Some(peer) = self.peer.as_mut() else {
            let err = CoordinatorError::StaleSession(format!("answer from {}", from));
            warn!("{}", err);
            return;
        };
        if peer.remote_id() != &from || peer.signaling_state() != SignalingState::HaveLocalOffer {
            let err = CoordinatorError::StaleSession(format!("answer from {}", from));
            warn!("{}", err);
            return;
        }

        let applied = interruptible(
            limit,
            &self.events_rx,
            &mut self.backlog,
            peer.apply_answer(sdp),
        )
        .await;
        match applied {
            Ok(()) => info!("Remote description set"),
            Err(e) => self.negotiation_failed(from, e),
        }
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate, from: ClientId) {
        let limit = self.config.negotiation_timeout;
        let Some(peer) = self.peer.as_mut().filter(|p| p.remote_id() == &from) else {
            debug!("Dropping candidate from {}: no session", from);
            return;
        };
        let added = interruptible(
            limit,
            &self.events_rx,
            &mut self.backlog,
            peer.add_remote_candidate(candidate),
        )
        .await;
        if let Err(e) = added {
            warn!("Error adding ICE candidate from {}: {}", from, e);
        }
    }

    async fn on_peer_event(&mut self, epoch: u64, event: PeerEvent) {
        let Some(peer) = self.peer.as_mut().filter(|p| p.epoch() == epoch) else {
            debug!("Dropping event from a closed transport");
            return;
        };

        match event {
            PeerEvent::LocalIceCandidate(candidate) => {
                peer.queue_local_candidate(candidate);
                self.flush_local_candidates();
            }
            PeerEvent::RemoteTrack(stream) => {
                info!("Received remote track");
                self.remote_stream = Some(stream.clone());
                self.notify(Notice::RemoteStream(Some(stream)));
            }
            PeerEvent::ConnectionStateChanged(state) => {
                peer.set_connection_state(state);
                let remote = peer.remote_id().clone();
                info!("Connection state with {}: {:?}", remote, state);
                self.notify(Notice::ConnectionState(state));

                match state {
                    PeerConnectionState::Connected => {
                        if self.state == SessionState::Negotiating {
                            self.set_state(SessionState::Connected);
                        }
                    }
                    PeerConnectionState::Disconnected | PeerConnectionState::Failed => {
                        let reason = format!("transport reported {:?}", state);
                        self.negotiation_failed(remote, TransportError::Failed(reason));
                    }
                    _ => {}
                }
            }
        }
    }

    /// Tear down any previous session and start a new one bound to the local tracks.
    async fn open_peer(&mut self, remote: ClientId, role: Role) -> Result<(), TransportError> {
        self.close_peer();
        self.epoch += 1;

        let config = TransportConfig {
            ice_servers: self.config.ice_servers.clone(),
        };
        let events = PeerEventSender::new(self.epoch, self.events_tx.clone());
        let transport = interruptible(
            self.config.negotiation_timeout,
            &self.events_rx,
            &mut self.backlog,
            self.transports.create(&config, events),
        )
        .await?;

        let tracks = self.media.as_ref().map(LocalMedia::tracks).unwrap_or(&[]);
        let session = PeerSession::new(remote, role, self.epoch, transport, tracks)?;
        self.peer = Some(session);
        self.set_state(SessionState::Negotiating);
        Ok(())
    }

    fn negotiation_failed(&mut self, remote: ClientId, e: TransportError) {
        if e == TransportError::Cancelled {
            // The queued leave does the rest of the teardown.
            debug!("Negotiation with {} abandoned", remote);
            self.close_peer();
            return;
        }
        warn!("Negotiation with {} failed: {}", remote, e);
        self.drop_peer();
        self.notify(Notice::Error(CoordinatorError::TransportNegotiationFailed {
            remote,
            reason: e.to_string(),
        }));
    }

    /// Lose the peer but stay in the room.
    fn drop_peer(&mut self) {
        self.close_peer();
        if matches!(
            self.state,
            SessionState::Negotiating | SessionState::Connected
        ) {
            self.set_state(SessionState::InRoom);
        }
    }

    fn close_peer(&mut self) {
        if let Some(peer) = self.peer.take() {
            peer.close();
            self.notify(Notice::ConnectionState(PeerConnectionState::Closed));
        }
        if self.remote_stream.take().is_some() {
            self.notify(Notice::RemoteStream(None));
        }
    }

    fn flush_local_candidates(&mut self) {
        let (Some(peer), Some(link)) = (self.peer.as_mut(), self.link.as_mut()) else {
            return;
        };

        let mut pending = peer.take_local_candidates().into_iter();
        while let Some(candidate) = pending.next() {
            let msg = SignalingMessage::IceCandidate {
                candidate,
                from: None,
                target: peer.remote_id().clone(),
            };
            if let Err(e) = link.send(&msg) {
                warn!("Failed to send ICE candidate: {}", e);
                let mut unsent: Vec<IceCandidate> = Vec::new();
                if let SignalingMessage::IceCandidate { candidate, .. } = msg {
                    unsent.push(candidate);
                }
                unsent.extend(pending);
                peer.requeue_local_candidates(unsent);
                return;
            }
            debug!("Sent ICE candidate");
        }
    }

    fn send(&mut self, msg: SignalingMessage) {
        match self.link.as_mut() {
            Some(link) => {
                if let Err(e) = link.send(&msg) {
                    warn!("Failed to send {}: {}", msg.kind(), e);
                }
            }
            None => warn!("No relay connection, dropping {}", msg.kind()),
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("State {:?} -> {:?}", self.state, state);
            self.state = state;
            self.notify(Notice::StateChanged(state));
        }
    }

    fn notify_local_media(&mut self) {
        if let Some(media) = &self.media {
            self.notify(Notice::LocalMedia {
                audio_enabled: media.audio_enabled(),
                video_enabled: media.video_enabled(),
            });
        }
    }

    fn notify(&self, notice: Notice) {
        // Notices are advisory; a slow or absent listener must not stall the loop.
        let _ = self.notices_tx.try_send(notice);
    }
}

/// Run one transport step bounded by `limit`. Events arriving meanwhile are
/// parked in `backlog`; a leave or shutdown among them abandons the step.
async fn interruptible<T>(
    limit: Duration,
    events: &async_channel::Receiver<Event>,
    backlog: &mut VecDeque<Event>,
    fut: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    if backlog.iter().any(ends_session) {
        return Err(TransportError::Cancelled);
    }

    let step = tokio::time::timeout(limit, fut);
    tokio::pin!(step);
    loop {
        tokio::select! {
            res = &mut step => return res.unwrap_or(Err(TransportError::Timeout)),
            Ok(event) = events.recv() => {
                let cancel = ends_session(&event);
                backlog.push_back(event);
                if cancel {
                    return Err(TransportError::Cancelled);
                }
            }
        }
    }
}

fn ends_session(event: &Event) -> bool {
    matches!(event, Event::Command(Command::Leave | Command::Shutdown))
}

/// Cloneable entry point for UI code: posts commands into the coordinator's
/// event queue.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: async_channel::Sender<Event>,
}

impl CoordinatorHandle {
    pub fn join(&self, room: &str) {
        self.post(Command::Join(RoomName::from(room)));
    }

    pub fn leave(&self) {
        self.post(Command::Leave);
    }

    pub fn toggle_audio(&self) {
        self.post(Command::ToggleAudio);
    }

    pub fn toggle_video(&self) {
        self.post(Command::ToggleVideo);
    }

    pub fn shutdown(&self) {
        self.post(Command::Shutdown);
    }

    fn post(&self, cmd: Command) {
        if self.tx.try_send(Event::Command(cmd)).is_err() {
            debug!("Coordinator gone, dropping command");
        }
    }
}
