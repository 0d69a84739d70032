use std::mem;
use std::sync::Arc;

use tracing::debug;

use super::capability::{PeerConnectionState, PeerTransport, Track, TransportError};
use crate::signaling::{ClientId, IceCandidate, SessionDescription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Offerer,
    Answerer,
}

/// Offer/answer progress of one session, as in `RTCSignalingState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

/// Negotiation state for the single remote peer.
pub(crate) struct PeerSession {
    remote_id: ClientId,
    role: Role,
    epoch: u64,
    transport: Box<dyn PeerTransport>,
    signaling_state: SignalingState,
    connection_state: PeerConnectionState,
    has_remote_description: bool,
    /// Remote candidates that arrived before the remote description.
    early_candidates: Vec<IceCandidate>,
    /// Local candidates not yet handed to the relay.
    outbound_candidates: Vec<IceCandidate>,
}

impl PeerSession {
    pub fn new(
        remote_id: ClientId,
        role: Role,
        epoch: u64,
        mut transport: Box<dyn PeerTransport>,
        tracks: &[Arc<dyn Track>],
    ) -> Result<Self, TransportError> {
        for track in tracks {
            transport.attach_local_track(track.clone())?;
        }

        Ok(Self {
            remote_id,
            role,
            epoch,
            transport,
            signaling_state: SignalingState::Stable,
            connection_state: PeerConnectionState::New,
            has_remote_description: false,
            early_candidates: Vec::new(),
            outbound_candidates: Vec::new(),
        })
    }

    pub fn remote_id(&self) -> &ClientId {
        &self.remote_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn signaling_state(&self) -> SignalingState {
        self.signaling_state
    }

    pub fn connection_state(&self) -> PeerConnectionState {
        self.connection_state
    }

    pub fn set_connection_state(&mut self, state: PeerConnectionState) {
        self.connection_state = state;
    }

    /// createOffer + setLocalDescription
    pub async fn create_offer(&mut self) -> Result<SessionDescription, TransportError> {
        let offer = self.transport.create_offer().await?;
        self.transport.set_local_description(offer.clone()).await?;
        self.signaling_state = SignalingState::HaveLocalOffer;
        Ok(offer)
    }

    /// setRemoteDescription(offer) + createAnswer + setLocalDescription.
    /// Also used for renegotiation on an existing transport.
    pub async fn accept_offer(
        &mut self,
        offer: SessionDescription,
    ) -> Result<SessionDescription, TransportError> {
        self.transport.set_remote_description(offer).await?;
        self.signaling_state = SignalingState::HaveRemoteOffer;
        self.has_remote_description = true;
        self.replay_early_candidates().await?;

        let answer = self.transport.create_answer().await?;
        self.transport.set_local_description(answer.clone()).await?;
        self.signaling_state = SignalingState::Stable;
        Ok(answer)
    }

    pub async fn apply_answer(&mut self, answer: SessionDescription) -> Result<(), TransportError> {
        self.transport.set_remote_description(answer).await?;
        self.signaling_state = SignalingState::Stable;
        self.has_remote_description = true;
        self.replay_early_candidates().await
    }

    /// Apply a remote candidate, or hold it until the remote description is set.
    pub async fn add_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<(), TransportError> {
        if !self.has_remote_description {
            debug!("Buffering early candidate from {}", self.remote_id);
            self.early_candidates.push(candidate);
            return Ok(());
        }
        self.transport.add_ice_candidate(candidate).await
    }

    pub fn buffered_candidates(&self) -> usize {
        self.early_candidates.len()
    }

    async fn replay_early_candidates(&mut self) -> Result<(), TransportError> {
        let early = mem::take(&mut self.early_candidates);
        if !early.is_empty() {
            debug!("Replaying {} early candidates from {}", early.len(), self.remote_id);
        }
        for candidate in early {
            self.transport.add_ice_candidate(candidate).await?;
        }
        Ok(())
    }

    pub fn queue_local_candidate(&mut self, candidate: IceCandidate) {
        self.outbound_candidates.push(candidate);
    }

    pub fn take_local_candidates(&mut self) -> Vec<IceCandidate> {
        mem::take(&mut self.outbound_candidates)
    }

    /// Put back candidates that could not be delivered, ahead of newer ones.
    pub fn requeue_local_candidates(&mut self, mut pending: Vec<IceCandidate>) {
        pending.append(&mut self.outbound_candidates);
        self.outbound_candidates = pending;
    }

    pub fn close(mut self) {
        debug!("Closing peer session with {}", self.remote_id);
        self.signaling_state = SignalingState::Closed;
        self.transport.close();
    }
}
