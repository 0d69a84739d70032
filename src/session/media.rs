use std::sync::Arc;

use tracing::debug;

use super::capability::{MediaHandle, Track, TrackKind};

/// Captured local media plus the user's mute switches. Toggling only gates
/// the tracks; they are stopped once, on release.
#[derive(Debug)]
pub(crate) struct LocalMedia {
    handle: MediaHandle,
    audio_enabled: bool,
    video_enabled: bool,
}

impl LocalMedia {
    pub fn new(handle: MediaHandle) -> Self {
        Self {
            handle,
            audio_enabled: true,
            video_enabled: true,
        }
    }

    pub fn tracks(&self) -> &[Arc<dyn Track>] {
        self.handle.all_tracks()
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn toggle_audio(&mut self) -> bool {
        self.audio_enabled = !self.audio_enabled;
        self.apply(TrackKind::Audio, self.audio_enabled);
        self.audio_enabled
    }

    pub fn toggle_video(&mut self) -> bool {
        self.video_enabled = !self.video_enabled;
        self.apply(TrackKind::Video, self.video_enabled);
        self.video_enabled
    }

    fn apply(&self, kind: TrackKind, enabled: bool) {
        for track in self.handle.tracks(kind) {
            track.set_enabled(enabled);
        }
    }

    pub fn release(self) {
        release_handle(&self.handle);
    }
}

/// Stop every track of a handle, including one that arrived too late to use.
pub(crate) fn release_handle(handle: &MediaHandle) {
    for track in handle.all_tracks() {
        debug!("Stopping local {:?} track {}", track.kind(), track.id());
        track.stop();
    }
}
