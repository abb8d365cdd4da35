use crate::api::models::TrackPayload;

/// Last applied view of what the source is playing.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub title: String,
    pub artist: String,
    pub artwork_ref: Option<String>,
    pub version: Option<String>,
    pub playing: bool,
}

impl Default for TrackSnapshot {
    fn default() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            artwork_ref: None,
            version: None,
            playing: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeSet {
    pub title: bool,
    pub artist: bool,
    pub artwork: bool,
    pub playing: bool,
    /// The track content changed and the artwork must be fetched again.
    pub content: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        !(self.title || self.artist || self.artwork || self.playing || self.content)
    }
}

/// Computes the snapshot that replaces `current` and what differs.
///
/// An explicit `song_changed` flag decides whether the content changed;
/// without one, a differing title, artist or artwork reference does. A
/// change of `playing` alone never counts as a content change.
pub fn diff(current: &TrackSnapshot, payload: &TrackPayload) -> (TrackSnapshot, ChangeSet) {
    let title = current.title != payload.title;
    let artist = current.artist != payload.artist;
    let artwork = current.artwork_ref != payload.artwork_url;
    let playing = current.playing != payload.playing;
    let content = payload.song_changed.unwrap_or(title || artist || artwork);

    let next = TrackSnapshot {
        title: payload.title.clone(),
        artist: payload.artist.clone(),
        artwork_ref: payload.artwork_url.clone(),
        version: payload.version.clone(),
        playing: payload.playing,
    };

    (
        next,
        ChangeSet {
            title,
            artist,
            artwork,
            playing,
            content,
        },
    )
}

#[derive(Debug, Default)]
pub struct PlaybackTracker {
    current: TrackSnapshot,
}

impl PlaybackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &TrackSnapshot {
        &self.current
    }

    pub fn apply(&mut self, payload: &TrackPayload) -> ChangeSet {
        let (next, changes) = diff(&self.current, payload);
        self.current = next;
        changes
    }
}
