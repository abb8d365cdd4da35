use crate::error::{AppError, AppResult};
use serde::{Deserialize, Deserializer};
use url::Url;

/// Body of a `200` reply from the song info endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SongInfo {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub art_url: Option<String>,
    #[serde(default, deserialize_with = "opaque_token")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub playing: Option<bool>,
    #[serde(default)]
    pub song_changed: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawToken {
    Text(String),
    Number(serde_json::Number),
}

/// Servers send the version token either as a string or as a bare number.
fn opaque_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawToken>::deserialize(deserializer)?;
    Ok(raw.map(|token| match token {
        RawToken::Text(s) => s,
        RawToken::Number(n) => n.to_string(),
    }))
}

impl SongInfo {
    pub fn parse(body: &str) -> AppResult<Self> {
        serde_json::from_str(body).map_err(|e| AppError::Decode(e.to_string()))
    }

    /// Resolves the artwork reference against the server.
    ///
    /// A non-empty `art_url` wins, an empty one means there is no artwork, and
    /// an absent one means the server serves the artwork itself.
    pub fn into_payload(self, base: &Url, artwork_endpoint: &Url) -> AppResult<TrackPayload> {
        let artwork_url = match self.art_url.as_deref() {
            Some("") => None,
            Some(art) => Some(
                base.join(art)
                    .map_err(|e| AppError::Decode(format!("bad art_url {:?}: {}", art, e)))?
                    .to_string(),
            ),
            None => Some(artwork_endpoint.to_string()),
        };

        Ok(TrackPayload {
            title: self.title,
            artist: self.artist,
            artwork_url,
            version: self.timestamp,
            playing: self.playing.unwrap_or(true),
            song_changed: self.song_changed,
        })
    }
}

/// A decoded, resolved update handed to the playback state tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPayload {
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    pub version: Option<String>,
    pub playing: bool,
    pub song_changed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Updated(TrackPayload),
    Unchanged,
    TransportError(String),
    ServerError(u16),
}

/// Raw artwork bytes as fetched, before the rendering layer materializes them.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkBlob {
    pub source_url: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> (Url, Url) {
        let base = Url::parse("http://localhost:6969/").unwrap();
        let artwork = base.join("get-song-artwork").unwrap();
        (base, artwork)
    }

    #[test]
    fn numeric_and_string_timestamps_are_opaque_strings() {
        let a = SongInfo::parse(r#"{"title":"A","artist":"B","timestamp":"1700000000"}"#).unwrap();
        let b = SongInfo::parse(r#"{"title":"A","artist":"B","timestamp":1700000000}"#).unwrap();
        assert_eq!(a.timestamp.as_deref(), Some("1700000000"));
        assert_eq!(b.timestamp.as_deref(), Some("1700000000"));
    }

    #[test]
    fn missing_title_is_a_decode_error() {
        let err = SongInfo::parse(r#"{"artist":"B"}"#).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn relative_art_url_resolves_against_server() {
        let (base, artwork) = base();
        let payload = SongInfo::parse(r#"{"title":"A","artist":"B","art_url":"/x.png"}"#)
            .unwrap()
            .into_payload(&base, &artwork)
            .unwrap();
        assert_eq!(payload.artwork_url.as_deref(), Some("http://localhost:6969/x.png"));
        assert!(payload.playing);
        assert_eq!(payload.version, None);
    }

    #[test]
    fn absent_art_url_uses_artwork_endpoint_and_empty_means_none() {
        let (base, artwork) = base();
        let served = SongInfo::parse(r#"{"title":"A","artist":"B","playing":false}"#)
            .unwrap()
            .into_payload(&base, &artwork)
            .unwrap();
        assert_eq!(
            served.artwork_url.as_deref(),
            Some("http://localhost:6969/get-song-artwork")
        );
        assert!(!served.playing);

        let none = SongInfo::parse(r#"{"title":"A","artist":"B","art_url":""}"#)
            .unwrap()
            .into_payload(&base, &artwork)
            .unwrap();
        assert_eq!(none.artwork_url, None);
    }
}
