use crate::api::models::{ArtworkBlob, PollOutcome, SongInfo};
use crate::config::WidgetConfig;
use crate::error::{AppError, AppResult};
use futures_util::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use url::Url;

const DEFAULT_ARTWORK_MIME: &str = "image/jpeg";

/// HTTP side of the widget: the long-polled song info endpoint and the
/// artwork endpoint.
pub struct SongInfoClient {
    http: reqwest::Client,
    base: Url,
    info_url: Url,
    artwork_url: Url,
    max_artwork_bytes: usize,
}

impl SongInfoClient {
    pub fn new(config: &WidgetConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nowplaying-overlay/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()?;

        let base = Url::parse(&config.server_url)?;
        let info_url = base.join(&config.info_path)?;
        let artwork_url = base.join(&config.artwork_path)?;

        Ok(Self {
            http,
            base,
            info_url,
            artwork_url,
            max_artwork_bytes: config.max_artwork_bytes,
        })
    }

    /// Song info URL carrying the version token as its raw query string.
    pub fn info_url(&self, cursor: Option<&str>) -> Url {
        let mut url = self.info_url.clone();
        match cursor {
            Some(token) => url.set_query(Some(&urlencoding::encode(token))),
            None => url.set_query(None),
        }
        url
    }

    /// Issues one song info request. Never fails: every failure mode maps to
    /// a retryable outcome.
    pub async fn poll(&self, cursor: Option<&str>) -> PollOutcome {
        let url = self.info_url(cursor);
        log::debug!("Polling {}", url);

        let response = match self
            .http
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return PollOutcome::TransportError(e.to_string()),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return self.classify(status.as_u16(), "");
        }

        match response.text().await {
            Ok(body) => self.classify(status.as_u16(), &body),
            Err(e) => PollOutcome::TransportError(e.to_string()),
        }
    }

    pub fn classify(&self, status: u16, body: &str) -> PollOutcome {
        match status {
            200 => match SongInfo::parse(body)
                .and_then(|info| info.into_payload(&self.base, &self.artwork_url))
            {
                Ok(payload) => PollOutcome::Updated(payload),
                Err(e) => PollOutcome::TransportError(e.to_string()),
            },
            304 => PollOutcome::Unchanged,
            other => PollOutcome::ServerError(other),
        }
    }

    pub async fn fetch_artwork(&self, url: &str) -> AppResult<ArtworkBlob> {
        log::debug!("Fetching artwork {}", url);
        let response = self
            .http
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("image/*"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Server {
                status: status.as_u16(),
            });
        }

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_ARTWORK_MIME)
            .to_string();

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if bytes.len() + chunk.len() > self.max_artwork_bytes {
                return Err(AppError::Artwork(format!(
                    "artwork at {} exceeds {} bytes",
                    url, self.max_artwork_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(AppError::Artwork(format!("artwork at {} is empty", url)));
        }

        Ok(ArtworkBlob {
            source_url: url.to_string(),
            mime,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SongInfoClient {
        SongInfoClient::new(&WidgetConfig::default()).unwrap()
    }

    #[test]
    fn token_becomes_raw_query() {
        let client = client();
        assert_eq!(
            client.info_url(None).as_str(),
            "http://localhost:6969/get-song-info"
        );
        assert_eq!(
            client.info_url(Some("1700000000123")).as_str(),
            "http://localhost:6969/get-song-info?1700000000123"
        );
        assert_eq!(
            client.info_url(Some("a b")).as_str(),
            "http://localhost:6969/get-song-info?a%20b"
        );
    }

    #[test]
    fn classifies_statuses() {
        let client = client();
        assert_eq!(client.classify(304, ""), PollOutcome::Unchanged);
        assert_eq!(client.classify(500, ""), PollOutcome::ServerError(500));
        assert_eq!(client.classify(404, ""), PollOutcome::ServerError(404));
    }

    #[test]
    fn malformed_body_is_a_transport_error() {
        let client = client();
        assert!(matches!(
            client.classify(200, "{\"title\": 3}"),
            PollOutcome::TransportError(_)
        ));
        assert!(matches!(
            client.classify(200, "not json"),
            PollOutcome::TransportError(_)
        ));
    }

    #[test]
    fn valid_body_is_an_update() {
        let client = client();
        let outcome = client.classify(
            200,
            r#"{"title":"A","artist":"B","art_url":"/x.png","timestamp":"t1","playing":true}"#,
        );
        match outcome {
            PollOutcome::Updated(payload) => {
                assert_eq!(payload.title, "A");
                assert_eq!(payload.version.as_deref(), Some("t1"));
                assert_eq!(
                    payload.artwork_url.as_deref(),
                    Some("http://localhost:6969/x.png")
                );
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
