use crate::api::models::{PollOutcome, TrackPayload};
use crate::timer::{TimerId, TimerKey, TimerQueue, TimerSlot};
use std::time::Duration;

/// Network work the widget asks its driver to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PollSongInfo { cursor: Option<String> },
    FetchArtwork { url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    /// New data for the consumer, which re-arms the poller when it is done.
    Deliver(TrackPayload),
    /// Nothing new; the next request goes out right away.
    Request(Command),
    /// The request failed; a retry is scheduled after the backoff.
    Backoff,
}

/// Owns the request/response cycle against the song info endpoint.
///
/// At most one request is outstanding; the next one is issued only once the
/// previous outcome has been handled.
#[derive(Debug)]
pub struct Poller {
    cursor: Option<String>,
    in_flight: bool,
    retry: TimerSlot,
    backoff: Duration,
}

impl Poller {
    pub fn new(backoff: Duration) -> Self {
        Self {
            cursor: None,
            in_flight: false,
            retry: TimerSlot::default(),
            backoff,
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_retry_pending(&self) -> bool {
        self.retry.is_pending()
    }

    /// Issues the next request, or nothing if one is already outstanding.
    pub fn arm(&mut self, timers: &mut TimerQueue) -> Option<Command> {
        if self.in_flight {
            log::debug!("Poll already in flight, not issuing another");
            return None;
        }
        self.retry.cancel(timers);
        self.in_flight = true;
        Some(Command::PollSongInfo {
            cursor: self.cursor.clone(),
        })
    }

    pub fn on_outcome(&mut self, timers: &mut TimerQueue, outcome: PollOutcome) -> PollStep {
        self.in_flight = false;
        match outcome {
            PollOutcome::Updated(payload) => {
                self.cursor = payload.version.clone();
                PollStep::Deliver(payload)
            }
            PollOutcome::Unchanged => match self.arm(timers) {
                Some(command) => PollStep::Request(command),
                None => PollStep::Backoff,
            },
            PollOutcome::TransportError(message) => {
                log::warn!(
                    "Connection error ({}), reconnecting in {} ms",
                    message,
                    self.backoff.as_millis()
                );
                self.retry.schedule(timers, TimerKey::PollRetry, self.backoff);
                PollStep::Backoff
            }
            PollOutcome::ServerError(status) => {
                log::warn!(
                    "Server responded with status {}, reconnecting in {} ms",
                    status,
                    self.backoff.as_millis()
                );
                self.retry.schedule(timers, TimerKey::PollRetry, self.backoff);
                PollStep::Backoff
            }
        }
    }

    pub fn on_retry_timer(&mut self, timers: &mut TimerQueue, id: TimerId) -> Option<Command> {
        if !self.retry.fire(id) {
            return None;
        }
        self.arm(timers)
    }

    pub fn cancel(&mut self, timers: &mut TimerQueue) {
        self.retry.cancel(timers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(version: &str) -> TrackPayload {
        TrackPayload {
            title: "A".into(),
            artist: "B".into(),
            artwork_url: None,
            version: Some(version.into()),
            playing: true,
            song_changed: None,
        }
    }

    #[test]
    fn only_one_request_in_flight() {
        let mut timers = TimerQueue::new();
        let mut poller = Poller::new(Duration::from_millis(5000));
        assert_eq!(
            poller.arm(&mut timers),
            Some(Command::PollSongInfo { cursor: None })
        );
        assert_eq!(poller.arm(&mut timers), None);
    }

    #[test]
    fn update_advances_cursor_and_waits_for_consumer() {
        let mut timers = TimerQueue::new();
        let mut poller = Poller::new(Duration::from_millis(5000));
        poller.arm(&mut timers);

        let step = poller.on_outcome(&mut timers, PollOutcome::Updated(payload("t1")));
        assert_eq!(step, PollStep::Deliver(payload("t1")));
        assert_eq!(poller.cursor(), Some("t1"));
        assert!(!poller.is_in_flight());
        assert!(timers.is_empty());

        assert_eq!(
            poller.arm(&mut timers),
            Some(Command::PollSongInfo {
                cursor: Some("t1".into())
            })
        );
    }

    #[test]
    fn unchanged_repolls_immediately_with_same_cursor() {
        let mut timers = TimerQueue::new();
        let mut poller = Poller::new(Duration::from_millis(5000));
        poller.arm(&mut timers);
        poller.on_outcome(&mut timers, PollOutcome::Updated(payload("t1")));
        poller.arm(&mut timers);

        let step = poller.on_outcome(&mut timers, PollOutcome::Unchanged);
        assert_eq!(
            step,
            PollStep::Request(Command::PollSongInfo {
                cursor: Some("t1".into())
            })
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn errors_retry_after_exactly_the_backoff() {
        let mut timers = TimerQueue::new();
        let mut poller = Poller::new(Duration::from_millis(5000));
        poller.arm(&mut timers);

        let step = poller.on_outcome(&mut timers, PollOutcome::ServerError(502));
        assert_eq!(step, PollStep::Backoff);
        assert_eq!(timers.next_deadline(), Some(Duration::from_millis(5000)));
        assert!(timers.pop_due(Duration::from_millis(4999)).is_none());

        let (id, key) = timers.pop_due(Duration::from_millis(5000)).unwrap();
        assert_eq!(key, TimerKey::PollRetry);
        assert_eq!(
            poller.on_retry_timer(&mut timers, id),
            Some(Command::PollSongInfo { cursor: None })
        );
    }
}
