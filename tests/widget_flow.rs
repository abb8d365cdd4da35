use nowplaying_overlay_lib::api::client::SongInfoClient;
use nowplaying_overlay_lib::api::models::{ArtworkBlob, PollOutcome};
use nowplaying_overlay_lib::config::WidgetConfig;
use nowplaying_overlay_lib::error::AppError;
use nowplaying_overlay_lib::events::{RenderSignal, CLASS_HIDDEN, CLASS_HIDING, CLASS_NEW};
use nowplaying_overlay_lib::sync::poller::Command;
use nowplaying_overlay_lib::view::headless::HeadlessRenderer;
use nowplaying_overlay_lib::view::marquee::ScrollPhase;
use nowplaying_overlay_lib::view::render::{Element, Slot, TextField};
use nowplaying_overlay_lib::widget::NowPlayingWidget;
use std::time::Duration;

struct Harness {
    client: SongInfoClient,
    widget: NowPlayingWidget<HeadlessRenderer>,
}

impl Harness {
    fn new() -> Self {
        let config = WidgetConfig::default();
        let client = SongInfoClient::new(&config).unwrap();
        let render = HeadlessRenderer::new(&config);
        let mut widget = NowPlayingWidget::new(config, render).unwrap();
        widget.start();
        Self { client, widget }
    }

    /// Answers the outstanding poll with a `200` carrying `body`.
    fn reply(&mut self, body: &str) {
        self.expect_poll();
        let outcome = self.client.classify(200, body);
        self.widget.on_poll_outcome(outcome);
    }

    fn expect_poll(&mut self) -> Option<String> {
        match self.widget.take_commands().as_slice() {
            [Command::PollSongInfo { cursor }] => cursor.clone(),
            other => panic!("expected a single poll, got {:?}", other),
        }
    }

    fn expect_fetch(&mut self) -> String {
        match self.widget.take_commands().as_slice() {
            [Command::FetchArtwork { url }] => url.clone(),
            other => panic!("expected a single artwork fetch, got {:?}", other),
        }
    }

    fn deliver_artwork(&mut self, url: &str) {
        self.widget.on_artwork(Ok(ArtworkBlob {
            source_url: url.to_string(),
            mime: "image/png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }));
    }
}

fn song(title: &str, art: &str, timestamp: u64, playing: bool) -> String {
    serde_json::json!({
        "title": title,
        "artist": "B",
        "art_url": art,
        "timestamp": timestamp,
        "playing": playing,
    })
    .to_string()
}

#[test]
fn track_change_fetches_artwork_crossfades_and_polls_with_cursor() {
    let mut h = Harness::new();
    h.reply(r#"{"title":"A","artist":"B","art_url":"/x.png","timestamp":"t1","playing":true}"#);

    assert_eq!(h.expect_fetch(), "http://localhost:6969/x.png");
    assert!(h.widget.is_artwork_pending());

    h.deliver_artwork("http://localhost:6969/x.png");
    let render = h.widget.render();
    assert!(h.widget.is_crossfading());
    assert!(render.has_class(Element::Slot(Slot::B), CLASS_NEW));
    assert_eq!(
        render.text(Element::TextContent(Slot::B, TextField::Title)),
        Some("A")
    );
    assert_eq!(
        render.text(Element::TextContent(Slot::B, TextField::Artist)),
        Some("B")
    );
    assert!(render.background(Element::Art(Slot::B)).is_some());
    assert!(h.widget.scroll_state(Slot::B, TextField::Title).enabled);
    assert!(h.widget.scroll_state(Slot::B, TextField::Artist).enabled);
    // No further request until the swap completes.
    assert!(h.widget.take_commands().is_empty());

    h.widget.advance(Duration::from_millis(250));
    let render = h.widget.render();
    assert_eq!(h.widget.current_slot(), Slot::B);
    assert!(render.has_class(Element::Slot(Slot::A), CLASS_HIDDEN));
    assert!(!h.widget.scroll_state(Slot::A, TextField::Title).enabled);
    assert_eq!(h.expect_poll().as_deref(), Some("t1"));
}

#[test]
fn playing_toggle_does_not_refetch_artwork() {
    let mut h = Harness::new();
    h.reply(&song("A", "/x.png", 1, true));
    let url = h.expect_fetch();
    h.deliver_artwork(&url);
    h.widget.advance(Duration::from_millis(250));

    h.reply(&song("A", "/x.png", 2, false));
    assert!(!h.widget.is_artwork_pending());
    assert!(!h.widget.is_crossfading());
    assert_eq!(h.expect_poll().as_deref(), Some("2"));
    assert_eq!(h.widget.render().created_count(), 1);
    assert!(!h.widget.snapshot().playing);
}

#[test]
fn text_change_without_song_change_updates_the_visible_slot() {
    let mut h = Harness::new();
    h.reply(r#"{"title":"A","artist":"B","art_url":"/x.png","timestamp":"1"}"#);
    let url = h.expect_fetch();
    h.deliver_artwork(&url);
    h.widget.advance(Duration::from_millis(250));
    let slot = h.widget.current_slot();
    let artwork = h.widget.render().background(Element::Art(slot));

    h.reply(r#"{"title":"C","artist":"D","art_url":"/x.png","timestamp":"2","song_changed":false}"#);
    assert!(!h.widget.is_artwork_pending());
    assert!(!h.widget.is_crossfading());
    assert_eq!(h.widget.current_slot(), slot);

    let render = h.widget.render();
    assert_eq!(render.text(Element::TextContent(slot, TextField::Title)), Some("C"));
    assert_eq!(render.text(Element::TextContent(slot, TextField::Artist)), Some("D"));
    assert_eq!(render.background(Element::Art(slot)), artwork);
    assert_eq!(render.created_count(), 1);
    assert!(h.widget.scroll_state(slot, TextField::Title).enabled);
    assert_eq!(h.expect_poll().as_deref(), Some("2"));
}

#[test]
fn explicit_song_changed_forces_a_refetch() {
    let mut h = Harness::new();
    h.reply(&song("A", "/x.png", 1, true));
    let url = h.expect_fetch();
    h.deliver_artwork(&url);
    h.widget.advance(Duration::from_millis(250));

    h.reply(r#"{"title":"A","artist":"B","art_url":"/x.png","timestamp":2,"song_changed":true}"#);
    assert_eq!(h.expect_fetch(), "http://localhost:6969/x.png");
}

#[test]
fn missing_art_url_uses_the_artwork_endpoint() {
    let mut h = Harness::new();
    h.reply(r#"{"title":"A","artist":"B","timestamp":1}"#);
    assert_eq!(h.expect_fetch(), "http://localhost:6969/get-song-artwork");
}

#[test]
fn failed_artwork_still_shows_the_new_track() {
    let mut h = Harness::new();
    h.reply(&song("A", "/x.png", 1, true));
    h.expect_fetch();
    h.widget.on_artwork(Err(AppError::Server { status: 404 }));

    assert!(h.widget.is_crossfading());
    h.widget.advance(Duration::from_millis(250));
    let render = h.widget.render();
    assert_eq!(
        render.text(Element::TextContent(Slot::B, TextField::Title)),
        Some("A")
    );
    assert_eq!(render.background(Element::Art(Slot::B)), None);
    assert_eq!(h.widget.live_artwork(), 0);
    assert_eq!(h.expect_poll().as_deref(), Some("1"));
}

#[test]
fn poll_loop_survives_every_failure_mode() {
    let mut h = Harness::new();
    let failures = [
        PollOutcome::TransportError("connection reset".into()),
        PollOutcome::ServerError(500),
        h.client.classify(200, "not json"),
        h.client.classify(200, r#"{"artist":"B"}"#),
    ];

    for failure in failures {
        h.expect_poll();
        h.widget.on_poll_outcome(failure);
        assert!(h.widget.take_commands().is_empty());
        h.widget.advance(Duration::from_millis(5000));
    }

    // 304 goes straight back out with the same cursor.
    h.expect_poll();
    h.widget.on_poll_outcome(PollOutcome::Unchanged);
    assert_eq!(h.expect_poll(), None);
}

#[test]
fn every_replaced_artwork_is_released_exactly_once() {
    let mut h = Harness::new();
    let changes = 6;
    for n in 0..changes {
        h.reply(&song(&format!("Track {}", n), &format!("/art/{}.png", n), n, true));
        let url = h.expect_fetch();
        h.deliver_artwork(&url);
        h.widget.advance(Duration::from_millis(250));
    }

    let render = h.widget.render();
    assert_eq!(render.created_count(), changes as usize);
    assert_eq!(render.released().len(), changes as usize - 1);
    assert_eq!(render.live_resources(), 1);
    assert_eq!(h.widget.live_artwork(), 1);

    h.widget.on_signal(RenderSignal::Teardown);
    let render = h.widget.render();
    assert_eq!(render.released().len(), render.created_count());
    let mut released = render.released().to_vec();
    released.sort_by_key(|id| id.0);
    released.dedup();
    assert_eq!(released.len(), changes as usize);
}

#[test]
fn pause_hides_the_widget_and_resume_shows_it() {
    let mut h = Harness::new();
    h.reply(&song("A", "", 1, true));
    h.widget.advance(Duration::from_millis(250));

    h.reply(&song("A", "", 2, false));
    h.widget.advance(Duration::from_millis(5000));
    assert!(h.widget.render().has_class(Element::Root, CLASS_HIDING));
    h.widget.advance(Duration::from_millis(1000));
    assert!(h.widget.render().has_class(Element::Root, CLASS_HIDDEN));
    assert!(!h.widget.visibility_state().shown);

    h.reply(&song("A", "", 3, true));
    assert!(!h.widget.render().has_class(Element::Root, CLASS_HIDDEN));
    assert!(h.widget.visibility_state().shown);
}

#[test]
fn long_title_scrolls_after_the_pause() {
    let mut h = Harness::new();
    let title = "An exceptionally long track title that cannot fit";
    h.reply(&song(title, "", 1, true));
    h.widget.advance(Duration::from_millis(250));

    let state = h.widget.scroll_state(Slot::B, TextField::Title);
    assert!(state.needs_scroll);
    assert_eq!(state.phase, ScrollPhase::Paused);

    h.widget.advance(Duration::from_millis(4000));
    let state = h.widget.scroll_state(Slot::B, TextField::Title);
    assert_eq!(state.phase, ScrollPhase::Scrolling);
    assert!(h
        .widget
        .render()
        .animation(Element::TextContent(Slot::B, TextField::Title))
        .is_some());

    let generation = h
        .widget
        .render()
        .animation(Element::TextContent(Slot::B, TextField::Title))
        .map(|animation| animation.generation)
        .unwrap();
    h.widget.on_signal(RenderSignal::SegmentFinished {
        element: Element::TextContent(Slot::B, TextField::Title),
        generation,
    });
    assert_eq!(
        h.widget.scroll_state(Slot::B, TextField::Title).phase,
        ScrollPhase::Paused
    );
}

#[test]
fn widget_without_a_title_region_is_not_created() {
    let config = WidgetConfig::default();
    let render =
        HeadlessRenderer::new(&config).without_element(Element::Text(Slot::B, TextField::Title));
    let result = NowPlayingWidget::new(config, render);
    assert!(matches!(result, Err(AppError::Render(_))));
}
