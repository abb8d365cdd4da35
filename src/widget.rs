use crate::api::models::{ArtworkBlob, PollOutcome, TrackPayload};
use crate::config::WidgetConfig;
use crate::error::AppResult;
use crate::events::{RenderSignal, PROP_TEXT_SIZE};
use crate::sync::poller::{Command, PollStep, Poller};
use crate::sync::tracker::{PlaybackTracker, TrackSnapshot};
use crate::timer::{TimerId, TimerKey, TimerQueue};
use crate::view::artwork::ArtworkResource;
use crate::view::crossfade::CrossfadeCoordinator;
use crate::view::marquee::{MarqueeSettings, ScrollState};
use crate::view::render::{format_px, Element, RenderPort, Slot, TextField};
use crate::view::visibility::{VisibilityController, VisibilityState};
use std::time::Duration;

fn log_render_fault(context: &str, result: AppResult<()>) {
    if let Err(e) = result {
        log::warn!("Error updating UI ({}): {}", context, e);
    }
}

/// The now playing widget: owns every component and all mutable state.
///
/// Nothing here blocks or performs I/O. Network work is queued as
/// [`Command`]s for the driver, whose results come back through
/// [`on_poll_outcome`](Self::on_poll_outcome) and
/// [`on_artwork`](Self::on_artwork); time moves through
/// [`advance_to`](Self::advance_to).
pub struct NowPlayingWidget<R: RenderPort> {
    config: WidgetConfig,
    render: R,
    timers: TimerQueue,
    poller: Poller,
    tracker: PlaybackTracker,
    visibility: VisibilityController,
    crossfade: CrossfadeCoordinator,
    pending_artwork: Option<String>,
    commands: Vec<Command>,
    started: bool,
    torn_down: bool,
}

impl<R: RenderPort> NowPlayingWidget<R> {
    /// Binds every component to the view. A missing element is a
    /// configuration error and no widget is created.
    pub fn new(config: WidgetConfig, render: R) -> AppResult<Self> {
        for element in [Element::Root, Element::InfoColumn] {
            if !render.has_element(element) {
                return Err(crate::error::AppError::Render(format!(
                    "widget is missing element {}",
                    element
                )));
            }
        }
        let crossfade = CrossfadeCoordinator::bind(
            &render,
            MarqueeSettings::from(&config),
            config.crossfade_window(),
        )?;

        Ok(Self {
            poller: Poller::new(config.retry_backoff()),
            tracker: PlaybackTracker::new(),
            visibility: VisibilityController::new(&config),
            crossfade,
            config,
            render,
            timers: TimerQueue::new(),
            pending_artwork: None,
            commands: Vec::new(),
            started: false,
            torn_down: false,
        })
    }

    /// Lays out the initial view and issues the first poll.
    pub fn start(&mut self) {
        if self.started || self.torn_down {
            return;
        }
        self.started = true;
        log_render_fault("text size", self.adjust_text_size());
        log_render_fault(
            "visibility",
            self.visibility.install(&mut self.render),
        );
        log_render_fault(
            "initial slot",
            self.crossfade.activate(&mut self.timers, &mut self.render),
        );
        self.rearm_poll();
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn on_poll_outcome(&mut self, outcome: PollOutcome) {
        if self.torn_down {
            return;
        }
        match self.poller.on_outcome(&mut self.timers, outcome) {
            PollStep::Deliver(payload) => self.apply_update(payload),
            PollStep::Request(command) => self.commands.push(command),
            PollStep::Backoff => {}
        }
    }

    pub fn on_artwork(&mut self, result: AppResult<ArtworkBlob>) {
        if self.torn_down {
            return;
        }
        let Some(url) = self.pending_artwork.take() else {
            log::warn!("Ignoring artwork that was not requested");
            return;
        };

        let artwork = match result {
            Ok(blob) => match ArtworkResource::create(&mut self.render, &blob) {
                Ok(resource) => Some(resource),
                Err(e) => {
                    log::warn!("Could not display artwork from {}: {}", url, e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Could not fetch artwork from {}: {}", url, e);
                None
            }
        };
        self.begin_crossfade(artwork);
    }

    pub fn on_signal(&mut self, signal: RenderSignal) {
        if self.torn_down {
            return;
        }
        match signal {
            RenderSignal::Resize { element } => self.on_resize(element),
            RenderSignal::SegmentFinished { element, generation } => {
                if let Some(scroller) = self.crossfade.scroller_for_mut(element) {
                    log_render_fault(
                        "scroll segment",
                        scroller.on_segment_finished(&mut self.timers, &mut self.render, generation),
                    );
                }
            }
            RenderSignal::Teardown => self.teardown(),
        }
    }

    /// Fires every timer due at or before `now`, in deadline order.
    pub fn advance_to(&mut self, now: Duration) {
        while let Some((id, key)) = self.timers.pop_due(now) {
            if self.torn_down {
                break;
            }
            self.dispatch_timer(key, id);
        }
        self.timers.advance_clock(now);
    }

    pub fn advance(&mut self, by: Duration) {
        let target = self.timers.now() + by;
        self.advance_to(target);
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Stops everything and releases every artwork resource still held.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        log::info!("Tearing down widget");
        self.torn_down = true;
        self.poller.cancel(&mut self.timers);
        self.visibility.cancel(&mut self.timers);
        self.crossfade.teardown(&mut self.timers, &mut self.render);
        self.pending_artwork = None;
        self.commands.clear();
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn render(&self) -> &R {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut R {
        &mut self.render
    }

    pub fn snapshot(&self) -> &TrackSnapshot {
        self.tracker.current()
    }

    pub fn cursor(&self) -> Option<&str> {
        self.poller.cursor()
    }

    pub fn current_slot(&self) -> Slot {
        self.crossfade.current()
    }

    pub fn is_crossfading(&self) -> bool {
        self.crossfade.is_in_flight()
    }

    pub fn is_artwork_pending(&self) -> bool {
        self.pending_artwork.is_some()
    }

    pub fn is_poll_in_flight(&self) -> bool {
        self.poller.is_in_flight()
    }

    pub fn visibility_state(&self) -> VisibilityState {
        self.visibility.state()
    }

    pub fn scroll_state(&self, slot: Slot, field: TextField) -> ScrollState {
        self.crossfade.slot(slot).scroller(field).state()
    }

    pub fn live_artwork(&self) -> usize {
        self.crossfade.live_artwork()
    }

    pub fn pending_timers(&self) -> Vec<TimerKey> {
        self.timers.keys().copied().collect()
    }

    fn apply_update(&mut self, payload: TrackPayload) {
        let changes = self.tracker.apply(&payload);
        let track = self.tracker.current().clone();
        if changes.content {
            log::info!("Now playing: {} - {}", track.artist, track.title);
        } else if changes.playing {
            log::info!("Playing: {}", track.playing);
        }

        log_render_fault(
            "visibility",
            self.visibility
                .on_playing(&mut self.timers, &mut self.render, track.playing),
        );

        if !changes.content {
            if changes.title || changes.artist {
                // The source says the song is the same, so the artwork stays.
                log::info!("Now playing: {} - {}", track.artist, track.title);
                self.crossfade
                    .refresh_text(&mut self.timers, &mut self.render, &track);
            }
            self.rearm_poll();
            return;
        }

        match track.artwork_ref {
            Some(url) => {
                // The poll stays parked until this fetch and its crossfade
                // are done, so at most one fetch is ever outstanding.
                self.pending_artwork = Some(url.clone());
                self.commands.push(Command::FetchArtwork { url });
            }
            None => self.begin_crossfade(None),
        }
    }

    fn begin_crossfade(&mut self, artwork: Option<ArtworkResource>) {
        let track = self.tracker.current().clone();
        self.crossfade
            .begin(&mut self.timers, &mut self.render, &track, artwork);
    }

    fn rearm_poll(&mut self) {
        if let Some(command) = self.poller.arm(&mut self.timers) {
            self.commands.push(command);
        }
    }

    fn dispatch_timer(&mut self, key: TimerKey, id: TimerId) {
        match key {
            TimerKey::PollRetry => {
                if let Some(command) = self.poller.on_retry_timer(&mut self.timers, id) {
                    self.commands.push(command);
                }
            }
            TimerKey::Visibility | TimerKey::PauseHide => log_render_fault(
                "visibility",
                self.visibility
                    .on_timer(&mut self.timers, &mut self.render, key, id),
            ),
            TimerKey::CrossfadeFinalize => {
                if self
                    .crossfade
                    .on_timer(&mut self.timers, &mut self.render, id)
                {
                    self.rearm_poll();
                }
            }
            TimerKey::ScrollStart(element) | TimerKey::EdgeMask(element) => {
                if let Some(scroller) = self.crossfade.scroller_for_mut(element) {
                    log_render_fault(
                        "scroller",
                        scroller.on_timer(&mut self.timers, &mut self.render, key, id),
                    );
                }
            }
        }
    }

    fn on_resize(&mut self, element: Element) {
        match element {
            Element::Root | Element::InfoColumn => {
                log_render_fault("text size", self.adjust_text_size());
                for scroller in self.crossfade.enabled_scrollers_mut() {
                    log_render_fault(
                        "scroller resize",
                        scroller.recompute(&mut self.timers, &mut self.render),
                    );
                }
            }
            Element::Text(..) | Element::TextContent(..) => {
                if let Some(scroller) = self.crossfade.scroller_for_mut(element) {
                    log_render_fault(
                        "scroller resize",
                        scroller.recompute(&mut self.timers, &mut self.render),
                    );
                }
            }
            Element::Slot(_) | Element::Art(_) => {}
        }
    }

    /// Text scales with the height of the info column.
    fn adjust_text_size(&mut self) -> AppResult<()> {
        let height = self.render.element_height(Element::InfoColumn)?;
        let size = height * self.config.text_size_ratio;
        self.render
            .set_property(Element::Root, PROP_TEXT_SIZE, &format_px(size))
    }
}
