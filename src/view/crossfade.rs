use crate::error::{AppError, AppResult};
use crate::events::{CLASS_HIDDEN, CLASS_NEW, CLASS_OLD, PROP_CROSSFADE_DURATION};
use crate::sync::tracker::TrackSnapshot;
use crate::timer::{TimerId, TimerKey, TimerQueue, TimerSlot};
use crate::view::artwork::ArtworkResource;
use crate::view::marquee::{MarqueeScroller, MarqueeSettings};
use crate::view::render::{format_ms, Element, RenderPort, Slot, TextField};
use std::time::Duration;

fn log_render_fault(context: &str, result: AppResult<()>) {
    if let Err(e) = result {
        log::warn!("Error updating UI ({}): {}", context, e);
    }
}

/// One of the two buffers the widget swaps between.
#[derive(Debug)]
pub struct DisplaySlot {
    slot: Slot,
    title: MarqueeScroller,
    artist: MarqueeScroller,
    artwork: Option<ArtworkResource>,
}

impl DisplaySlot {
    fn bind(render: &dyn RenderPort, slot: Slot, settings: MarqueeSettings) -> AppResult<Self> {
        for element in [Element::Slot(slot), Element::Art(slot)] {
            if !render.has_element(element) {
                return Err(AppError::Render(format!(
                    "display slot is missing element {}",
                    element
                )));
            }
        }
        Ok(Self {
            slot,
            title: MarqueeScroller::bind(render, slot, TextField::Title, settings)?,
            artist: MarqueeScroller::bind(render, slot, TextField::Artist, settings)?,
            artwork: None,
        })
    }

    pub fn scroller(&self, field: TextField) -> &MarqueeScroller {
        match field {
            TextField::Title => &self.title,
            TextField::Artist => &self.artist,
        }
    }

    fn scroller_mut(&mut self, field: TextField) -> &mut MarqueeScroller {
        match field {
            TextField::Title => &mut self.title,
            TextField::Artist => &mut self.artist,
        }
    }

    pub fn artwork(&self) -> Option<&ArtworkResource> {
        self.artwork.as_ref()
    }

    fn scrollers_mut(&mut self) -> [&mut MarqueeScroller; 2] {
        [&mut self.title, &mut self.artist]
    }

    fn fill(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort, track: &TrackSnapshot) {
        log_render_fault(
            "artwork",
            render.set_background_resource(
                Element::Art(self.slot),
                self.artwork.as_ref().map(ArtworkResource::id),
            ),
        );
        self.fill_text(timers, render, track);
    }

    /// Replaces the texts and restarts both scrollers on the new content.
    fn fill_text(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort, track: &TrackSnapshot) {
        let slot = self.slot;
        for field in TextField::ALL {
            let text = match field {
                TextField::Title => &track.title,
                TextField::Artist => &track.artist,
            };
            log_render_fault("text", render.set_text(Element::TextContent(slot, field), text));
        }
        for scroller in self.scrollers_mut() {
            log_render_fault("scroller reset", scroller.reset(timers, render));
            log_render_fault("scroller enable", scroller.enable(timers, render));
        }
    }

    fn release_artwork(&mut self, render: &mut dyn RenderPort) {
        if let Some(artwork) = self.artwork.take() {
            log_render_fault(
                "artwork",
                render.set_background_resource(Element::Art(self.slot), None),
            );
            artwork.release(render);
        }
    }
}

/// Swaps "current" and "next" display slots on a track change.
///
/// New content is staged in the hidden slot, both slots animate for the
/// transition window, then the old slot is hidden and its artwork released.
/// Only one crossfade is in flight at a time.
#[derive(Debug)]
pub struct CrossfadeCoordinator {
    a: DisplaySlot,
    b: DisplaySlot,
    current: Slot,
    in_flight: bool,
    finalize: TimerSlot,
    window: Duration,
}

impl CrossfadeCoordinator {
    pub fn bind(
        render: &dyn RenderPort,
        settings: MarqueeSettings,
        window: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            a: DisplaySlot::bind(render, Slot::A, settings)?,
            b: DisplaySlot::bind(render, Slot::B, settings)?,
            current: Slot::A,
            in_flight: false,
            finalize: TimerSlot::default(),
            window,
        })
    }

    pub fn current(&self) -> Slot {
        self.current
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn slot(&self, slot: Slot) -> &DisplaySlot {
        match slot {
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut DisplaySlot {
        match slot {
            Slot::A => &mut self.a,
            Slot::B => &mut self.b,
        }
    }

    pub fn live_artwork(&self) -> usize {
        [&self.a, &self.b]
            .iter()
            .filter(|slot| slot.artwork.is_some())
            .count()
    }

    /// Shows the initial slot and hides the other one.
    pub fn activate(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) -> AppResult<()> {
        let current = self.current;
        render.set_property(
            Element::Root,
            PROP_CROSSFADE_DURATION,
            &format_ms(self.window),
        )?;
        render.toggle_class(Element::Slot(current.other()), CLASS_HIDDEN, true)?;
        render.toggle_class(Element::Slot(current), CLASS_HIDDEN, false)?;
        let slot = self.slot_mut(current);
        for scroller in slot.scrollers_mut() {
            scroller.enable(timers, render)?;
        }
        Ok(())
    }

    pub fn scroller_for_mut(&mut self, element: Element) -> Option<&mut MarqueeScroller> {
        match element {
            Element::Text(slot, field) | Element::TextContent(slot, field) => {
                Some(self.slot_mut(slot).scroller_mut(field))
            }
            _ => None,
        }
    }

    pub fn enabled_scrollers_mut(&mut self) -> impl Iterator<Item = &mut MarqueeScroller> {
        let [a_title, a_artist] = self.a.scrollers_mut();
        let [b_title, b_artist] = self.b.scrollers_mut();
        [a_title, a_artist, b_title, b_artist]
            .into_iter()
            .filter(|scroller| scroller.is_enabled())
    }

    /// Stages `track` and `artwork` in the hidden slot and starts the swap.
    ///
    /// Render faults are logged; the swap is always scheduled so the caller's
    /// loop is re-armed when it finalizes.
    pub fn begin(
        &mut self,
        timers: &mut TimerQueue,
        render: &mut dyn RenderPort,
        track: &TrackSnapshot,
        artwork: Option<ArtworkResource>,
    ) {
        if self.in_flight {
            log::warn!("Crossfade already in flight, finalizing it first");
            self.finalize.cancel(timers);
            self.finish(timers, render);
        }

        let outgoing = self.current;
        let incoming = outgoing.other();
        self.in_flight = true;
        self.finalize
            .schedule(timers, TimerKey::CrossfadeFinalize, self.window);

        let staging = self.slot_mut(incoming);
        // The hidden slot gave its artwork back at the previous finalize.
        staging.release_artwork(render);
        staging.artwork = artwork;
        staging.fill(timers, render, track);

        log_render_fault(
            "slot classes",
            render
                .toggle_class(Element::Slot(incoming), CLASS_OLD, false)
                .and_then(|_| render.toggle_class(Element::Slot(incoming), CLASS_HIDDEN, false))
                .and_then(|_| render.toggle_class(Element::Slot(incoming), CLASS_NEW, true))
                .and_then(|_| render.toggle_class(Element::Slot(outgoing), CLASS_NEW, false))
                .and_then(|_| render.toggle_class(Element::Slot(outgoing), CLASS_OLD, true)),
        );
    }

    /// Returns true when the firing timer completed a crossfade.
    pub fn on_timer(
        &mut self,
        timers: &mut TimerQueue,
        render: &mut dyn RenderPort,
        id: TimerId,
    ) -> bool {
        if !self.finalize.fire(id) || !self.in_flight {
            return false;
        }
        self.finish(timers, render);
        true
    }

    fn finish(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) {
        let outgoing = self.current;
        let incoming = outgoing.other();
        self.in_flight = false;
        self.current = incoming;

        let old = self.slot_mut(outgoing);
        for scroller in old.scrollers_mut() {
            log_render_fault("scroller disable", scroller.disable(timers, render));
        }
        log_render_fault(
            "slot classes",
            render
                .toggle_class(Element::Slot(outgoing), CLASS_OLD, false)
                .and_then(|_| render.toggle_class(Element::Slot(outgoing), CLASS_HIDDEN, true))
                .and_then(|_| render.toggle_class(Element::Slot(incoming), CLASS_NEW, false)),
        );
        // The replacement is installed and visible; the superseded artwork can go.
        old.release_artwork(render);
    }

    /// Updates the visible slot's text in place, keeping its artwork.
    pub fn refresh_text(
        &mut self,
        timers: &mut TimerQueue,
        render: &mut dyn RenderPort,
        track: &TrackSnapshot,
    ) {
        let current = self.current;
        self.slot_mut(current).fill_text(timers, render, track);
    }

    /// Releases every held artwork resource and stops all animation.
    pub fn teardown(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) {
        self.finalize.cancel(timers);
        self.in_flight = false;
        for slot in [Slot::A, Slot::B] {
            let display = self.slot_mut(slot);
            for scroller in display.scrollers_mut() {
                log_render_fault("scroller disable", scroller.disable(timers, render));
            }
            display.release_artwork(render);
        }
    }
}
