use crate::config::WidgetConfig;
use crate::error::AppResult;
use crate::events::{
    CLASS_HIDDEN, CLASS_HIDING, CLASS_UNHIDING, PROP_HIDE_DURATION, PROP_UNHIDE_DURATION,
};
use crate::timer::{TimerId, TimerQueue, TimerKey, TimerSlot};
use crate::view::render::{format_ms, Element, RenderPort};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisibilityState {
    pub shown: bool,
    pub desired_shown: bool,
    pub animating: bool,
}

/// Debounced show/hide of the whole widget.
///
/// Only one transition animates at a time. Requests arriving mid-animation
/// only update the desired state; when the animation completes the latest
/// desired state wins.
#[derive(Debug)]
pub struct VisibilityController {
    shown: bool,
    desired_shown: bool,
    animating: bool,
    transition: TimerSlot,
    pause_hide: TimerSlot,
    hide_time: Duration,
    unhide_time: Duration,
    pause_hide_timeout: Duration,
}

impl VisibilityController {
    pub fn new(config: &WidgetConfig) -> Self {
        Self {
            shown: true,
            desired_shown: true,
            animating: false,
            transition: TimerSlot::default(),
            pause_hide: TimerSlot::default(),
            hide_time: config.hide_time(),
            unhide_time: config.unhide_time(),
            pause_hide_timeout: config.on_pause_hide_timeout(),
        }
    }

    pub fn state(&self) -> VisibilityState {
        VisibilityState {
            shown: self.shown,
            desired_shown: self.desired_shown,
            animating: self.animating,
        }
    }

    pub fn is_pause_hide_pending(&self) -> bool {
        self.pause_hide.is_pending()
    }

    /// Publishes the transition durations to the view.
    pub fn install(&self, render: &mut dyn RenderPort) -> AppResult<()> {
        render.set_property(Element::Root, PROP_HIDE_DURATION, &format_ms(self.hide_time))?;
        render.set_property(
            Element::Root,
            PROP_UNHIDE_DURATION,
            &format_ms(self.unhide_time),
        )
    }

    pub fn request_show(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) -> AppResult<()> {
        self.desired_shown = true;
        self.sync(timers, render)
    }

    pub fn request_hide(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) -> AppResult<()> {
        self.desired_shown = false;
        self.sync(timers, render)
    }

    /// Reacts to the playback flag of every applied update.
    pub fn on_playing(
        &mut self,
        timers: &mut TimerQueue,
        render: &mut dyn RenderPort,
        playing: bool,
    ) -> AppResult<()> {
        if playing {
            self.pause_hide.cancel(timers);
            self.request_show(timers, render)
        } else {
            if !self.pause_hide.is_pending() {
                self.pause_hide
                    .schedule(timers, TimerKey::PauseHide, self.pause_hide_timeout);
            }
            Ok(())
        }
    }

    pub fn on_timer(
        &mut self,
        timers: &mut TimerQueue,
        render: &mut dyn RenderPort,
        key: TimerKey,
        id: TimerId,
    ) -> AppResult<()> {
        match key {
            TimerKey::Visibility if self.transition.fire(id) => {
                self.animating = false;
                let finished = if self.shown {
                    render.toggle_class(Element::Root, CLASS_UNHIDING, false)
                } else {
                    render
                        .toggle_class(Element::Root, CLASS_HIDING, false)
                        .and_then(|_| render.toggle_class(Element::Root, CLASS_HIDDEN, true))
                };
                // A request that arrived mid-animation is applied even if the
                // class update failed.
                let next = self.sync(timers, render);
                finished.and(next)
            }
            TimerKey::PauseHide if self.pause_hide.fire(id) => {
                log::info!("Paused for {:?}, hiding", self.pause_hide_timeout);
                self.request_hide(timers, render)
            }
            _ => Ok(()),
        }
    }

    pub fn cancel(&mut self, timers: &mut TimerQueue) {
        self.transition.cancel(timers);
        self.pause_hide.cancel(timers);
        self.animating = false;
    }

    fn sync(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) -> AppResult<()> {
        if self.animating || self.shown == self.desired_shown {
            return Ok(());
        }

        self.shown = self.desired_shown;
        self.animating = true;
        if self.shown {
            self.transition
                .schedule(timers, TimerKey::Visibility, self.unhide_time);
            render.toggle_class(Element::Root, CLASS_HIDDEN, false)?;
            render.toggle_class(Element::Root, CLASS_UNHIDING, true)
        } else {
            self.transition
                .schedule(timers, TimerKey::Visibility, self.hide_time);
            render.toggle_class(Element::Root, CLASS_HIDING, true)
        }
    }
}
