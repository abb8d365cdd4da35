use crate::config::WidgetConfig;
use crate::error::{AppError, AppResult};
use crate::events::{
    ANIMATION_SCROLL, CLASS_EDGEMASK_BOTH, CLASS_EDGEMASK_RIGHT, PROP_EDGE_FADE,
    PROP_SCROLL_DURATION,
};
use crate::timer::{TimerId, TimerKey, TimerQueue, TimerSlot};
use crate::view::render::{
    format_ms, format_secs, Animation, Element, RenderPort, Slot, TextField, TextMetrics,
};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScrollPhase {
    Idle,
    Scrolling,
    Paused,
    Resetting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeMask {
    None,
    Right,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarqueeSettings {
    pub scroll_speed: f64,
    pub pause_time: Duration,
    pub edge_fade: Duration,
}

impl From<&WidgetConfig> for MarqueeSettings {
    fn from(config: &WidgetConfig) -> Self {
        Self {
            scroll_speed: config.scroll_speed,
            pause_time: config.pause_time(),
            edge_fade: config.edge_fade(),
        }
    }
}

/// Read-only view of a scroller, for logging and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrollState {
    pub content_width: f64,
    pub viewport_width: f64,
    pub font_size: f64,
    pub needs_scroll: bool,
    pub phase: ScrollPhase,
    pub edge_mask: EdgeMask,
    pub enabled: bool,
    pub scroll_duration: Duration,
}

/// Time for one scroll pass: the content plus a three-em gap, at
/// `scroll_speed` ems per second.
pub fn scroll_duration(content_width: f64, font_size: f64, scroll_speed: f64) -> Duration {
    Duration::from_secs_f64((content_width + 3.0 * font_size) / (font_size * scroll_speed))
}

/// Delay after scroll start at which the lead edge has fully entered the
/// viewport and the mask widens to both edges.
pub fn edge_mask_delay(content_width: f64, font_size: f64, scroll_speed: f64) -> Duration {
    Duration::from_millis((content_width * 1000.0 / (font_size * scroll_speed)).round() as u64)
}

/// Marquee state machine for one text region.
///
/// Transitions are driven only by the timers it owns, by re-measurement
/// requests, and by the rendering layer's "segment finished" signal.
#[derive(Debug)]
pub struct MarqueeScroller {
    viewport: Element,
    content: Element,
    settings: MarqueeSettings,
    metrics: Option<TextMetrics>,
    needs_scroll: bool,
    phase: ScrollPhase,
    edge_mask: EdgeMask,
    enabled: bool,
    scroll_duration: Duration,
    generation: u64,
    start_timer: TimerSlot,
    edge_timer: TimerSlot,
}

impl MarqueeScroller {
    /// Binds to a text region. Fails if the region or its inner content
    /// element is missing, since the scroller would have nothing to drive.
    pub fn bind(
        render: &dyn RenderPort,
        slot: Slot,
        field: TextField,
        settings: MarqueeSettings,
    ) -> AppResult<Self> {
        let viewport = Element::Text(slot, field);
        let content = Element::TextContent(slot, field);
        for element in [viewport, content] {
            if !render.has_element(element) {
                return Err(AppError::Render(format!(
                    "marquee region is missing element {}",
                    element
                )));
            }
        }

        Ok(Self {
            viewport,
            content,
            settings,
            metrics: None,
            needs_scroll: false,
            phase: ScrollPhase::Idle,
            edge_mask: EdgeMask::None,
            enabled: false,
            scroll_duration: Duration::ZERO,
            generation: 0,
            start_timer: TimerSlot::default(),
            edge_timer: TimerSlot::default(),
        })
    }

    pub fn viewport(&self) -> Element {
        self.viewport
    }

    pub fn content(&self) -> Element {
        self.content
    }

    /// Whether `element` is this scroller's viewport or content.
    pub fn owns(&self, element: Element) -> bool {
        element == self.viewport || element == self.content
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    pub fn state(&self) -> ScrollState {
        let metrics = self.metrics.unwrap_or(TextMetrics {
            content_width: 0.0,
            viewport_width: 0.0,
            font_size: 0.0,
        });
        ScrollState {
            content_width: metrics.content_width,
            viewport_width: metrics.viewport_width,
            font_size: metrics.font_size,
            needs_scroll: self.needs_scroll,
            phase: self.phase,
            edge_mask: self.edge_mask,
            enabled: self.enabled,
            scroll_duration: self.scroll_duration,
        }
    }

    pub fn enable(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) -> AppResult<()> {
        self.enabled = true;
        self.recompute(timers, render)
    }

    /// Forces `Idle` and suppresses recomputation until [`enable`](Self::enable).
    pub fn disable(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) -> AppResult<()> {
        self.enabled = false;
        self.stop(timers, render)
    }

    /// Content was replaced: forget the old measurement and start over.
    pub fn reset(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) -> AppResult<()> {
        self.phase = ScrollPhase::Resetting;
        self.metrics = None;
        self.stop(timers, render)?;
        if self.enabled {
            self.recompute(timers, render)?;
        }
        Ok(())
    }

    /// Re-measures after a resize or content change and decides whether to animate.
    pub fn recompute(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let metrics = render.measure_text(self.viewport)?;
        let previous = self.metrics.replace(metrics);

        if metrics.content_width <= metrics.viewport_width || metrics.font_size <= 0.0 {
            self.needs_scroll = false;
            return self.stop(timers, render);
        }

        self.needs_scroll = true;
        self.scroll_duration = scroll_duration(
            metrics.content_width,
            metrics.font_size,
            self.settings.scroll_speed,
        );
        render.set_property(
            self.content,
            PROP_SCROLL_DURATION,
            &format_secs(self.scroll_duration),
        )?;

        match self.phase {
            ScrollPhase::Scrolling => {
                let grew = previous
                    .map(|p| metrics.content_width > p.content_width)
                    .unwrap_or(true);
                if grew {
                    self.start_scrolling(timers, render)?;
                }
                Ok(())
            }
            ScrollPhase::Idle | ScrollPhase::Paused | ScrollPhase::Resetting => {
                if self.start_timer.is_pending() {
                    return Ok(());
                }
                self.phase = ScrollPhase::Paused;
                self.start_timer.schedule(
                    timers,
                    TimerKey::ScrollStart(self.viewport),
                    self.settings.pause_time,
                );
                self.set_edge_mask(render, EdgeMask::Right)
            }
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
            TimerKey::ScrollStart(_) => {
                if self.start_timer.fire(id) && self.enabled && self.needs_scroll {
                    self.start_scrolling(timers, render)?;
                }
            }
            TimerKey::EdgeMask(_) => {
                if self.edge_timer.fire(id) && self.phase == ScrollPhase::Scrolling {
                    render.set_property(
                        self.viewport,
                        PROP_EDGE_FADE,
                        &format_ms(self.settings.edge_fade),
                    )?;
                    self.set_edge_mask(render, EdgeMask::Both)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// One scroll pass finished: rest with the right edge masked, then go again.
    ///
    /// `generation` identifies the run that finished; a signal from a run
    /// that has since been restarted is ignored.
    pub fn on_segment_finished(
        &mut self,
        timers: &mut TimerQueue,
        render: &mut dyn RenderPort,
        generation: u64,
    ) -> AppResult<()> {
        if self.phase != ScrollPhase::Scrolling {
            return Ok(());
        }
        if generation != self.generation {
            log::debug!(
                "Ignoring finished scroll run {} on {}, current run is {}",
                generation,
                self.viewport,
                self.generation
            );
            return Ok(());
        }
        self.phase = ScrollPhase::Paused;
        self.edge_timer.cancel(timers);
        self.start_timer.schedule(
            timers,
            TimerKey::ScrollStart(self.viewport),
            self.settings.pause_time,
        );
        render.set_animation(self.content, None)?;
        self.set_edge_mask(render, EdgeMask::Right)
    }

    fn start_scrolling(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) -> AppResult<()> {
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => return Ok(()),
        };
        self.phase = ScrollPhase::Scrolling;
        self.generation += 1;
        self.start_timer.cancel(timers);
        self.edge_timer.schedule(
            timers,
            TimerKey::EdgeMask(self.viewport),
            edge_mask_delay(
                metrics.content_width,
                metrics.font_size,
                self.settings.scroll_speed,
            ),
        );
        self.set_edge_mask(render, EdgeMask::Right)?;
        render.set_animation(
            self.content,
            Some(Animation {
                name: ANIMATION_SCROLL,
                duration: self.scroll_duration,
                generation: self.generation,
            }),
        )
    }

    fn stop(&mut self, timers: &mut TimerQueue, render: &mut dyn RenderPort) -> AppResult<()> {
        self.start_timer.cancel(timers);
        self.edge_timer.cancel(timers);
        self.phase = ScrollPhase::Idle;
        render.set_animation(self.content, None)?;
        self.set_edge_mask(render, EdgeMask::None)
    }

    fn set_edge_mask(&mut self, render: &mut dyn RenderPort, mask: EdgeMask) -> AppResult<()> {
        self.edge_mask = mask;
        render.toggle_class(self.viewport, CLASS_EDGEMASK_RIGHT, mask == EdgeMask::Right)?;
        render.toggle_class(self.viewport, CLASS_EDGEMASK_BOTH, mask == EdgeMask::Both)
    }
}
