use crate::api::models::ArtworkBlob;
use crate::config::WidgetConfig;
use crate::error::{AppError, AppResult};
use crate::events::{RenderSignal, PROP_TEXT_SIZE};
use crate::view::render::{Animation, Element, RenderPort, ResourceId, TextMetrics};
use base64::Engine;
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Render port without a display.
///
/// Keeps an in-memory model of everything the widget asked for, turns artwork
/// bytes into `data:` references, measures text from its character count,
/// and, when given a signal channel, reports scroll animations as finished
/// once their duration has elapsed.
pub struct HeadlessRenderer {
    viewport_width: f64,
    info_height: f64,
    text_size_ratio: f64,
    glyph_width_ratio: f64,
    missing: HashSet<Element>,
    texts: HashMap<Element, String>,
    classes: HashMap<Element, BTreeSet<&'static str>>,
    properties: HashMap<(Element, &'static str), String>,
    backgrounds: HashMap<Element, ResourceId>,
    animations: HashMap<Element, Animation>,
    resources: HashMap<ResourceId, String>,
    metrics_overrides: HashMap<Element, TextMetrics>,
    created: usize,
    released: Vec<ResourceId>,
    signals: Option<UnboundedSender<RenderSignal>>,
    animation_tasks: HashMap<Element, AbortHandle>,
}

impl HeadlessRenderer {
    pub fn new(config: &WidgetConfig) -> Self {
        Self {
            viewport_width: config.viewport_width,
            info_height: config.info_height,
            text_size_ratio: config.text_size_ratio,
            glyph_width_ratio: config.glyph_width_ratio,
            missing: HashSet::new(),
            texts: HashMap::new(),
            classes: HashMap::new(),
            properties: HashMap::new(),
            backgrounds: HashMap::new(),
            animations: HashMap::new(),
            resources: HashMap::new(),
            metrics_overrides: HashMap::new(),
            created: 0,
            released: Vec::new(),
            signals: None,
            animation_tasks: HashMap::new(),
        }
    }

    /// Reports finished scroll animations on `signals`. Requires a tokio runtime.
    pub fn with_signals(mut self, signals: UnboundedSender<RenderSignal>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Simulates a page whose layout lacks `element`.
    pub fn without_element(mut self, element: Element) -> Self {
        self.missing.insert(element);
        self
    }

    /// Pins the measurement of a text viewport, for hosts that measure themselves.
    pub fn set_text_metrics(&mut self, viewport: Element, metrics: TextMetrics) {
        self.metrics_overrides.insert(viewport, metrics);
    }

    pub fn set_info_height(&mut self, height: f64) {
        self.info_height = height;
    }

    pub fn text(&self, element: Element) -> Option<&str> {
        self.texts.get(&element).map(String::as_str)
    }

    pub fn has_class(&self, element: Element, class: &str) -> bool {
        self.classes
            .get(&element)
            .map(|set| set.contains(class))
            .unwrap_or(false)
    }

    pub fn property(&self, element: Element, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|((el, prop), _)| *el == element && *prop == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn background(&self, element: Element) -> Option<ResourceId> {
        self.backgrounds.get(&element).copied()
    }

    /// Display reference (a `data:` URI) behind a live resource.
    pub fn resource_uri(&self, id: ResourceId) -> Option<&str> {
        self.resources.get(&id).map(String::as_str)
    }

    pub fn animation(&self, element: Element) -> Option<Animation> {
        self.animations.get(&element).copied()
    }

    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn released(&self) -> &[ResourceId] {
        &self.released
    }

    pub fn live_resources(&self) -> usize {
        self.resources.len()
    }

    fn check(&self, element: Element) -> AppResult<()> {
        if self.missing.contains(&element) {
            return Err(AppError::Render(format!("no element {}", element)));
        }
        Ok(())
    }

    fn font_size(&self) -> f64 {
        self.property(Element::Root, PROP_TEXT_SIZE)
            .and_then(|v| v.trim_end_matches("px").parse::<f64>().ok())
            .unwrap_or(self.info_height * self.text_size_ratio)
    }

    fn spawn_segment_timer(&mut self, element: Element, animation: Option<Animation>) {
        if let Some(previous) = self.animation_tasks.remove(&element) {
            previous.abort();
        }
        let (Some(signals), Some(animation)) = (self.signals.clone(), animation) else {
            return;
        };
        let handle = tokio::spawn(async move {
            tokio::time::sleep(animation.duration).await;
            let _ = signals.send(RenderSignal::SegmentFinished {
                element,
                generation: animation.generation,
            });
        });
        self.animation_tasks.insert(element, handle.abort_handle());
    }
}

impl RenderPort for HeadlessRenderer {
    fn has_element(&self, element: Element) -> bool {
        !self.missing.contains(&element)
    }

    fn set_text(&mut self, element: Element, text: &str) -> AppResult<()> {
        self.check(element)?;
        log::debug!("[render] {} text = {:?}", element, text);
        self.texts.insert(element, text.to_string());
        Ok(())
    }

    fn set_background_resource(
        &mut self,
        element: Element,
        resource: Option<ResourceId>,
    ) -> AppResult<()> {
        self.check(element)?;
        match resource {
            Some(id) => {
                if !self.resources.contains_key(&id) {
                    return Err(AppError::Render(format!("{} is not a live resource", id)));
                }
                log::debug!("[render] {} background = {}", element, id);
                self.backgrounds.insert(element, id);
            }
            None => {
                log::debug!("[render] {} background cleared", element);
                self.backgrounds.remove(&element);
            }
        }
        Ok(())
    }

    fn toggle_class(&mut self, element: Element, class: &'static str, on: bool) -> AppResult<()> {
        self.check(element)?;
        let set = self.classes.entry(element).or_default();
        let changed = if on { set.insert(class) } else { set.remove(class) };
        if changed {
            log::debug!("[render] {} {}{}", element, if on { "+" } else { "-" }, class);
        }
        Ok(())
    }

    fn set_animation(&mut self, element: Element, animation: Option<Animation>) -> AppResult<()> {
        self.check(element)?;
        match animation {
            Some(animation) => {
                log::debug!(
                    "[render] {} animation {} for {:?}",
                    element,
                    animation.name,
                    animation.duration
                );
                self.animations.insert(element, animation);
            }
            None => {
                self.animations.remove(&element);
            }
        }
        self.spawn_segment_timer(element, animation);
        Ok(())
    }

    fn set_property(
        &mut self,
        element: Element,
        name: &'static str,
        value: &str,
    ) -> AppResult<()> {
        self.check(element)?;
        log::debug!("[render] {} {} = {}", element, name, value);
        self.properties.insert((element, name), value.to_string());
        Ok(())
    }

    fn measure_text(&self, element: Element) -> AppResult<TextMetrics> {
        self.check(element)?;
        if let Some(metrics) = self.metrics_overrides.get(&element) {
            return Ok(*metrics);
        }
        let content = match element {
            Element::Text(slot, field) | Element::TextContent(slot, field) => {
                Element::TextContent(slot, field)
            }
            other => {
                return Err(AppError::Render(format!("{} is not a text region", other)));
            }
        };
        self.check(content)?;
        let font_size = self.font_size();
        let chars = self.text(content).map(|t| t.chars().count()).unwrap_or(0);
        Ok(TextMetrics {
            content_width: chars as f64 * font_size * self.glyph_width_ratio,
            viewport_width: self.viewport_width,
            font_size,
        })
    }

    fn element_height(&self, element: Element) -> AppResult<f64> {
        self.check(element)?;
        Ok(self.info_height)
    }

    fn create_resource(&mut self, blob: &ArtworkBlob) -> AppResult<ResourceId> {
        if blob.bytes.is_empty() {
            return Err(AppError::Artwork(format!(
                "empty artwork from {}",
                blob.source_url
            )));
        }
        let id = ResourceId(Uuid::new_v4());
        let encoded = base64::engine::general_purpose::STANDARD.encode(&blob.bytes);
        self.resources
            .insert(id, format!("data:{};base64,{}", blob.mime, encoded));
        self.created += 1;
        Ok(id)
    }

    fn release_resource(&mut self, id: ResourceId) {
        if self.resources.remove(&id).is_none() {
            log::error!("Release of unknown artwork resource {}", id);
        }
        self.backgrounds.retain(|_, bg| *bg != id);
        self.released.push(id);
    }
}

impl Drop for HeadlessRenderer {
    fn drop(&mut self) {
        for (_, handle) in self.animation_tasks.drain() {
            handle.abort();
        }
    }
}
