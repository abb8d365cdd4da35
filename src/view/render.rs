use crate::api::models::ArtworkBlob;
use crate::error::AppResult;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// One of the two double-buffered display slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TextField {
    Title,
    Artist,
}

impl TextField {
    pub const ALL: [TextField; 2] = [TextField::Title, TextField::Artist];
}

/// Addressable parts of the widget's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Element {
    Root,
    /// Column holding the text regions; its height drives the text size.
    InfoColumn,
    Slot(Slot),
    Art(Slot),
    /// Viewport of a marquee text region.
    Text(Slot, TextField),
    /// Inner content of a marquee text region, the part that translates.
    TextContent(Slot, TextField),
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Root => write!(f, "root"),
            Element::InfoColumn => write!(f, "info"),
            Element::Slot(slot) => write!(f, "slot-{:?}", slot),
            Element::Art(slot) => write!(f, "art-{:?}", slot),
            Element::Text(slot, field) => write!(f, "text-{:?}-{:?}", slot, field),
            Element::TextContent(slot, field) => write!(f, "text-{:?}-{:?}>content", slot, field),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub content_width: f64,
    pub viewport_width: f64,
    pub font_size: f64,
}

/// Handle to a display-ready artwork resource held by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub Uuid);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub name: &'static str,
    pub duration: Duration,
    /// Echoed back in `SegmentFinished` so a superseded run can be told apart.
    pub generation: u64,
}

/// Side-effecting view the state machines drive.
///
/// Mutations return errors for faults in the rendering layer (a missing
/// element, a rejected resource); callers in the steady state log and carry on.
pub trait RenderPort {
    fn has_element(&self, element: Element) -> bool;

    fn set_text(&mut self, element: Element, text: &str) -> AppResult<()>;

    fn set_background_resource(
        &mut self,
        element: Element,
        resource: Option<ResourceId>,
    ) -> AppResult<()>;

    fn toggle_class(&mut self, element: Element, class: &'static str, on: bool) -> AppResult<()>;

    /// Starts `animation` on `element`, replacing any running one; `None` stops it.
    fn set_animation(&mut self, element: Element, animation: Option<Animation>) -> AppResult<()>;

    fn set_property(&mut self, element: Element, name: &'static str, value: &str)
        -> AppResult<()>;

    fn measure_text(&self, element: Element) -> AppResult<TextMetrics>;

    fn element_height(&self, element: Element) -> AppResult<f64>;

    fn create_resource(&mut self, blob: &ArtworkBlob) -> AppResult<ResourceId>;

    fn release_resource(&mut self, id: ResourceId);
}

pub fn format_ms(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

pub fn format_secs(duration: Duration) -> String {
    format!("{}s", duration.as_secs_f64())
}

pub fn format_px(value: f64) -> String {
    format!("{}px", value)
}
