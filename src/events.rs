use crate::view::render::Element;
use serde::Serialize;

// CSS classes toggled by the widget.
pub const CLASS_HIDING: &str = "hiding";
pub const CLASS_HIDDEN: &str = "hidden";
pub const CLASS_UNHIDING: &str = "unhiding";
pub const CLASS_OLD: &str = "old";
pub const CLASS_NEW: &str = "new";
pub const CLASS_EDGEMASK_RIGHT: &str = "scroll-edgemask-right";
pub const CLASS_EDGEMASK_BOTH: &str = "scroll-edgemask-both";

// Custom properties carrying animation durations and layout numbers.
pub const PROP_TEXT_SIZE: &str = "--text-size";
pub const PROP_SCROLL_DURATION: &str = "--scroll-duration";
pub const PROP_EDGE_FADE: &str = "--edge-fade-duration";
pub const PROP_HIDE_DURATION: &str = "--hide-duration";
pub const PROP_UNHIDE_DURATION: &str = "--unhide-duration";
pub const PROP_CROSSFADE_DURATION: &str = "--crossfade-duration";

// Named animations.
pub const ANIMATION_SCROLL: &str = "scroll";

/// Signals delivered by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderSignal {
    Resize { element: Element },
    SegmentFinished { element: Element, generation: u64 },
    Teardown,
}
