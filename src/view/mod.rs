pub mod artwork;
pub mod crossfade;
pub mod headless;
pub mod marquee;
pub mod render;
pub mod visibility;
