pub mod render;

pub use render::{FrameStats, Renderer, SkiaRenderer, render_text_pixmap};
