// Rendering: raster surface capability, SVG markup for text runs, and the compositor.

pub mod compositor;
pub mod markup;
pub mod surface;

pub use compositor::Compositor;
pub use markup::TextStyle;
pub use surface::{ImageSurface, OutputFormat, RasterError, RasterSurface};
