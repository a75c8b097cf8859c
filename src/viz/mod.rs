//! Map visualization: SVG rendering of markers, observations, and an
//! optional robot trajectory overlay.

pub mod bounds;
pub mod render;
pub mod svg;

pub use bounds::BoundingBox;
pub use render::render_map_svg;
pub use svg::SvgCanvas;
