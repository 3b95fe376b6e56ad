mod choropleth;
mod geometry;
mod layer;
mod projection;
mod renderer;
mod spatial;

pub use choropleth::{fill_color, Palette, Rgba};
pub use geometry::{is_geographic, ring_contains, BBox, Polygon, Ring};
pub use layer::{BoundaryLayer, MunicipalityGeometry, PickInfo};
pub use projection::Viewport;
pub use renderer::{DisplaySettings, LineString, MapLayers, MapRenderer};
