mod features;
mod geometry;
pub mod palette;
mod projection;
mod renderer;
mod spatial;

pub use features::{Feature, FeatureLayer, Polygon};
pub use projection::{
    format_coordinate, lonlat_to_mercator, mercator_to_lonlat, scale_bar, Extent, Viewport,
    EARTH_RADIUS_M,
};
pub use renderer::{classify_cells, DisplaySettings, LineString, MapLayers, MapRenderer};
