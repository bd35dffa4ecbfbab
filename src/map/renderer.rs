use rayon::prelude::*;

use crate::braille::BrailleCanvas;
use crate::map::features::FeatureLayer;
use crate::map::geometry::draw_path;
use crate::map::palette::{bivariate_color, Rgb};
use crate::map::projection::Viewport;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Below this many cells the choropleth is classified on the calling thread
const PARALLEL_CELL_THRESHOLD: usize = 2_048;

/// Display settings for the base map outlines and feature edges
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_states: bool,
    pub show_feature_edges: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_states: true,
            show_feature_edges: true,
        }
    }
}

/// Everything the map widget composites for one frame
pub struct MapLayers {
    /// Country borders (base map)
    pub outlines: BrailleCanvas,
    /// State borders (base map)
    pub states: BrailleCanvas,
    /// Feature outlines of the visible vector layer
    pub feature_edges: BrailleCanvas,
    /// Per character cell fill, row-major; empty when no vector layer is visible
    pub fills: Vec<Option<Rgb>>,
    pub cols: usize,
}

impl MapLayers {
    pub fn fill_at(&self, col: usize, row: usize) -> Option<Rgb> {
        self.fills.get(row * self.cols + col).copied().flatten()
    }
}

/// Base map geometry plus the renderer settings
pub struct MapRenderer {
    pub outlines: Vec<LineString>,
    pub states: Vec<LineString>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            outlines: Vec::new(),
            states: Vec::new(),
            settings: DisplaySettings::default(),
        }
    }

    /// Render one frame of `cols` × `rows` character cells.
    ///
    /// `base_visible` draws the base map outlines; `features` is the vector
    /// layer to fill, if one is visible.
    pub fn render(
        &self,
        cols: usize,
        rows: usize,
        viewport: &Viewport,
        base_visible: bool,
        features: Option<&FeatureLayer>,
    ) -> MapLayers {
        let mut outlines = BrailleCanvas::new(cols, rows);
        let mut states = BrailleCanvas::new(cols, rows);
        let mut feature_edges = BrailleCanvas::new(cols, rows);

        if base_visible {
            for line in &self.outlines {
                draw_path(&mut outlines, line, viewport, |v, lon, lat| v.project(lon, lat));
            }
            if self.settings.show_states {
                for line in &self.states {
                    draw_path(&mut states, line, viewport, |v, lon, lat| v.project(lon, lat));
                }
            }
        }

        let fills = match features {
            Some(layer) if !layer.is_empty() => {
                if self.settings.show_feature_edges {
                    let bounds = viewport.extent();
                    for idx in layer.visible_in(&bounds) {
                        for rings in &layer.features()[idx].polygons {
                            for ring in rings {
                                draw_path(&mut feature_edges, ring, viewport, |v, x, y| {
                                    v.project_mercator(x, y)
                                });
                            }
                        }
                    }
                }
                classify_cells(layer, viewport, cols, rows)
            }
            _ => Vec::new(),
        };

        MapLayers {
            outlines,
            states,
            feature_edges,
            fills,
            cols,
        }
    }

    /// Add a country border line (lon/lat)
    pub fn add_outline(&mut self, line: LineString) {
        self.outlines.push(line);
    }

    /// Add a state border line (lon/lat)
    pub fn add_state(&mut self, line: LineString) {
        self.states.push(line);
    }

    /// Check if any data is loaded
    pub fn has_data(&self) -> bool {
        !self.outlines.is_empty()
    }

    /// Toggle state borders
    pub fn toggle_states(&mut self) {
        self.settings.show_states = !self.settings.show_states;
    }

    /// Toggle feature outlines
    pub fn toggle_feature_edges(&mut self) {
        self.settings.show_feature_edges = !self.settings.show_feature_edges;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill colour per character cell, sampled at the cell center.
///
/// The viewport is in braille pixels: one cell spans 2×4 pixels.
pub fn classify_cells(
    layer: &FeatureLayer,
    viewport: &Viewport,
    cols: usize,
    rows: usize,
) -> Vec<Option<Rgb>> {
    let classify = |idx: usize| {
        let (col, row) = (idx % cols.max(1), idx / cols.max(1));
        let (x, y) = viewport.unproject_mercator(col as f64 * 2.0 + 1.0, row as f64 * 4.0 + 2.0);
        layer.feature_at(x, y).map(|f| bivariate_color(f.class))
    };

    let total = cols * rows;
    if total < PARALLEL_CELL_THRESHOLD {
        (0..total).map(classify).collect()
    } else {
        (0..total).into_par_iter().map(classify).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::features::Feature;
    use crate::map::lonlat_to_mercator;

    /// A square feature around (lon, lat) of half-size `d` degrees
    fn square_feature(class: i64, lon: f64, lat: f64, d: f64) -> Feature {
        let ring: Vec<(f64, f64)> = [
            (lon - d, lat - d),
            (lon + d, lat - d),
            (lon + d, lat + d),
            (lon - d, lat + d),
            (lon - d, lat - d),
        ]
        .iter()
        .map(|&(lon, lat)| lonlat_to_mercator(lon, lat))
        .collect();
        Feature {
            class: Some(class),
            polygons: vec![vec![ring]],
        }
    }

    #[test]
    fn test_center_cell_takes_feature_color() {
        let layer = FeatureLayer::from_features(vec![square_feature(55, 10.4, 51.1, 1.0)]);
        let viewport = Viewport::at_level(10.4, 51.1, 7.0, 40, 40);
        let fills = classify_cells(&layer, &viewport, 20, 10);
        assert_eq!(fills.len(), 200);
        // Cell (10, 5) is centered on pixel (21, 22), next to the view center
        assert_eq!(fills[5 * 20 + 10], Some(bivariate_color(Some(55))));
        // Corners are far outside a 2° square at this zoom
        assert_eq!(fills[0], None);
    }

    #[test]
    fn test_hidden_vector_layer_produces_no_fill() {
        let renderer = MapRenderer::new();
        let viewport = Viewport::at_level(10.4, 51.1, 5.0, 20, 20);
        let layers = renderer.render(10, 5, &viewport, true, None);
        assert!(layers.fills.is_empty());
        assert_eq!(layers.fill_at(0, 0), None);
        assert!(layers.outlines.is_empty());
    }

    #[test]
    fn test_base_outline_only_when_base_visible() {
        let mut renderer = MapRenderer::new();
        renderer.add_outline(vec![(6.0, 47.5), (15.0, 55.0)]);
        let viewport = Viewport::at_level(10.4, 51.1, 5.0, 80, 80);

        let shown = renderer.render(40, 20, &viewport, true, None);
        assert!(!shown.outlines.is_empty());

        let hidden = renderer.render(40, 20, &viewport, false, None);
        assert!(hidden.outlines.is_empty());
    }
}
