use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::MapConfig;
use crate::data::{spawn_fetch, FeatureFetcher, FeatureLoad};
use crate::error::VisibilityError;
use crate::layers::wms::request_for;
use crate::layers::{LayerId, MapModel, Registry};
use crate::legend::LegendPresenter;
use crate::map::{format_coordinate, scale_bar, FeatureLayer, MapRenderer, Viewport};
use crate::switcher::{
    CheckboxTree, FallbackProbe, PrimarySwitcher, ProbeOutcome, Switcher, SwitcherRow,
};
use crate::visibility::{VisibilityChange, VisibilityCoordinator, VisibilityObserver};

/// Terminal rows not available to the map: two border lines, status bar, info line
const CHROME_ROWS: usize = 4;
/// Left and right border
const CHROME_COLS: usize = 2;

/// Shown by the position control while the pointer is off the map
pub const NO_POSITION: &str = "0.0000, 0.0000";

/// Initial view, also used by reset
#[derive(Debug, Clone, Copy)]
struct Home {
    lon: f64,
    lat: f64,
    level: f64,
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub model: MapModel,
    pub visibility: VisibilityCoordinator,
    pub legends: LegendPresenter,
    pub switcher: Switcher,
    /// Rows built by the last [`App::prepare_frame`]
    pub switcher_rows: Vec<SwitcherRow>,
    /// Selected row in `switcher_rows`
    pub cursor: Option<usize>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position, cleared when it leaves the map
    pub mouse_pos: Option<(u16, u16)>,
    home: Home,
    probe: FallbackProbe,
    pending_fetches: Vec<Receiver<FeatureLoad>>,
    /// When the one-shot size refresh after start-up is due
    size_refresh_at: Option<Instant>,
}

impl App {
    pub fn new(config: &MapConfig, width: usize, height: usize, now: Instant) -> Result<Self> {
        let registry = Registry::germany(&config.data.features, config.layers.land_cover_exclusive);
        let model = MapModel::compose(&registry)?;
        let visibility = VisibilityCoordinator::for_model(&model)?;
        let mut legends = LegendPresenter::new(&model, config.data.images_dir.clone())?;
        legends.update(&visibility);

        let home = Home {
            lon: config.view.center_lon,
            lat: config.view.center_lat,
            level: config.view.zoom,
        };
        let (pixel_width, pixel_height) = map_pixels(width, height);

        info!(
            layers = model.layers().len(),
            groups = model.groups().len(),
            "map model composed"
        );

        Ok(Self {
            viewport: Viewport::at_level(home.lon, home.lat, home.level, pixel_width, pixel_height),
            map_renderer: MapRenderer::new(),
            model,
            visibility,
            legends,
            switcher: Switcher::Primary(PrimarySwitcher::new(config.switcher.options())),
            switcher_rows: Vec::new(),
            cursor: None,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            home,
            probe: FallbackProbe::new(config.switcher.fallback_delay, now),
            pending_fetches: Vec::new(),
            size_refresh_at: Some(now + config.view.resize_delay),
        })
    }

    /// The one entry point for visibility changes.
    ///
    /// Settles the coordinator, then lets the legends see the result.
    pub fn set_layer_visible(
        &mut self,
        id: LayerId,
        visible: bool,
    ) -> Result<Vec<VisibilityChange>, VisibilityError> {
        let changes = self.visibility.set_visible(id, visible)?;
        if !changes.is_empty() {
            self.legends.visibility_changed(&changes, &self.visibility);
            if let Some(layer) = self.model.layer(id) {
                info!(
                    layer = %layer.title,
                    visible,
                    pollutant = self.model.is_pollutant(id),
                    cascaded = changes.len() - 1,
                    "layer visibility changed"
                );
            }
        }
        Ok(changes)
    }

    /// Start one background fetch per vector layer
    pub fn start_feature_fetch<F>(&mut self, mut fetcher: F)
    where
        F: FnMut() -> Box<dyn FeatureFetcher>,
    {
        let sources: Vec<(LayerId, String)> = self
            .model
            .vector_sources()
            .map(|(id, location)| (id, location.to_string()))
            .collect();
        for (id, location) in sources {
            info!(layer = id.0, %location, "fetching features");
            self.pending_fetches.push(spawn_fetch(fetcher(), id, location));
        }
    }

    /// Apply any finished fetches. Returns true if features arrived.
    pub fn poll_features(&mut self) -> bool {
        let mut loaded = Vec::new();
        self.pending_fetches.retain(|rx| match rx.try_recv() {
            Ok(load) => {
                loaded.push(load);
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => {
                warn!("feature fetch ended without a result");
                false
            }
        });

        let mut arrived = false;
        for load in loaded {
            arrived |= self.apply_feature_load(load);
        }
        arrived
    }

    /// A failed load leaves the layer empty and everything else untouched
    pub fn apply_feature_load(&mut self, load: FeatureLoad) -> bool {
        match load.result {
            Ok(features) => {
                let count = features.len();
                if self.model.add_features(load.layer, features) {
                    info!(location = %load.location, count, "features added");
                    true
                } else {
                    warn!(layer = load.layer.0, "features delivered to a non-vector layer");
                    false
                }
            }
            Err(e) => {
                warn!(location = %load.location, error = %e, "feature fetch failed");
                false
            }
        }
    }

    pub fn has_pending_fetches(&self) -> bool {
        !self.pending_fetches.is_empty()
    }

    /// Build switcher rows for the next draw
    pub fn prepare_frame(&mut self) {
        self.switcher_rows = self.switcher.rows(&self.model, &self.visibility);
        self.cursor = match self.cursor {
            Some(idx) if self.switcher_rows.get(idx).and_then(SwitcherRow::layer).is_some() => Some(idx),
            _ => None,
        };
    }

    /// Time-driven work: run the fallback probe until it has decided
    pub fn tick(&mut self, now: Instant) {
        if self.probe.is_done() {
            return;
        }
        if let Switcher::Primary(panel) = &self.switcher {
            let has_groups = !self.model.groups().is_empty();
            if self.probe.poll(now, panel.last_report(), has_groups) == ProbeOutcome::Replace {
                self.switcher = Switcher::Fallback(CheckboxTree::new());
                self.cursor = None;
            }
        }
    }

    /// Follow a terminal of `width` × `height` cells
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pixel_width, pixel_height) = map_pixels(width, height);
        if (pixel_width, pixel_height) != (self.viewport.width, self.viewport.height) {
            debug!(pixel_width, pixel_height, "map resized");
        }
        self.viewport.width = pixel_width;
        self.viewport.height = pixel_height;
    }

    /// True once, when the caller should re-measure the terminal and
    /// [`resize`](Self::resize) to it.
    pub fn size_refresh_due(&mut self, now: Instant) -> bool {
        match self.size_refresh_at {
            Some(at) if now >= at => {
                self.size_refresh_at = None;
                true
            }
            _ => false,
        }
    }

    /// The visible vector layer's features, topmost first
    pub fn visible_features(&self) -> Option<&FeatureLayer> {
        self.model
            .layers()
            .iter()
            .rev()
            .filter(|layer| self.visibility.is_visible(layer.id))
            .find_map(|layer| layer.features.as_ref())
    }

    pub fn base_visible(&self) -> bool {
        self.visibility
            .visible_layers()
            .any(|id| self.model.layer(id).is_some_and(|layer| layer.base))
    }

    /// Title and request URL of the topmost visible remote layer
    pub fn active_request(&self) -> Option<(&str, String)> {
        let bbox = self.viewport.extent();
        let (width, height) = (self.viewport.width as u32, self.viewport.height as u32);
        self.model
            .layers()
            .iter()
            .rev()
            .filter(|layer| self.visibility.is_visible(layer.id))
            .find_map(|layer| {
                request_for(&layer.source, bbox, width, height, self.viewport.level())
                    .map(|url| (layer.title.as_str(), url))
            })
    }

    /// Scale bar label and length for at most `max_cells` columns
    pub fn scale_label(&self, max_cells: u16) -> Option<(String, u16)> {
        // One character cell is two braille pixels wide
        scale_bar(self.viewport.meters_per_pixel() * 2.0, max_cells)
    }

    /// Pointer position in EPSG:4326, or the placeholder
    pub fn mouse_coordinate(&self) -> String {
        match self.mouse_pixel_pos() {
            Some((px, py)) => {
                let (lon, lat) = self.viewport.unproject(px, py);
                format_coordinate(lon, lat)
            }
            None => NO_POSITION.to_string(),
        }
    }

    /// Select the next (or previous) layer row in the open switcher
    pub fn move_cursor(&mut self, forward: bool) {
        let layer_rows: Vec<usize> = self
            .switcher_rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.layer().is_some())
            .map(|(idx, _)| idx)
            .collect();
        if layer_rows.is_empty() {
            self.cursor = None;
            return;
        }
        let pos = self
            .cursor
            .and_then(|c| layer_rows.iter().position(|&idx| idx == c));
        let next = match (pos, forward) {
            (None, true) => 0,
            (None, false) => layer_rows.len() - 1,
            (Some(p), true) => (p + 1) % layer_rows.len(),
            (Some(p), false) => (p + layer_rows.len() - 1) % layer_rows.len(),
        };
        self.cursor = Some(layer_rows[next]);
    }

    /// Click the row under the cursor
    pub fn activate_cursor(&mut self) {
        if let Some(idx) = self.cursor {
            self.click_row(idx);
        }
    }

    /// Route a switcher row click through the coordinator
    pub fn click_row(&mut self, idx: usize) {
        let Some(row) = self.switcher_rows.get(idx) else {
            return;
        };
        if let Some((id, visible)) = self.switcher.click(row) {
            self.cursor = Some(idx);
            if let Err(e) = self.set_layer_visible(id, visible) {
                warn!(error = %e, "switcher toggle rejected");
            }
            // Checkbox state comes from the coordinator
            self.prepare_frame();
        }
    }

    /// Pointer over the switcher button or panel
    pub fn hover_switcher(&mut self, over: bool) {
        if let Switcher::Primary(panel) = &mut self.switcher {
            panel.hover(over);
        }
    }

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    /// Back to the configured center and zoom
    pub fn reset_view(&mut self) {
        let (width, height) = (self.viewport.width, self.viewport.height);
        self.viewport = Viewport::at_level(self.home.lon, self.home.lat, self.home.level, width, height);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Web-map zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("z{:.1}", self.viewport.level())
    }

    /// Handle mouse drag
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            self.pan(dx * 2, dy * 4);
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Track the pointer; positions outside the map clear it
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        let inside = col >= 1
            && row >= 1
            && (px as usize) < self.viewport.width
            && (py as usize) < self.viewport.height;
        self.mouse_pos = inside.then_some((col, row));
    }

    /// Mouse position in braille pixel coordinates
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| cell_to_pixel(col, row))
    }
}

/// Braille pixel size of the map area for a terminal of `width` × `height` cells
fn map_pixels(width: usize, height: usize) -> (usize, usize) {
    // Braille gives 2x4 resolution per character
    (
        width.saturating_sub(CHROME_COLS) * 2,
        height.saturating_sub(CHROME_ROWS) * 4,
    )
}

/// Terminal cell to braille pixel, accounting for the one-cell border
fn cell_to_pixel(col: u16, row: u16) -> (i32, i32) {
    (
        (col.saturating_sub(1) as i32) * 2,
        (row.saturating_sub(1) as i32) * 4,
    )
}
