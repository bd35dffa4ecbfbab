use std::f64::consts::PI;

/// WGS84 semi-major axis used by Web Mercator (EPSG:3857)
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Full Web Mercator world width in metres
const WORLD_SIZE_M: f64 = 2.0 * PI * EARTH_RADIUS_M;

const MIN_ZOOM: f64 = 0.5;
const MAX_ZOOM: f64 = 4096.0;

/// Reproject EPSG:4326 lon/lat (degrees) to EPSG:3857 metres
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-85.051_128_78, 85.051_128_78);
    let x = lon.to_radians() * EARTH_RADIUS_M;
    let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS_M;
    (x, y)
}

/// Inverse of [`lonlat_to_mercator`]
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// Axis-aligned bounding box in EPSG:3857 metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Bounding box of a point set. `None` when the set is empty.
    pub fn of_points<'a>(points: impl IntoIterator<Item = &'a (f64, f64)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let &(x, y) = iter.next()?;
        let mut extent = Extent {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        };
        for &(x, y) in iter {
            extent.min_x = extent.min_x.min(x);
            extent.min_y = extent.min_y.min(y);
            extent.max_x = extent.max_x.max(x);
            extent.max_y = extent.max_y.max(y);
        }
        Some(extent)
    }

    pub fn union(self, other: Extent) -> Extent {
        Extent {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    #[inline(always)]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    #[inline(always)]
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom factor: 1.0 fits the whole world across the canvas width
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// Viewport from a web-map zoom level (0 = one 256px world tile).
    ///
    /// Level 5 frames central Europe the way a browser window does.
    pub fn at_level(center_lon: f64, center_lat: f64, level: f64, width: usize, height: usize) -> Self {
        Self::new(center_lon, center_lat, Self::factor_for_level(level), width, height)
    }

    pub fn factor_for_level(level: f64) -> f64 {
        2f64.powf(level) / 4.0
    }

    /// Web-map zoom level equivalent of the current zoom factor
    pub fn level(&self) -> f64 {
        (self.zoom * 4.0).log2()
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let (cx, cy) = self.center_norm();
        let scale = self.scale();
        let nx = cx + dx as f64 / scale;
        let ny = (cy + dy as f64 / scale).clamp(0.0, 1.0);
        let (lon, lat) = norm_to_lonlat(nx, ny);

        // Wrap longitude
        self.center_lon = if lon > 180.0 {
            lon - 360.0
        } else if lon < -180.0 {
            lon + 360.0
        } else {
            lon
        };
        self.center_lat = lat.clamp(-85.0, 85.0);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor keeping the point under (px, py) fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Pixels per normalized world unit
    #[inline(always)]
    fn scale(&self) -> f64 {
        self.zoom * self.width.max(1) as f64
    }

    #[inline(always)]
    fn center_norm(&self) -> (f64, f64) {
        lonlat_to_norm(self.center_lon, self.center_lat)
    }

    #[inline(always)]
    fn project_norm(&self, x: f64, y: f64) -> (f64, f64) {
        let (cx, cy) = self.center_norm();
        let scale = self.scale();
        (
            (x - cx) * scale + self.width as f64 / 2.0,
            (y - cy) * scale + self.height as f64 / 2.0,
        )
    }

    #[inline(always)]
    fn unproject_norm(&self, px: f64, py: f64) -> (f64, f64) {
        let (cx, cy) = self.center_norm();
        let scale = self.scale();
        (
            (px - self.width as f64 / 2.0) / scale + cx,
            (py - self.height as f64 / 2.0) / scale + cy,
        )
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (x, y) = lonlat_to_norm(lon, lat);
        let (px, py) = self.project_norm(x, y);
        (px as i32, py as i32)
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let (x, y) = self.unproject_norm(px as f64, py as f64);
        norm_to_lonlat(x, y)
    }

    /// Project EPSG:3857 metres to pixel coordinates
    pub fn project_mercator(&self, x: f64, y: f64) -> (i32, i32) {
        let (px, py) = self.project_norm(x / WORLD_SIZE_M + 0.5, 0.5 - y / WORLD_SIZE_M);
        (px as i32, py as i32)
    }

    /// Unproject a (possibly fractional) pixel position to EPSG:3857 metres
    pub fn unproject_mercator(&self, px: f64, py: f64) -> (f64, f64) {
        let (x, y) = self.unproject_norm(px, py);
        ((x - 0.5) * WORLD_SIZE_M, (0.5 - y) * WORLD_SIZE_M)
    }

    /// Visible area in EPSG:3857 metres
    pub fn extent(&self) -> Extent {
        let (min_x, max_y) = self.unproject_mercator(0.0, 0.0);
        let (max_x, min_y) = self.unproject_mercator(self.width as f64, self.height as f64);
        Extent {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Ground distance covered by one pixel at the view center
    pub fn meters_per_pixel(&self) -> f64 {
        WORLD_SIZE_M * self.center_lat.to_radians().cos() / self.scale()
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

#[inline(always)]
fn lonlat_to_norm(lon: f64, lat: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat.clamp(-85.051_128_78, 85.051_128_78).to_radians();
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

#[inline(always)]
fn norm_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    (lon, lat)
}

/// Pick a scale-bar length of 1, 2 or 5 × 10ⁿ metres that fits in `max_cells`.
///
/// Returns the label and the bar length in cells.
pub fn scale_bar(meters_per_cell: f64, max_cells: u16) -> Option<(String, u16)> {
    if !(meters_per_cell.is_finite() && meters_per_cell > 0.0) || max_cells == 0 {
        return None;
    }
    let budget = meters_per_cell * max_cells as f64;
    let magnitude = 10f64.powf(budget.log10().floor());
    let nice = [5.0, 2.0, 1.0]
        .into_iter()
        .map(|m| m * magnitude)
        .find(|&d| d <= budget)?;
    let cells = ((nice / meters_per_cell).round() as u16).max(1);
    let label = if nice >= 1000.0 {
        format!("{} km", nice / 1000.0)
    } else {
        format!("{} m", nice)
    };
    Some((label, cells))
}

/// Pointer coordinate the way the position control prints it: `lon, lat` with 4 decimals
pub fn format_coordinate(lon: f64, lat: f64) -> String {
    format!("{:.4}, {:.4}", lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
    }

    #[test]
    fn test_mercator_round_trip_over_germany() {
        let (x, y) = lonlat_to_mercator(10.4, 51.1);
        assert!((x - 1_157_722.0).abs() < 10.0);
        assert!((y - 6_639_001.7).abs() < 1.0);
        let (lon, lat) = mercator_to_lonlat(x, y);
        assert!((lon - 10.4).abs() < 1e-9);
        assert!((lat - 51.1).abs() < 1e-9);
    }

    #[test]
    fn test_mercator_and_lonlat_projection_agree() {
        let vp = Viewport::at_level(10.4, 51.1, 7.0, 400, 200);
        let (mx, my) = lonlat_to_mercator(13.4, 52.5);
        let a = vp.project(13.4, 52.5);
        let b = vp.project_mercator(mx, my);
        assert!((a.0 - b.0).abs() <= 1 && (a.1 - b.1).abs() <= 1);
    }

    #[test]
    fn test_extent_contains_center() {
        let vp = Viewport::at_level(10.4, 51.1, 5.0, 200, 100);
        let (cx, cy) = lonlat_to_mercator(10.4, 51.1);
        let extent = vp.extent();
        assert!(extent.contains(cx, cy));
        assert!(extent.min_x < extent.max_x && extent.min_y < extent.max_y);
    }

    #[test]
    fn test_level_round_trip() {
        let vp = Viewport::at_level(0.0, 0.0, 5.0, 100, 100);
        assert!((vp.level() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_bar_picks_nice_distance() {
        let (label, cells) = scale_bar(3_000.0, 20).unwrap();
        assert_eq!(label, "50 km");
        assert_eq!(cells, 17);

        let (label, _) = scale_bar(12.0, 10).unwrap();
        assert_eq!(label, "100 m");

        assert!(scale_bar(0.0, 10).is_none());
    }

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(10.4, 51.1), "10.4000, 51.1000");
        assert_eq!(format_coordinate(0.0, 0.0), "0.0000, 0.0000");
    }
}
