//! Request parameters for the remote image layers.
//!
//! Pixels are fetched by whatever displays them; this module only supplies
//! the URLs.

use reqwest::Url;

use crate::map::Extent;

use super::registry::{LayerSource, WMS_URL};

const WMS_VERSION: &str = "1.3.0";
const MAP_CRS: &str = "EPSG:3857";

/// Parameters of one WMS GetMap request
#[derive(Debug, Clone, PartialEq)]
pub struct GetMap<'a> {
    pub layers: &'a str,
    pub styles: Option<&'a str>,
    pub bbox: Extent,
    pub width: u32,
    pub height: u32,
}

impl GetMap<'_> {
    pub fn url(&self) -> Option<Url> {
        let bbox = format!(
            "{:.2},{:.2},{:.2},{:.2}",
            self.bbox.min_x, self.bbox.min_y, self.bbox.max_x, self.bbox.max_y
        );
        let width = self.width.to_string();
        let height = self.height.to_string();
        let params = [
            ("SERVICE", "WMS"),
            ("VERSION", WMS_VERSION),
            ("REQUEST", "GetMap"),
            ("LAYERS", self.layers),
            ("STYLES", self.styles.unwrap_or("")),
            ("CRS", MAP_CRS),
            ("BBOX", bbox.as_str()),
            ("WIDTH", width.as_str()),
            ("HEIGHT", height.as_str()),
            ("FORMAT", "image/png"),
            ("TRANSPARENT", "true"),
        ];
        let mut url = Url::parse(WMS_URL).ok()?;
        url.query_pairs_mut().extend_pairs(params);
        Some(url)
    }
}

/// Slippy-map tile containing the given EPSG:3857 point at zoom `z`
pub fn tile_for(x: f64, y: f64, z: u8) -> (u32, u32) {
    let world = 2.0 * std::f64::consts::PI * crate::map::EARTH_RADIUS_M;
    let n = 2f64.powi(z as i32);
    let tx = ((x / world + 0.5) * n).floor().clamp(0.0, n - 1.0);
    let ty = ((0.5 - y / world) * n).floor().clamp(0.0, n - 1.0);
    (tx as u32, ty as u32)
}

/// Fill an XYZ template
pub fn tile_url(template: &str, z: u8, x: u32, y: u32) -> String {
    template
        .replace("{z}", &z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}

/// The request a map client would issue for `source` over `bbox`
pub fn request_for(source: &LayerSource, bbox: Extent, width: u32, height: u32, level: f64) -> Option<String> {
    match source {
        LayerSource::Wms { layers, styles } => GetMap {
            layers,
            styles: styles.as_deref(),
            bbox,
            width,
            height,
        }
        .url()
        .map(String::from),
        LayerSource::Tile { url_template } => {
            let z = level.round().clamp(0.0, 19.0) as u8;
            let (cx, cy) = (
                (bbox.min_x + bbox.max_x) / 2.0,
                (bbox.min_y + bbox.max_y) / 2.0,
            );
            let (x, y) = tile_for(cx, cy, z);
            Some(tile_url(url_template, z, x, y))
        }
        LayerSource::Vector { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::registry::OSM_URL_TEMPLATE;

    fn germany_bbox() -> Extent {
        Extent {
            min_x: 650_000.0,
            min_y: 6_000_000.0,
            max_x: 1_700_000.0,
            max_y: 7_400_000.0,
        }
    }

    #[test]
    fn test_get_map_carries_layer_and_style() {
        let url = GetMap {
            layers: "gisgeoserver_01:GERMANY_average_no2_2022",
            styles: Some("LC_style"),
            bbox: germany_bbox(),
            width: 320,
            height: 200,
        }
        .url()
        .unwrap();

        assert!(url.as_str().starts_with(WMS_URL));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("REQUEST"), Some("GetMap"));
        assert_eq!(get("LAYERS"), Some("gisgeoserver_01:GERMANY_average_no2_2022"));
        assert_eq!(get("STYLES"), Some("LC_style"));
        assert_eq!(get("CRS"), Some("EPSG:3857"));
        assert_eq!(get("WIDTH"), Some("320"));
        assert_eq!(get("BBOX"), Some("650000.00,6000000.00,1700000.00,7400000.00"));
    }

    #[test]
    fn test_spaces_survive_encoding() {
        let url = GetMap {
            layers: "gisgeoserver_01:Germany_pm2p5_2017_2021_AAD_map _2022",
            styles: None,
            bbox: germany_bbox(),
            width: 10,
            height: 10,
        }
        .url()
        .unwrap();
        let layers = url
            .query_pairs()
            .find(|(k, _)| k == "LAYERS")
            .map(|(_, v)| v.into_owned());
        assert_eq!(
            layers.as_deref(),
            Some("gisgeoserver_01:Germany_pm2p5_2017_2021_AAD_map _2022")
        );
    }

    #[test]
    fn test_tile_for_origin() {
        assert_eq!(tile_for(0.0, 0.0, 0), (0, 0));
        assert_eq!(tile_for(1.0, -1.0, 1), (1, 1));
        assert_eq!(tile_for(-1.0, 1.0, 1), (0, 0));
    }

    #[test]
    fn test_tile_request_for_base_layer() {
        let source = LayerSource::Tile {
            url_template: OSM_URL_TEMPLATE.to_string(),
        };
        let url = request_for(&source, germany_bbox(), 100, 100, 5.0).unwrap();
        // Germany's center sits in tile (16, 10) at zoom 5
        assert_eq!(url, "https://tile.openstreetmap.org/5/16/10.png");
    }

    #[test]
    fn test_vector_layers_have_no_request() {
        let source = LayerSource::Vector {
            location: "layer/x.geojson".to_string(),
        };
        assert!(request_for(&source, germany_bbox(), 1, 1, 5.0).is_none());
    }
}
