//! Base map geometry and the bivariate feature fetch.

mod fetch;
mod geojson_features;

pub use fetch::{
    fetch_features, spawn_fetch, FeatureFetcher, FeatureLoad, FileFetcher, HttpFetcher,
    SourceFetcher,
};
pub use geojson_features::parse_feature_collection;

use crate::map::MapRenderer;
use anyhow::Result;
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Natural Earth admin-0 boundary lines, finest first
const BORDER_FILES: [&str; 2] = ["ne_10m_borders.json", "ne_50m_borders.json"];

/// Natural Earth admin-1 polygons
const STATES_FILE: &str = "ne_10m_states.json";

/// ISO code used to keep only German states
const GERMANY_ADM0: &str = "DEU";

/// Load base map outlines from Natural Earth GeoJSON in `data_dir`.
///
/// Missing files are skipped; unreadable ones are logged and skipped.
pub fn load_base_outlines(renderer: &mut MapRenderer, data_dir: &Path) -> Result<()> {
    if let Some(path) = BORDER_FILES
        .iter()
        .map(|name| data_dir.join(name))
        .find(|path| path.exists())
    {
        match read_geojson(&path) {
            Ok(geojson) => process_geojson_lines(&geojson, |_| true, |line| renderer.add_outline(line)),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to load borders"),
        }
    }

    let states_path = data_dir.join(STATES_FILE);
    if states_path.exists() {
        match read_geojson(&states_path) {
            Ok(geojson) => process_geojson_lines(&geojson, is_german_state, |line| renderer.add_state(line)),
            Err(e) => warn!(path = %states_path.display(), error = %e, "failed to load states"),
        }
    }

    debug!(
        outlines = renderer.outlines.len(),
        states = renderer.states.len(),
        "base outlines loaded"
    );
    Ok(())
}

fn read_geojson(path: &Path) -> Result<GeoJson> {
    let content = fs::read_to_string(path)?;
    Ok(content.parse()?)
}

/// States carry `adm0_a3`; features without it are kept
fn is_german_state(feature: &geojson::Feature) -> bool {
    feature
        .property("adm0_a3")
        .and_then(|v| v.as_str())
        .map_or(true, |code| code == GERMANY_ADM0)
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<P, F>(geojson: &GeoJson, keep: P, mut add_line: F)
where
    P: Fn(&geojson::Feature) -> bool,
    F: FnMut(Vec<(f64, f64)>),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in fc.features.iter().filter(|f| keep(f)) {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                if keep(f) {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(Vec<(f64, f64)>),
{
    let to_line = |coords: &Vec<Vec<f64>>| -> Vec<(f64, f64)> {
        coords.iter().map(|c| (c[0], c[1])).collect()
    };
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => lines.iter().for_each(|coords| add_line(to_line(coords))),
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    add_line(to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

/// Coarse outline of Germany for when no Natural Earth data is available
pub fn generate_germany_outline(renderer: &mut MapRenderer) {
    renderer.add_outline(vec![
        (8.66, 54.91), (9.94, 54.60), (11.0, 54.37), (12.52, 54.47), (13.65, 54.08),
        (14.12, 53.76), (14.40, 53.25), (14.12, 52.84), (14.64, 52.58), (14.60, 51.75),
        (15.02, 51.11), (14.31, 51.12), (12.24, 50.27), (12.52, 49.55), (13.60, 48.88),
        (13.03, 48.29), (12.93, 47.64), (11.43, 47.52), (10.45, 47.56), (9.59, 47.53),
        (8.52, 47.83), (7.59, 47.58), (7.59, 48.33), (8.10, 49.00), (6.66, 49.20),
        (6.19, 49.46), (6.24, 49.90), (6.04, 50.13), (6.16, 50.80), (5.99, 51.85),
        (6.59, 51.85), (6.84, 52.23), (7.09, 53.14), (6.91, 53.48), (7.94, 53.75),
        (8.12, 53.53), (8.80, 54.02), (8.57, 54.40), (8.53, 55.0), (8.66, 54.91),
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_leave_renderer_empty() {
        let dir = TempDir::new().unwrap();
        let mut renderer = MapRenderer::new();
        load_base_outlines(&mut renderer, dir.path()).unwrap();
        assert!(!renderer.has_data());
    }

    #[test]
    fn test_states_are_filtered_to_germany() {
        let dir = TempDir::new().unwrap();
        let states = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"adm0_a3":"DEU"},
             "geometry":{"type":"Polygon","coordinates":[[[9,48],[10,48],[10,49],[9,48]]]}},
            {"type":"Feature","properties":{"adm0_a3":"FRA"},
             "geometry":{"type":"Polygon","coordinates":[[[2,48],[3,48],[3,49],[2,48]]]}}
        ]}"#;
        fs::write(dir.path().join(STATES_FILE), states).unwrap();
        let borders = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},
             "geometry":{"type":"LineString","coordinates":[[6,51],[7,52]]}}
        ]}"#;
        fs::write(dir.path().join("ne_50m_borders.json"), borders).unwrap();

        let mut renderer = MapRenderer::new();
        load_base_outlines(&mut renderer, dir.path()).unwrap();
        assert_eq!(renderer.states.len(), 1);
        assert_eq!(renderer.states[0][0], (9.0, 48.0));
        assert_eq!(renderer.outlines.len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ne_10m_borders.json"), "not json").unwrap();
        let mut renderer = MapRenderer::new();
        assert!(load_base_outlines(&mut renderer, dir.path()).is_ok());
        assert!(!renderer.has_data());
    }

    #[test]
    fn test_fallback_outline_is_closed() {
        let mut renderer = MapRenderer::new();
        generate_germany_outline(&mut renderer);
        let ring = &renderer.outlines[0];
        assert_eq!(ring.first(), ring.last());
    }
}
