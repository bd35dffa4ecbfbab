use geojson::{GeoJson, JsonValue, Value};

use crate::error::FetchError;
use crate::map::{lonlat_to_mercator, Feature, Polygon};

/// Property holding the bivariate class id
const CLASS_PROPERTY: &str = "bivariate";

/// Parse an EPSG:4326 feature collection and reproject it to EPSG:3857.
///
/// Only polygonal geometry is kept. The buffer is parsed in place.
pub fn parse_feature_collection(bytes: &mut [u8]) -> Result<Vec<Feature>, FetchError> {
    let geojson: GeoJson =
        simd_json::serde::from_slice(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(FetchError::Parse(
                "expected a Feature or FeatureCollection".to_string(),
            ))
        }
    };

    Ok(features
        .into_iter()
        .filter_map(|feature| {
            let class = feature.property(CLASS_PROPERTY).and_then(class_id);
            let polygons = feature.geometry.map(|g| polygons_of(&g.value))?;
            (!polygons.is_empty()).then_some(Feature { class, polygons })
        })
        .collect())
}

/// Class ids arrive as numbers or numeric strings
fn class_id(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn polygons_of(value: &Value) -> Vec<Polygon> {
    match value {
        Value::Polygon(rings) => vec![reproject_rings(rings)],
        Value::MultiPolygon(polygons) => polygons.iter().map(|rings| reproject_rings(rings)).collect(),
        Value::GeometryCollection(geometries) => geometries
            .iter()
            .flat_map(|g| polygons_of(&g.value))
            .collect(),
        _ => Vec::new(),
    }
}

fn reproject_rings(rings: &[Vec<Vec<f64>>]) -> Polygon {
    rings
        .iter()
        .map(|ring| {
            ring.iter()
                .filter(|c| c.len() >= 2)
                .map(|c| lonlat_to_mercator(c[0], c[1]))
                .collect()
        })
        .collect()
}
