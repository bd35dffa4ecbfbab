use super::geometry::point_in_polygon;
use super::projection::Extent;
use super::spatial::FeatureGrid;

/// Rings of one polygon in EPSG:3857 metres; the first ring is the exterior
pub type Polygon = Vec<Vec<(f64, f64)>>;

/// A classified area feature
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    /// Bivariate class id (`11..=55`), if the feature carried one
    pub class: Option<i64>,
    pub polygons: Vec<Polygon>,
}

impl Feature {
    pub fn bbox(&self) -> Option<Extent> {
        self.polygons
            .iter()
            .filter_map(|rings| rings.first())
            .filter_map(|exterior| Extent::of_points(exterior))
            .reduce(Extent::union)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.polygons.iter().any(|rings| point_in_polygon(x, y, rings))
    }
}

/// Features of one vector layer plus the index used for hit testing
#[derive(Clone, Debug, Default)]
pub struct FeatureLayer {
    features: Vec<Feature>,
    bboxes: Vec<Extent>,
    grid: FeatureGrid,
    extent: Option<Extent>,
}

impl FeatureLayer {
    pub fn from_features(features: Vec<Feature>) -> Self {
        let mut layer = Self::default();
        layer.add_features(features);
        layer
    }

    /// Add features, skipping any without polygon geometry
    pub fn add_features(&mut self, features: Vec<Feature>) {
        for feature in features {
            let Some(bbox) = feature.bbox() else {
                continue;
            };
            let idx = self.features.len();
            self.grid.insert(idx, &bbox);
            self.extent = Some(match self.extent {
                Some(extent) => extent.union(bbox),
                None => bbox,
            });
            self.bboxes.push(bbox);
            self.features.push(feature);
        }
    }

    pub fn extend(&mut self, other: FeatureLayer) {
        self.add_features(other.features);
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Union of all feature bounding boxes
    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    /// Topmost (last added) feature containing the point
    pub fn feature_at(&self, x: f64, y: f64) -> Option<&Feature> {
        self.grid
            .query_point(x, y)
            .iter()
            .rev()
            .filter(|&&idx| self.bboxes[idx].contains(x, y))
            .map(|&idx| &self.features[idx])
            .find(|feature| feature.contains(x, y))
    }

    /// Indices of features whose bbox touches `bounds`
    pub fn visible_in(&self, bounds: &Extent) -> Vec<usize> {
        if self.features.len() < 64 {
            return (0..self.features.len())
                .filter(|&idx| self.bboxes[idx].intersects(bounds))
                .collect();
        }
        let mut hits = Vec::new();
        self.grid.query_into(bounds, &mut hits);
        hits.sort_unstable();
        hits.dedup();
        hits.retain(|&idx| self.bboxes[idx].intersects(bounds));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(class: i64, min: f64, size: f64) -> Feature {
        let max = min + size;
        Feature {
            class: Some(class),
            polygons: vec![vec![vec![(min, min), (max, min), (max, max), (min, max), (min, min)]]],
        }
    }

    #[test]
    fn test_feature_at_picks_containing_feature() {
        let layer = FeatureLayer::from_features(vec![
            square(11, 0.0, 10_000.0),
            square(55, 50_000.0, 10_000.0),
        ]);
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.feature_at(5_000.0, 5_000.0).unwrap().class, Some(11));
        assert_eq!(layer.feature_at(55_000.0, 55_000.0).unwrap().class, Some(55));
        assert!(layer.feature_at(30_000.0, 30_000.0).is_none());
    }

    #[test]
    fn test_extent_grows_with_features() {
        let mut layer = FeatureLayer::default();
        assert!(layer.extent().is_none());
        layer.add_features(vec![square(11, 0.0, 10.0)]);
        layer.add_features(vec![square(12, 100.0, 10.0)]);
        let extent = layer.extent().unwrap();
        assert_eq!((extent.min_x, extent.max_x), (0.0, 110.0));
    }

    #[test]
    fn test_features_without_geometry_are_skipped() {
        let layer = FeatureLayer::from_features(vec![Feature {
            class: Some(11),
            polygons: Vec::new(),
        }]);
        assert!(layer.is_empty());
    }

    #[test]
    fn test_visible_in_filters_by_bbox() {
        let layer = FeatureLayer::from_features(vec![
            square(11, 0.0, 10.0),
            square(12, 1_000.0, 10.0),
        ]);
        let bounds = Extent {
            min_x: -5.0,
            min_y: -5.0,
            max_x: 20.0,
            max_y: 20.0,
        };
        assert_eq!(layer.visible_in(&bounds), vec![0]);
    }
}
