use std::collections::HashMap;

use super::projection::Extent;

/// Default cell edge for feature indexing: 25 km in EPSG:3857 metres
pub const DEFAULT_CELL_SIZE_M: f64 = 25_000.0;

/// Spatial index for features using conservative approximation.
/// Each feature's bounding box is indexed into every cell it overlaps,
/// guaranteeing no false negatives while allowing false positives
/// (eliminated by the caller's exact point-in-polygon test).
#[derive(Clone, Debug)]
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl Default for FeatureGrid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE_M)
    }
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, x: f64, y: f64) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Build from feature bounding boxes
    pub fn build<'a>(bboxes: impl IntoIterator<Item = &'a Extent>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, bbox) in bboxes.into_iter().enumerate() {
            grid.insert(idx, bbox);
        }
        grid
    }

    /// Index one feature under every cell its bbox overlaps
    pub fn insert(&mut self, idx: usize, bbox: &Extent) {
        let min_cell = self.to_cell(bbox.min_x, bbox.min_y);
        let max_cell = self.to_cell(bbox.max_x, bbox.max_y);
        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                self.cells.entry((x, y)).or_default().push(idx);
            }
        }
    }

    /// Candidate features whose bbox cell covers (x, y)
    #[inline(always)]
    pub fn query_point(&self, x: f64, y: f64) -> &[usize] {
        self.cells
            .get(&self.to_cell(x, y))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append feature indices for the given bounds into results vec.
    /// May contain duplicates; caller should dedup after all queries.
    pub fn query_into(&self, bounds: &Extent, results: &mut Vec<usize>) {
        let min_cell = self.to_cell(bounds.min_x, bounds.min_y);
        let max_cell = self.to_cell(bounds.max_x, bounds.max_y);
        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Extent {
        Extent {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[test]
    fn test_point_query_finds_overlapping_features() {
        let boxes = [bbox(0.0, 0.0, 10.0, 10.0), bbox(25.0, 25.0, 30.0, 30.0)];
        let grid = FeatureGrid::build(&boxes, 10.0);
        assert_eq!(grid.query_point(5.0, 5.0), &[0]);
        assert_eq!(grid.query_point(27.0, 27.0), &[1]);
        assert!(grid.query_point(-50.0, -50.0).is_empty());
    }

    #[test]
    fn test_bounds_query_collects_every_cell() {
        let boxes = [bbox(0.0, 0.0, 5.0, 5.0), bbox(100.0, 100.0, 105.0, 105.0)];
        let grid = FeatureGrid::build(&boxes, 10.0);
        let mut hits = Vec::new();
        grid.query_into(&bbox(-10.0, -10.0, 110.0, 110.0), &mut hits);
        hits.sort_unstable();
        hits.dedup();
        assert_eq!(hits, vec![0, 1]);
    }
}
