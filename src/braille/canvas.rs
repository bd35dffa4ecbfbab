//! Outline raster for the map block.
//!
//! One terminal cell holds a 2x4 braille dot matrix, so a canvas of
//! `cols x rows` cells exposes `cols*2 x rows*4` addressable pixels.

/// Empty braille pattern, skipped when compositing layers
pub const BLANK: char = '\u{2800}';

/// Dot bit for pixel `(x % 2, y % 4)` inside a cell, indexed `[x][y]`.
///
/// ```text
/// 0x01 0x08
/// 0x02 0x10
/// 0x04 0x20
/// 0x40 0x80
/// ```
const DOT_BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

#[derive(Clone)]
pub struct BrailleCanvas {
    cols: usize,
    rows: usize,
    /// Dot mask per cell, row-major
    cells: Vec<u8>,
}

impl BrailleCanvas {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![0; cols * rows],
        }
    }

    /// Width in cells
    pub fn width(&self) -> usize {
        self.cols
    }

    /// Height in cells
    pub fn height(&self) -> usize {
        self.rows
    }

    fn cell_index(&self, col: usize, row: usize) -> Option<usize> {
        (col < self.cols && row < self.rows).then(|| row * self.cols + col)
    }

    /// Light the dot at pixel `(x, y)`. Pixels past the edge are dropped.
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        if let Some(idx) = self.cell_index(x / 2, y / 4) {
            self.cells[idx] |= DOT_BITS[x % 2][y % 4];
        }
    }

    /// Same as [`set_pixel`](Self::set_pixel) for projected coordinates,
    /// which go negative once a polygon leaves the viewport.
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
            self.set_pixel(x, y);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&mask| mask == 0)
    }

    pub fn glyph(&self, col: usize, row: usize) -> char {
        self.cell_index(col, row)
            .and_then(|idx| char::from_u32(0x2800 + u32::from(self.cells[idx])))
            .unwrap_or(BLANK)
    }

    #[cfg(test)]
    pub fn row_to_string(&self, row: usize) -> String {
        if row >= self.rows {
            return String::new();
        }
        (0..self.cols).map(|col| self.glyph(col, row)).collect()
    }

    #[cfg(test)]
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.rows).map(|row| self.row_to_string(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_grid_is_two_by_four_per_cell() {
        let mut canvas = BrailleCanvas::new(3, 2);
        canvas.set_pixel(5, 7);
        assert_eq!(canvas.glyph(2, 1), '⢀');
        canvas.set_pixel(6, 0);
        canvas.set_pixel(0, 8);
        assert_eq!(canvas.rows().collect::<Vec<_>>(), vec!["⠀⠀⠀", "⠀⠀⢀"]);
    }

    #[test]
    fn test_full_cell() {
        let mut canvas = BrailleCanvas::new(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y);
            }
        }
        assert_eq!(canvas.glyph(0, 0), '⣿');
    }

    #[test]
    fn test_column_edge_spans_rows() {
        let mut canvas = BrailleCanvas::new(1, 2);
        for y in 0..8 {
            canvas.set_pixel(1, y);
        }
        assert_eq!(canvas.row_to_string(0), "⢸");
        assert_eq!(canvas.row_to_string(1), "⢸");
        assert_eq!(canvas.row_to_string(2), "");
    }

    #[test]
    fn test_offscreen_pixels_dropped() {
        let mut canvas = BrailleCanvas::new(2, 2);
        canvas.set_pixel(4, 0);
        canvas.set_pixel_signed(-1, 3);
        canvas.set_pixel_signed(0, -4);
        assert!(canvas.is_empty());
        assert_eq!(canvas.glyph(5, 5), BLANK);
    }
}
