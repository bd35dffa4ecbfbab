use crate::braille::BrailleCanvas;
use crate::map::projection::Viewport;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a projected path, skipping segments that fall outside the viewport.
///
/// `project` maps a stored coordinate to pixels; callers pass either the
/// lon/lat or the EPSG:3857 projection of the viewport.
pub fn draw_path<F>(canvas: &mut BrailleCanvas, points: &[(f64, f64)], viewport: &Viewport, project: F)
where
    F: Fn(&Viewport, f64, f64) -> (i32, i32),
{
    if points.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;
    for &(a, b) in points {
        let p = project(viewport, a, b);
        if let Some(q) = prev {
            // Long jumps are antimeridian wraps, not real edges
            let dist = ((p.0 - q.0).abs() + (p.1 - q.1).abs()) as usize;
            if dist < viewport.width.max(1) * 4 && viewport.line_might_be_visible(q, p) {
                draw_line(canvas, q.0, q.1, p.0, p.1);
            }
        }
        prev = Some(p);
    }
}

/// Even-odd ray cast against a single closed ring
pub fn point_in_ring(x: f64, y: f64, ring: &[(f64, f64)]) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Polygon test: inside the exterior ring and outside every hole
pub fn point_in_polygon(x: f64, y: f64, rings: &[Vec<(f64, f64)>]) -> bool {
    match rings.split_first() {
        Some((exterior, holes)) => {
            point_in_ring(x, y, exterior) && !holes.iter().any(|hole| point_in_ring(x, y, hole))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Vec<(f64, f64)> {
        vec![(min, min), (max, min), (max, max), (min, max), (min, min)]
    }

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        assert_eq!(canvas.row_to_string(0), "⠉⠉⠉⠉⠉");
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert_eq!(canvas.row_to_string(0), "⡇");
        assert_eq!(canvas.row_to_string(1), "⡇");
    }

    #[test]
    fn test_point_in_ring() {
        let ring = square(0.0, 10.0);
        assert!(point_in_ring(5.0, 5.0, &ring));
        assert!(!point_in_ring(15.0, 5.0, &ring));
        assert!(!point_in_ring(5.0, -1.0, &ring));
    }

    #[test]
    fn test_polygon_hole_excludes_point() {
        let rings = vec![square(0.0, 10.0), square(4.0, 6.0)];
        assert!(point_in_polygon(2.0, 2.0, &rings));
        assert!(!point_in_polygon(5.0, 5.0, &rings));
        assert!(!point_in_polygon(5.0, 5.0, &[]));
    }

    #[test]
    fn test_draw_path_skips_degenerate() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 10, 8);
        let mut canvas = BrailleCanvas::new(5, 2);
        draw_path(&mut canvas, &[(0.0, 0.0)], &vp, |v, lon, lat| v.project(lon, lat));
        assert!(canvas.is_empty());
    }
}
