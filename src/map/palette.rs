/// An sRGB colour triple
pub type Rgb = (u8, u8, u8);

/// Fill for features whose class is missing or outside the 5×5 grid
pub const FALLBACK_FILL: Rgb = (0xcc, 0xcc, 0xcc);

/// Feature outline colour (`#333`)
pub const OUTLINE: Rgb = (0x33, 0x33, 0x33);

/// Bivariate classes `11..=55`: tens digit is the first variable's quintile,
/// units digit the second's.
#[rustfmt::skip]
const BIVARIATE: [(i64, &str); 25] = [
    (11, "#fffffe"), (12, "#ffe8ee"), (13, "#ffcbd7"), (14, "#ffaec0"), (15, "#ff88a6"),
    (21, "#ddfffd"), (22, "#cde6e5"), (23, "#c3c6cb"), (24, "#bba8b4"), (25, "#b08ea6"),
    (31, "#b9fffc"), (32, "#a4dfdd"), (33, "#95b6c3"), (34, "#8a9cad"), (35, "#7d8ba1"),
    (41, "#7cfdfd"), (42, "#64dbdc"), (43, "#54b5bd"), (44, "#4591a0"), (45, "#397e8d"),
    (51, "#50fffd"), (52, "#44d6d4"), (53, "#3c9fad"), (54, "#32788f"), (55, "#2a6682"),
];

/// Parse `#rrggbb` or `#rgb`
pub fn parse_hex(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match digits.len() {
        6 => Some((channel(&digits[0..2])?, channel(&digits[2..4])?, channel(&digits[4..6])?)),
        3 => {
            let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
            Some((expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

/// Fill colour for a bivariate class id
pub fn bivariate_color(class: Option<i64>) -> Rgb {
    class
        .and_then(|c| BIVARIATE.iter().find(|(id, _)| *id == c))
        .and_then(|(_, hex)| parse_hex(hex))
        .unwrap_or(FALLBACK_FILL)
}

/// Class ids in legend order: one row per first-variable quintile
pub fn bivariate_grid() -> [[i64; 5]; 5] {
    let mut grid = [[0; 5]; 5];
    for (row, cells) in grid.iter_mut().enumerate() {
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = (row as i64 + 1) * 10 + col as i64 + 1;
        }
    }
    grid
}
