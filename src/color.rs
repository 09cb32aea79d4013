use crate::field::{DensityGrid, FieldCell};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Truncating blend; `t` is clamped to [0,1].
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let f = |a: u8, b: u8| -> u8 { channel(a as f64 + (b as f64 - a as f64) * t) };
        Rgb {
            r: f(self.r, other.r),
            g: f(self.g, other.g),
            b: f(self.b, other.b),
        }
    }

    pub fn scale(self, k: f64) -> Rgb {
        let f = |a: u8| -> u8 { channel(a as f64 * k) };
        Rgb {
            r: f(self.r),
            g: f(self.g),
            b: f(self.b),
        }
    }
}

fn channel(v: f64) -> u8 {
    // truncation toward zero, then saturate
    v.clamp(0.0, 255.0) as u8
}

/// Vivid cyan/blue anchors, top of the grid to bottom.
pub const PALETTE: [Rgb; 6] = [
    Rgb::new(20, 100, 255),
    Rgb::new(10, 150, 255),
    Rgb::new(0, 200, 255),
    Rgb::new(0, 230, 220),
    Rgb::new(60, 230, 220),
    Rgb::new(190, 245, 250),
];

/// Where dense cells are pulled to.
pub const DENSITY_ANCHOR: Rgb = Rgb::new(230, 255, 255);

/// Rows past this fraction of the grid get the bottom treatment.
pub const BOTTOM_THRESHOLD: f64 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteParams {
    /// How far top rows are washed toward white.
    pub top_whiten: f64,
    /// How far bottom rows are washed toward white.
    pub bottom_boost: f64,
}

impl Default for PaletteParams {
    fn default() -> Self {
        Self {
            top_whiten: 0.30,
            bottom_boost: 0.25,
        }
    }
}

fn row_position(row: usize, rows: usize) -> f64 {
    row as f64 / rows.saturating_sub(1).max(1) as f64
}

fn bottom_factor(t: f64) -> Option<f64> {
    (t > BOTTOM_THRESHOLD).then(|| (t - BOTTOM_THRESHOLD) / (1.0 - BOTTOM_THRESHOLD))
}

/// Samples the palette at `t` in [0,1].
pub fn palette_at(t: f64) -> Rgb {
    let segs = PALETTE.len() - 1;
    let seg_pos = t.clamp(0.0, 1.0) * segs as f64;
    let i = (seg_pos as usize).min(segs);
    let frac = seg_pos - i as f64;
    PALETTE[i].lerp(PALETTE[(i + 1).min(segs)], frac)
}

/// Vertical gradient colour for a row, before any per-cell shading.
pub fn base_color(row: usize, rows: usize, params: &PaletteParams) -> Rgb {
    let t = row_position(row, rows);
    let bottom = bottom_factor(t);

    let t_top = (t - (1.0 - t) * (params.top_whiten * 0.15)).max(0.0);
    let t_final = match bottom {
        Some(bf) => (t_top + (1.0 - t_top) * (bf * params.bottom_boost)).min(1.0),
        None => t_top,
    };
    let base = palette_at(t_final);

    let top_influence = (1.0 - t).max(0.0) * params.top_whiten;
    let bottom_influence = bottom.map_or(0.0, |bf| bf * params.bottom_boost);
    let whiten = (top_influence + bottom_influence).min(1.0);
    if whiten > 0.0 {
        base.lerp(Rgb::WHITE, whiten * 0.9)
    } else {
        base
    }
}

/// Pushes a base colour toward cyan-white as density rises.
pub fn density_tint(base: Rgb, norm: f64) -> Rgb {
    let mid = base.lerp(DENSITY_ANCHOR, norm * 0.95);
    Rgb {
        r: mid.r,
        g: channel(mid.g as f64 + 35.0 * norm),
        b: channel(mid.b as f64 + 70.0 * norm),
    }
}

/// Final on-screen colour of a cell.
///
/// `time_mod` in [0,1] nudges brightness by up to 4% either way;
/// `white_factor` blends toward white when positive (see [`twinkle`]).
/// `row` and `rows` are accepted for symmetry with [`base_color`] and do
/// not affect the result.
pub fn final_color(
    base: Rgb,
    norm: f64,
    _row: usize,
    _rows: usize,
    time_mod: f64,
    white_factor: f64,
) -> Rgb {
    let brightness = 1.0 + (time_mod - 0.5) * 0.08;
    let c = density_tint(base, norm).scale(brightness);
    if white_factor > 0.0 {
        let w = white_factor.min(1.0);
        let f = |a: u8| -> u8 { channel(255.0 * w + a as f64 * (1.0 - w)) };
        Rgb {
            r: f(c.r),
            g: f(c.g),
            b: f(c.b),
        }
    } else {
        c
    }
}

/// Slow horizontal brightness ripple, fed to [`final_color`] as `time_mod`.
pub fn column_shimmer(col: usize, time: f64) -> f64 {
    ((time * 1.2 + col as f64 * 0.12).sin() + 1.0) / 2.0
}

/// Sparse per-cell sparkle strength in [0, 0.72].
///
/// Each cell gets a fixed phase and sparsity from a hash of its position;
/// the sparkle then pulses with time.
pub fn twinkle(row: usize, col: usize, time: f64) -> f64 {
    let seed = (row as u64).wrapping_mul(1_315_423_911) ^ (col as u64).wrapping_mul(2_654_435_761);
    let phase = (seed % 1000) as f64 / 1000.0;
    let osc = ((time * 1.5 + phase * 6.28318).sin() + 1.0) / 2.0;
    let sparsity = ((seed >> 3) & 31) as f64 / 31.0;
    osc.powi(3) * 0.9 * (sparsity * 0.8)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadedCell {
    pub glyph: char,
    pub rgb: Rgb,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShadedGrid {
    pub cols: usize,
    pub rows: usize,
    pub cells: Vec<ShadedCell>,
}

impl ShadedGrid {
    pub fn row(&self, y: usize) -> &[ShadedCell] {
        let start = y * self.cols;
        &self.cells[start..start + self.cols]
    }
}

/// Colours a whole density grid with shimmer and twinkle applied.
pub fn shade_grid(grid: &DensityGrid, time: f64, params: &PaletteParams) -> ShadedGrid {
    let mut cells = Vec::with_capacity(grid.cells.len());
    for (y, row) in grid.iter_rows().enumerate() {
        let base = base_color(y, grid.rows, params);
        for (x, &FieldCell { glyph, norm }) in row.iter().enumerate() {
            let rgb = final_color(
                base,
                norm,
                y,
                grid.rows,
                column_shimmer(x, time),
                twinkle(y, x, time),
            );
            cells.push(ShadedCell { glyph, rgb });
        }
    }
    ShadedGrid {
        cols: grid.cols,
        rows: grid.rows,
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_truncates() {
        let a = Rgb::new(0, 0, 0);
        let b = Rgb::new(255, 10, 3);
        assert_eq!(a.lerp(b, 0.5), Rgb::new(127, 5, 1));
        assert_eq!(a.lerp(b, 2.0), b);
    }

    #[test]
    fn test_palette_endpoints() {
        assert_eq!(palette_at(0.0), PALETTE[0]);
        assert_eq!(palette_at(1.0), PALETTE[5]);
        assert_eq!(palette_at(0.2), PALETTE[1]);
    }

    #[test]
    fn test_no_bias_is_plain_gradient() {
        let p = PaletteParams {
            top_whiten: 0.0,
            bottom_boost: 0.0,
        };
        assert_eq!(base_color(0, 11, &p), PALETTE[0]);
        assert_eq!(base_color(10, 11, &p), PALETTE[5]);
    }

    #[test]
    fn test_top_row_is_whitened() {
        let p = PaletteParams::default();
        // t = 0: top influence 0.3, blend 0.27 toward white
        assert_eq!(base_color(0, 10, &p), Rgb::new(83, 141, 255));
    }

    #[test]
    fn test_single_row_grid() {
        let p = PaletteParams::default();
        assert_eq!(base_color(0, 1, &p), base_color(0, 2, &p));
    }

    #[test]
    fn test_density_tint_extremes() {
        let base = Rgb::new(20, 100, 255);
        assert_eq!(density_tint(base, 0.0), base);
        let full = density_tint(base, 1.0);
        assert_eq!(full.r, 219);
        assert_eq!(full.g, 255);
        assert_eq!(full.b, 255);
    }

    #[test]
    fn test_neutral_time_mod_keeps_tint() {
        let base = Rgb::new(40, 120, 200);
        assert_eq!(final_color(base, 0.3, 0, 1, 0.5, 0.0), density_tint(base, 0.3));
    }

    #[test]
    fn test_full_white_factor() {
        let base = Rgb::new(40, 120, 200);
        assert_eq!(final_color(base, 0.3, 0, 1, 0.0, 1.0), Rgb::WHITE);
    }

    #[test]
    fn test_twinkle_origin_is_quiet() {
        // seed 0: zero sparsity
        assert_eq!(twinkle(0, 0, 3.0), 0.0);
    }

    #[test]
    fn test_twinkle_range() {
        for row in 0..40 {
            for col in 0..120 {
                let w = twinkle(row, col, row as f64 * 0.37 + col as f64 * 0.11);
                assert!((0.0..=0.72 + 1e-12).contains(&w));
            }
        }
    }

    #[test]
    fn test_shimmer_range() {
        for col in 0..200 {
            let m = column_shimmer(col, col as f64 * 0.05);
            assert!((0.0..=1.0).contains(&m));
        }
    }
}
