//! Rain-driven wave field.
//!
//! Every cell is a pure function of its position, the frame time and a few
//! scalars derived once per frame from the monthly series. Nothing is carried
//! between calls, so two calls with the same arguments agree bit for bit.

use serde::{Deserialize, Serialize};

/// Glyphs ordered from dense to sparse.
pub const GLYPHS: [char; 10] = ['@', '%', '#', '*', '+', '=', '-', ':', '.', ' '];

/// Months used when the caller hands over an empty series.
pub const FALLBACK_MONTHS: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldParams {
    /// Nominal amplitude of the data-driven speed-up.
    pub speed_factor: f64,
    /// Time scale every cell gets before data is applied.
    pub base_time_scale: f64,
    /// Global amplifier on how strongly yearly rain changes the speed.
    pub speed_multiplier: f64,
    /// Monthly mean (mm) treated as "as wet as it gets".
    pub global_mean_cap: f64,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            speed_factor: 6.0,
            base_time_scale: 20.0,
            speed_multiplier: 3.5,
            global_mean_cap: 300.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldCell {
    pub glyph: char,
    pub norm: f64,
}

/// Row-major grid of `rows * cols` cells.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityGrid {
    pub cols: usize,
    pub rows: usize,
    pub cells: Vec<FieldCell>,
}

impl DensityGrid {
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.cols + x
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&FieldCell> {
        if x < self.cols && y < self.rows {
            self.cells.get(self.idx(x, y))
        } else {
            None
        }
    }

    pub fn row(&self, y: usize) -> &[FieldCell] {
        let start = y * self.cols;
        &self.cells[start..start + self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[FieldCell]> {
        // chunks() panics on 0; an empty grid simply yields no rows
        self.cells.chunks(self.cols.max(1))
    }
}

/// Coerces a raw monthly series into something the field can always use:
/// non-finite and negative values become 0.0, an empty series becomes
/// twelve zero months.
pub fn sanitize_series(data: &[f64]) -> Vec<f64> {
    if data.is_empty() {
        return vec![0.0; FALLBACK_MONTHS];
    }
    data.iter()
        .map(|&v| if v.is_finite() && v > 0.0 { v } else { 0.0 })
        .collect()
}

/// Per-frame scalars shared by every cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesStats {
    pub max_val: f64,
    pub mean_intensity: f64,
    pub data_speed_multiplier: f64,
    pub effective_speed_factor: f64,
}

impl SeriesStats {
    /// Expects a sanitized, non-empty series.
    pub fn of(data: &[f64], params: &FieldParams) -> Self {
        let max_val = data.iter().copied().fold(1.0_f64, f64::max);
        let mean = data.iter().sum::<f64>() / data.len().max(1) as f64;
        let mean_intensity = (mean / params.global_mean_cap).clamp(0.0, 1.0);
        let mean_intensity = if mean_intensity.is_nan() { 0.0 } else { mean_intensity };

        let data_speed_multiplier = 0.3 + mean_intensity.powf(0.7) * 2.0;
        let effective_speed_factor =
            params.speed_factor * data_speed_multiplier * params.speed_multiplier;

        Self {
            max_val,
            mean_intensity,
            data_speed_multiplier,
            effective_speed_factor,
        }
    }
}

/// Which month drives column `x`.
pub fn data_index(x: usize, cols: usize, len: usize) -> usize {
    let len = len.max(1);
    let pos = (x as f64 / cols.max(1) as f64) * len as f64;
    (pos as usize).min(len - 1)
}

/// Ratio of the month behind column `x` to the series maximum.
pub fn column_intensity(data: &[f64], stats: &SeriesStats, x: usize, cols: usize) -> f64 {
    data[data_index(x, cols, data.len())] / stats.max_val
}

pub fn cell_time_scale(intensity: f64, stats: &SeriesStats, params: &FieldParams) -> f64 {
    params.base_time_scale + intensity * stats.effective_speed_factor
}

pub fn glyph_for(norm: f64) -> char {
    let last = GLYPHS.len() - 1;
    // NaN casts to 0; the clamp covers the other end
    let idx = (norm * last as f64) as usize;
    GLYPHS[idx.min(last)]
}

/// Builds one frame of the field.
///
/// `cols` and `rows` are expected to be positive; zero on either axis yields
/// an empty grid. Speed parameters are used as given.
pub fn generate(
    data: &[f64],
    time: f64,
    cols: usize,
    rows: usize,
    params: &FieldParams,
) -> DensityGrid {
    let data = sanitize_series(data);
    let stats = SeriesStats::of(&data, params);

    let mut cells = Vec::with_capacity(cols * rows);
    for y in 0..rows {
        for x in 0..cols {
            let intensity = column_intensity(&data, &stats, x, cols);
            let t = time * cell_time_scale(intensity, &stats, params);
            let norm = cell_norm(x as f64, y as f64, t, intensity);
            cells.push(FieldCell {
                glyph: glyph_for(norm),
                norm,
            });
        }
    }

    DensityGrid { cols, rows, cells }
}

fn cell_norm(x: f64, y: f64, t: f64, intensity: f64) -> f64 {
    // upward drift dominates
    let flow_x = x + t * 0.2;
    let flow_y = y - t * 0.8;

    let wave1 = (x * 0.18 + flow_y * 0.12 + t * 0.05).sin() * 0.5 + 0.5;
    let wave2 = (x * 0.08 + flow_y * 0.22 + t * 0.08).sin() * 0.4 + 0.6;
    let wave3 = (x * 0.25 + flow_y * 0.08 - t * 0.06).cos() * 0.5 + 0.5;
    let wave4 = (flow_x * 0.15 + flow_y * 0.35 + t * 0.1).sin() * 0.3 + 0.7;

    let horizontal = (x * 0.15 + t * 0.12).sin() * 0.3;
    let diagonal = (x * 0.08 + y * 0.08 + t * 0.09).cos() * 0.25;

    let combined = (wave1 + wave2 + wave3 + wave4) / 4.0 + horizontal + diagonal;
    let modulated = combined * intensity;

    let noise1 = (x * 0.5 + flow_y * 0.4 + t * 0.15).sin() * 0.2;
    let noise2 = (x * 0.7 + y * 0.3 + t * 0.12).cos() * 0.15;
    let texture = (x * 1.2 + y * 0.8 + t * 0.18).sin() * (x * 0.6 + y * 1.1).cos() * 0.25;

    // decorrelates glyph choice from the colour-density terms above
    let jitter = (x * 0.3 + y * 0.5 + t * 0.1).sin() * 0.1;

    let signal = modulated + noise1 + noise2 + texture + jitter;
    let norm = (signal.tanh() + 1.0) / 2.0;
    if norm.is_nan() {
        0.5
    } else {
        norm.clamp(0.0, 1.0)
    }
}
