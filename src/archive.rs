//! Monthly rainfall records keyed by year.
//!
//! The on-disk form is a JSON object mapping a year to its monthly totals:
//!
//! ```json
//! { "1997": [31.2, 55.0, "Trace", 120.4, ...], "1998": [...] }
//! ```
//!
//! Entries that are not usable numbers (`null`, `"Trace"`, `"***"`, empty
//! strings, negatives) are read as 0.0.

use anyhow::{Context, Result};
use serde_json::Value;
use std::{collections::BTreeMap, fs, path::Path};

/// Series used whenever a year has no record.
pub const DEFAULT_SERIES: [f64; 12] = [
    15.2, 8.7, 45.3, 78.9, 156.4, 234.7, 298.5, 267.3, 189.6, 67.8, 23.4, 12.1,
];

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RainfallArchive {
    years: BTreeMap<i32, Vec<f64>>,
}

impl RainfallArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-year archive holding [`DEFAULT_SERIES`].
    pub fn builtin(year: i32) -> Self {
        let mut a = Self::new();
        a.insert(year, DEFAULT_SERIES.to_vec());
        a
    }

    pub fn insert(&mut self, year: i32, months: Vec<f64>) {
        let months = months
            .into_iter()
            .map(|v| if v.is_finite() && v > 0.0 { v } else { 0.0 })
            .collect();
        self.years.insert(year, months);
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn contains(&self, year: i32) -> bool {
        self.years.contains_key(&year)
    }

    pub fn get(&self, year: i32) -> Option<&[f64]> {
        self.years.get(&year).map(Vec::as_slice)
    }

    /// Recorded months for `year`, or the default series.
    pub fn series_for(&self, year: i32) -> &[f64] {
        match self.years.get(&year) {
            Some(v) if !v.is_empty() => v.as_slice(),
            _ => &DEFAULT_SERIES[..],
        }
    }

    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        let lo = *self.years.keys().next()?;
        let hi = *self.years.keys().next_back()?;
        Some((lo, hi))
    }

    /// Smallest and largest monthly value recorded for `year`.
    pub fn month_range(&self, year: i32) -> Option<(f64, f64)> {
        let v = self.years.get(&year)?;
        if v.is_empty() {
            return None;
        }
        let lo = v.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((lo, hi))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<Value>> =
            serde_json::from_str(s).context("archive is not a year -> months object")?;

        let mut archive = Self::new();
        for (key, values) in raw {
            let Ok(year) = key.trim().parse::<i32>() else {
                log::warn!("skipping archive entry with non-year key {key:?}");
                continue;
            };
            archive.insert(year, values.iter().map(month_value).collect());
        }
        Ok(archive)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading archive {}", path.display()))?;
        let archive = Self::from_json_str(&s)
            .with_context(|| format!("parsing archive {}", path.display()))?;
        log::info!(
            "loaded {} years of rainfall from {}",
            archive.len(),
            path.display()
        );
        Ok(archive)
    }
}

/// Summary of one year's months, as shown next to its bar chart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonthStats {
    /// Index of the wettest month; the first one wins on ties.
    pub highest: usize,
    /// Index of the driest month; the first one wins on ties.
    pub lowest: usize,
    pub max: f64,
    pub min: f64,
    pub mean: f64,
}

impl MonthStats {
    pub fn of(values: &[f64]) -> Option<Self> {
        let (first, rest) = values.split_first()?;
        let mut s = Self {
            highest: 0,
            lowest: 0,
            max: *first,
            min: *first,
            mean: 0.0,
        };
        for (i, &v) in rest.iter().enumerate() {
            if v > s.max {
                s.max = v;
                s.highest = i + 1;
            }
            if v < s.min {
                s.min = v;
                s.lowest = i + 1;
            }
        }
        s.mean = values.iter().sum::<f64>() / values.len() as f64;
        Some(s)
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Tab-separated month table plus statistics for a recorded year, or
/// `None` when the year is not in the archive.
pub fn rainfall_table(archive: &RainfallArchive, year: i32) -> Option<String> {
    let values = archive.get(year)?;
    let cells: Vec<String> = values.iter().map(|v| format!("{v:.1}")).collect();
    let mut out = format!(
        "Rainfall Monthly Rate Table for {year}\nMonth\t{}\nRain(mm)\t{}\n",
        MONTHS.join("\t"),
        cells.join("\t")
    );
    if let Some(s) = MonthStats::of(values) {
        out.push_str(&format!(
            "\nHighest: {:.1} mm\nLowest: {:.1} mm\nAverage: {:.1} mm\nRange: {:.1} mm\n",
            s.max,
            s.min,
            s.mean,
            s.range()
        ));
    }
    Some(out)
}

fn month_value(v: &Value) -> f64 {
    let x = match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Maps a month's value into an audible-style level in [0.05, 1.0] relative
/// to the year's driest and wettest months.
pub fn month_level(value: f64, range: Option<(f64, f64)>) -> f64 {
    let t = match range {
        Some((lo, hi)) if hi > lo => (value - lo) / (hi - lo),
        _ => 0.0,
    };
    0.05 + t.clamp(0.0, 1.0).powf(0.9) * 0.95
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coerces_markers() {
        let a = RainfallArchive::from_json_str(
            r#"{ "2001": [1.5, "Trace", "***", "", null, "12.25", -4, 7] }"#,
        )
        .unwrap();
        assert_eq!(
            a.get(2001).unwrap(),
            &[1.5, 0.0, 0.0, 0.0, 0.0, 12.25, 0.0, 7.0]
        );
    }

    #[test]
    fn test_parse_skips_bad_keys() {
        let a = RainfallArchive::from_json_str(r#"{ "total": [1], "1999": [2] }"#).unwrap();
        assert_eq!(a.len(), 1);
        assert!(a.contains(1999));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(RainfallArchive::from_json_str("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_missing_year_falls_back() {
        let a = RainfallArchive::from_json_str(r#"{ "1990": [3, 4] }"#).unwrap();
        assert_eq!(a.series_for(1990), &[3.0, 4.0]);
        assert_eq!(a.series_for(1991), &DEFAULT_SERIES);
    }

    #[test]
    fn test_empty_record_falls_back() {
        let mut a = RainfallArchive::new();
        a.insert(2000, vec![]);
        assert_eq!(a.series_for(2000), &DEFAULT_SERIES);
        assert_eq!(a.month_range(2000), None);
    }

    #[test]
    fn test_bounds_and_range() {
        let a = RainfallArchive::from_json_str(r#"{ "1990": [3, 9, 1], "1884": [0], "2025": [5] }"#)
            .unwrap();
        assert_eq!(a.year_bounds(), Some((1884, 2025)));
        assert_eq!(a.month_range(1990), Some((1.0, 9.0)));
        assert_eq!(RainfallArchive::new().year_bounds(), None);
    }

    #[test]
    fn test_month_stats_picks_extremes() {
        let s = MonthStats::of(&DEFAULT_SERIES).unwrap();
        assert_eq!(s.highest, 6);
        assert_eq!(s.lowest, 1);
        assert_eq!(s.max, 298.5);
        assert_eq!(s.min, 8.7);
        assert!((s.range() - 289.8).abs() < 1e-9);
        assert_eq!(MonthStats::of(&[]), None);
    }

    #[test]
    fn test_month_stats_ties_take_first() {
        let s = MonthStats::of(&[0.0, 5.0, 0.0, 5.0]).unwrap();
        assert_eq!(s.highest, 1);
        assert_eq!(s.lowest, 0);
        assert_eq!(s.mean, 2.5);
    }

    #[test]
    fn test_rainfall_table() {
        let a = RainfallArchive::builtin(1997);
        let t = rainfall_table(&a, 1997).unwrap();
        let mut lines = t.lines();
        assert_eq!(lines.next(), Some("Rainfall Monthly Rate Table for 1997"));
        assert!(lines.next().unwrap().starts_with("Month\tJan\tFeb"));
        assert!(lines.next().unwrap().starts_with("Rain(mm)\t15.2\t8.7\t45.3"));
        assert!(t.contains("Highest: 298.5 mm"));
        assert!(t.contains("Lowest: 8.7 mm"));
        assert_eq!(rainfall_table(&a, 1998), None);
    }

    #[test]
    fn test_month_level() {
        assert_eq!(month_level(5.0, None), 0.05);
        assert_eq!(month_level(5.0, Some((5.0, 5.0))), 0.05);
        assert!((month_level(9.0, Some((1.0, 9.0))) - 1.0).abs() < 1e-12);
        let mid = month_level(5.0, Some((1.0, 9.0)));
        assert!(mid > 0.05 && mid < 1.0);
    }
}
