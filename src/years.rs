use std::ops::RangeInclusive;

/// Years with no observations; never selectable.
pub const GAP: RangeInclusive<i32> = 1940..=1946;

pub const FIRST_RECORD_YEAR: i32 = 1884;

/// Selectable span of years, minus [`GAP`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn new(a: i32, b: i32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn span(&self) -> i32 {
        self.max - self.min
    }

    pub fn is_selectable(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year) && !GAP.contains(&year)
    }

    /// Nearest selectable year. Inside the gap, ties go to the earlier edge.
    ///
    /// A range lying wholly inside the gap has no selectable year; the
    /// clamped year is returned as is.
    pub fn snap(&self, year: i32) -> i32 {
        let year = year.clamp(self.min, self.max);
        if !GAP.contains(&year) {
            return year;
        }
        let low = GAP.start() - 1;
        let high = GAP.end() + 1;
        if low < self.min && high > self.max {
            return year;
        }
        if low < self.min {
            return high;
        }
        if high > self.max {
            return low;
        }
        if year - low <= high - year {
            low
        } else {
            high
        }
    }

    /// Moves `delta` years, jumping over the gap in the direction of travel.
    pub fn step(&self, year: i32, delta: i32) -> i32 {
        let target = year.saturating_add(delta).clamp(self.min, self.max);
        if !GAP.contains(&target) || delta == 0 {
            return self.snap(target);
        }
        let low = GAP.start() - 1;
        let high = GAP.end() + 1;
        if delta > 0 && high <= self.max {
            high
        } else if delta < 0 && low >= self.min {
            low
        } else {
            self.snap(target)
        }
    }

    /// Position of `year` along the range in [0,1].
    pub fn fraction(&self, year: i32) -> f64 {
        (year - self.min) as f64 / self.span().max(1) as f64
    }

    /// Inverse of [`fraction`](Self::fraction), rounded and snapped.
    pub fn from_fraction(&self, t: f64) -> i32 {
        let year = (self.min as f64 + t.clamp(0.0, 1.0) * self.span() as f64).round() as i32;
        self.snap(year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> YearRange {
        YearRange::new(FIRST_RECORD_YEAR, 2025)
    }

    #[test]
    fn test_snap_inside_gap() {
        let r = full();
        assert_eq!(r.snap(1940), 1939);
        assert_eq!(r.snap(1943), 1939);
        assert_eq!(r.snap(1944), 1947);
        assert_eq!(r.snap(1946), 1947);
        assert_eq!(r.snap(1950), 1950);
    }

    #[test]
    fn test_snap_clamps() {
        let r = full();
        assert_eq!(r.snap(1700), 1884);
        assert_eq!(r.snap(3000), 2025);
    }

    #[test]
    fn test_snap_gap_at_range_edge() {
        assert_eq!(YearRange::new(1942, 1990).snap(1942), 1947);
        assert_eq!(YearRange::new(1900, 1945).snap(1945), 1939);
    }

    #[test]
    fn test_snap_range_inside_gap() {
        let r = YearRange::new(1941, 1945);
        assert_eq!(r.snap(1943), 1943);
        assert_eq!(r.snap(1900), 1941);
        assert_eq!(r.snap(2000), 1945);
        assert!((r.min..=r.max).contains(&r.step(1943, 10)));
    }

    #[test]
    fn test_step_skips_gap() {
        let r = full();
        assert_eq!(r.step(1939, 1), 1947);
        assert_eq!(r.step(1947, -1), 1939);
        assert_eq!(r.step(1935, 10), 1947);
        assert_eq!(r.step(1950, -10), 1939);
        assert_eq!(r.step(2024, 5), 2025);
        assert_eq!(r.step(1884, -1), 1884);
    }

    #[test]
    fn test_fraction_round_trip() {
        let r = full();
        assert_eq!(r.fraction(r.min), 0.0);
        assert_eq!(r.fraction(r.max), 1.0);
        assert_eq!(r.from_fraction(0.0), 1884);
        assert_eq!(r.from_fraction(1.0), 2025);
        assert!(r.is_selectable(r.from_fraction(0.43)));
    }

    #[test]
    fn test_new_orders_bounds() {
        assert_eq!(YearRange::new(2000, 1990), YearRange { min: 1990, max: 2000 });
    }
}
