// weathervane-common/src/window.rs
use crate::feature::FeatureRow;

/// A fixed-length, chronologically ordered slice of feature history.
/// One window is one model input.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    rows: &'a [FeatureRow],
}

impl<'a> Window<'a> {
    pub fn rows(&self) -> &'a [FeatureRow] {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw feature matrix, one `[f64; 5]` per timestep in column order.
    pub fn matrix(&self) -> Vec<[f64; 5]> {
        self.rows.iter().map(FeatureRow::values).collect()
    }
}

/// Lazy overlapping windows of `len` rows, advancing one row per step.
///
/// Over `M` rows this yields exactly `M - len + 1` windows when `len <= M`,
/// and nothing at all when the history is too short (the caller treats that
/// as insufficient data) or when `len` is zero. Timestamp contiguity is not
/// checked; rows are trusted in the order given.
pub fn windows(rows: &[FeatureRow], len: usize) -> Windows<'_> {
    let inner = if len == 0 || len > rows.len() {
        None
    } else {
        Some(rows.windows(len))
    };
    Windows { inner }
}

/// The most recent window, used for serving. `None` when fewer than `len`
/// rows are available.
pub fn latest_window(rows: &[FeatureRow], len: usize) -> Option<Window<'_>> {
    if len == 0 || rows.len() < len {
        return None;
    }
    Some(Window {
        rows: &rows[rows.len() - len..],
    })
}

/// Iterator returned by [`windows`].
pub struct Windows<'a> {
    inner: Option<std::slice::Windows<'a, FeatureRow>>,
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next().map(|rows| Window { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn rows(n: usize) -> Vec<FeatureRow> {
        let start = Utc::now();
        (0..n)
            .map(|i| FeatureRow {
                recorded_at: start + Duration::hours(i as i64),
                temperature_c: i as f64,
                humidity_percent: 50.0,
                wind_speed_kmh: 10.0,
                pressure_hpa: 1010.0,
                precipitation_mm: 0.0,
            })
            .collect()
    }

    #[test]
    fn yields_n_minus_l_plus_one_windows() {
        let data = rows(30);
        for len in [1, 5, 10, 30] {
            let collected: Vec<_> = windows(&data, len).collect();
            assert_eq!(collected.len(), 30 - len + 1, "len={}", len);
            assert!(collected.iter().all(|w| w.len() == len));
        }
    }

    #[test]
    fn windows_stay_chronological() {
        let data = rows(12);
        for (i, window) in windows(&data, 4).enumerate() {
            let temps: Vec<f64> = window.rows().iter().map(|r| r.temperature_c).collect();
            assert_eq!(temps, vec![i as f64, i as f64 + 1.0, i as f64 + 2.0, i as f64 + 3.0]);
        }
    }

    #[test]
    fn short_history_yields_nothing() {
        let data = rows(9);
        assert_eq!(windows(&data, 10).count(), 0);
        assert!(latest_window(&data, 10).is_none());
    }

    #[test]
    fn zero_length_yields_nothing() {
        let data = rows(5);
        assert_eq!(windows(&data, 0).count(), 0);
        assert!(latest_window(&data, 0).is_none());
    }

    #[test]
    fn latest_window_is_the_most_recent_rows() {
        let data = rows(30);
        let window = latest_window(&data, 10).unwrap();
        assert_eq!(window.len(), 10);
        assert_eq!(window.rows()[0].temperature_c, 20.0);
        assert_eq!(window.rows()[9].temperature_c, 29.0);
    }
}
