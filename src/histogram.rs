//! Area-normalized histograms over a comparison window.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::window::ComparisonWindow;

/// Equal-width bins spanning a [`ComparisonWindow`], heights scaled so the
/// histogram's area is one.
///
/// The last bin is closed on the right, so a value equal to the upper bound
/// lands in it. Values outside the window are counted in the nearest edge bin,
/// which is what clipping would do to them anyway.
///
/// # Examples
///
/// ```
/// use distcheck::{ComparisonWindow, Histogram};
///
/// let window = ComparisonWindow::new(0.0, 1.0).unwrap();
/// let hist = Histogram::new(&[0.1, 0.2, 0.9], &window, 2).unwrap();
/// assert_eq!(hist.counts(), &[2, 1]);
/// assert!((hist.area() - 1.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Histogram {
    lower: f64,
    bin_width: f64,
    counts: Vec<usize>,
    densities: Vec<f64>,
}

impl Histogram {
    /// Bin `data` into `bins` equal-width bins over `window`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `bins` is zero or `data` is empty.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn new(data: &[f64], window: &ComparisonWindow, bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(Error::InvalidConfig("histogram needs at least one bin".into()));
        }
        if data.is_empty() {
            return Err(Error::InvalidConfig(
                "histogram needs at least one value".into(),
            ));
        }

        let lower = window.lower();
        let bin_width = window.width() / bins as f64;
        let mut counts = vec![0_usize; bins];
        for &x in data {
            let pos = ((x - lower) / bin_width).floor();
            let idx = if pos <= 0.0 {
                0
            } else {
                (pos as usize).min(bins - 1)
            };
            counts[idx] += 1;
        }

        let norm = 1.0 / (data.len() as f64 * bin_width);
        let densities = counts.iter().map(|&c| c as f64 * norm).collect();

        Ok(Self {
            lower,
            bin_width,
            counts,
            densities,
        })
    }

    /// Number of bins.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Width shared by every bin.
    #[must_use]
    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// Raw counts per bin.
    #[must_use]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Area-normalized heights per bin.
    #[must_use]
    pub fn densities(&self) -> &[f64] {
        &self.densities
    }

    /// `bins + 1` bin edges from the window's lower to upper bound.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn edges(&self) -> Vec<f64> {
        (0..=self.bins())
            .map(|i| self.lower + i as f64 * self.bin_width)
            .collect()
    }

    /// `(left, right)` edges of bin `i`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_range(&self, i: usize) -> (f64, f64) {
        let left = self.lower + i as f64 * self.bin_width;
        (left, left + self.bin_width)
    }

    /// Bin midpoints.
    #[must_use]
    pub fn centers(&self) -> Vec<f64> {
        (0..self.bins())
            .map(|i| {
                let (l, r) = self.bin_range(i);
                0.5 * (l + r)
            })
            .collect()
    }

    /// `sum(height * width)`; one up to rounding.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.densities.iter().map(|d| d * self.bin_width).sum()
    }

    /// Midpoint of the tallest bin (the first one on ties).
    #[must_use]
    pub fn peak_center(&self) -> f64 {
        let mut best = 0;
        for (i, &c) in self.counts.iter().enumerate() {
            if c > self.counts[best] {
                best = i;
            }
        }
        let (l, r) = self.bin_range(best);
        0.5 * (l + r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_bound_lands_in_last_bin() {
        let w = ComparisonWindow::new(0.0, 10.0).unwrap();
        let h = Histogram::new(&[0.0, 5.0, 10.0], &w, 5).unwrap();
        assert_eq!(h.counts(), &[1, 0, 1, 0, 1]);
    }

    #[test]
    fn out_of_window_values_go_to_edge_bins() {
        let w = ComparisonWindow::new(0.0, 1.0).unwrap();
        let h = Histogram::new(&[-3.0, 0.5, 7.0], &w, 4).unwrap();
        assert_eq!(h.counts(), &[1, 0, 1, 1]);
    }

    #[test]
    fn area_is_one() {
        let w = ComparisonWindow::new(-2.0, 3.0).unwrap();
        let data: Vec<f64> = (0..1000).map(|i| -2.0 + 5.0 * f64::from(i) / 999.0).collect();
        let h = Histogram::new(&data, &w, 25).unwrap();
        assert!((h.area() - 1.0).abs() < 1e-9);
        assert_eq!(h.counts().iter().sum::<usize>(), 1000);
    }

    #[test]
    fn edges_and_centers() {
        let w = ComparisonWindow::new(1.0, 2.0).unwrap();
        let h = Histogram::new(&[1.5], &w, 4).unwrap();
        let edges = h.edges();
        assert_eq!(edges.len(), 5);
        assert!((edges[0] - 1.0).abs() < f64::EPSILON);
        assert!((edges[4] - 2.0).abs() < 1e-12);
        assert!((h.centers()[0] - 1.125).abs() < 1e-12);
        assert!((h.peak_center() - 1.625).abs() < 1e-12);
    }

    #[test]
    fn rejects_zero_bins_and_empty_data() {
        let w = ComparisonWindow::new(0.0, 1.0).unwrap();
        assert!(Histogram::new(&[0.5], &w, 0).is_err());
        assert!(Histogram::new(&[], &w, 10).is_err());
    }
}
