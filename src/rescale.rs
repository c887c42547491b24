//! Quartile-band rescaling of arbitrary distributions onto `[0, 1]`.
//!
//! Values are split at the 25th, 50th and 75th percentiles, and each
//! band is min-max scaled into its own quarter of the unit interval.
//! This spreads colors evenly over the values even when the
//! distribution is skewed, at the cost of a few degenerate cases that
//! are corrected after scaling.

use log::debug;

/// The quartile boundaries of a distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl Quartiles {
    /// Quartiles of the finite values, or `None` if there are none
    pub fn of(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> =
            values.iter().copied().filter(|v| v.is_finite()).collect();

        if sorted.is_empty() {
            return None;
        }

        sorted.sort_by(|a, b| {
            a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
        });

        Some(Self {
            q1: percentile_sorted(&sorted, 25.0),
            median: percentile_sorted(&sorted, 50.0),
            q3: percentile_sorted(&sorted, 75.0),
        })
    }

    /// True when all three boundaries coincide, i.e. most of the mass
    /// sits on a single value
    pub fn is_collapsed(&self) -> bool {
        self.q1 == self.median && self.median == self.q3
    }
}

/// Percentile of an ascending, finite slice, linearly interpolating
/// between the closest ranks
pub fn percentile_sorted(sorted: &[f64], percent: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let rank = (sorted.len() - 1) as f64 * (percent / 100.0);
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let frac = rank - lower as f64;

    let lo = sorted[lower];
    let hi = sorted[upper];

    if frac == 0.0 {
        lo
    } else {
        lo + (hi - lo) * frac
    }
}

/// Min-max scales `values` into `[lo, hi]`. A band with a single
/// distinct value maps entirely onto `lo`.
fn min_max_into(values: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let range = max - min;

    values
        .iter()
        .map(|&v| {
            if range == 0.0 {
                lo
            } else {
                lo + (v - min) / range * (hi - lo)
            }
        })
        .collect()
}

/// One quartile band: the indices it covers and their rescaled values
struct Band {
    indices: Vec<usize>,
    scaled: Vec<f64>,
}

impl Band {
    /// Collects the finite values matching `pred`
    fn collect<F>(values: &[f64], lo: f64, hi: f64, pred: F) -> Self
    where
        F: Fn(f64) -> bool,
    {
        let indices: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v.is_finite() && pred(v))
            .map(|(ix, _)| ix)
            .collect();

        let band_values: Vec<f64> =
            indices.iter().map(|&ix| values[ix]).collect();

        let scaled = if band_values.is_empty() {
            Vec::new()
        } else {
            min_max_into(&band_values, lo, hi)
        };

        Self { indices, scaled }
    }

    fn write_into(&self, out: &mut [f64]) {
        for (&ix, &v) in self.indices.iter().zip(self.scaled.iter()) {
            out[ix] = v;
        }
    }
}

/// Maps every value into `[0, 1]` using quartile bands.
///
/// Bands are `<= q1`, `[q1, median]`, `[median, q3]` and `>= q3`, scaled
/// into `[0, .25]`, `[.25, .5]`, `[.5, .75]` and `[.75, 1]`. A value on
/// a boundary belongs to two bands; `q1` and `median` resolve to the
/// lower band, `q3` to the top band. NaN and infinite values belong to
/// no band and come out as `0`.
///
/// Never fails: constant and heavily skewed inputs are valid.
pub fn rescale(values: &[f64]) -> Vec<f64> {
    let mut rescaled = vec![0.0; values.len()];

    let quartiles = match Quartiles::of(values) {
        Some(q) => q,
        None => return rescaled,
    };

    let Quartiles { q1, median, q3 } = quartiles;

    debug!(
        "rescaling {} values, quartiles {:?}",
        values.len(),
        quartiles
    );

    let min_q1 = Band::collect(values, 0.0, 0.25, |v| v <= q1);
    let q1_median =
        Band::collect(values, 0.25, 0.5, |v| v >= q1 && v <= median);
    let median_q3 =
        Band::collect(values, 0.5, 0.75, |v| v >= median && v <= q3);
    let mut q3_max = Band::collect(values, 0.75, 1.0, |v| v >= q3);

    // a top band of one repeated value would never show the top color
    if q3_max.scaled.iter().all(|&v| v == 0.75) {
        q3_max.scaled.iter_mut().for_each(|v| *v = 1.0);
    }

    // with all quartiles on one value the top band swallows the
    // minimum, so its lower bound goes back to the bottom color
    if quartiles.is_collapsed() {
        q3_max
            .scaled
            .iter_mut()
            .filter(|v| **v == 0.75)
            .for_each(|v| *v = 0.0);
    }

    median_q3.write_into(&mut rescaled);
    q1_median.write_into(&mut rescaled);
    min_q1.write_into(&mut rescaled);
    q3_max.write_into(&mut rescaled);

    rescaled
}
