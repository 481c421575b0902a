// src/metrics/snapshot.rs
//
// Point-in-time summary of a recorded distribution.

use hdrhistogram::Histogram;

/// Quantile storage kept by a snapshot.
#[derive(Debug, Clone, PartialEq)]
enum Quantiles {
    /// The whole interval histogram; any quantile can be answered exactly.
    Full(Histogram<u64>),
    /// Only the configured quantiles, sorted ascending by quantile.
    Predefined(Vec<(f64, u64)>),
}

/// Summary statistics for one interval of a histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    count: u64,
    min: u64,
    max: u64,
    mean: f64,
    stdev: f64,
    quantiles: Quantiles,
}

impl Snapshot {
    /// Summarize `hdr`, keeping only `percentiles` when given.
    pub fn from_histogram(hdr: Histogram<u64>, percentiles: Option<&[f64]>) -> Self {
        let (count, min, max, mean, stdev) = (hdr.len(), hdr.min(), hdr.max(), hdr.mean(), hdr.stdev());
        let quantiles = match percentiles {
            Some(percentiles) => Quantiles::Predefined(
                percentiles
                    .iter()
                    .map(|&q| (q, hdr.value_at_quantile(q)))
                    .collect(),
            ),
            None => Quantiles::Full(hdr),
        };
        Self {
            count,
            min,
            max,
            mean,
            stdev,
            quantiles,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn stdev(&self) -> f64 {
        self.stdev
    }

    /// Value at quantile `q` (0.0..=1.0).
    ///
    /// With predefined percentiles the answer is the value of the first stored
    /// quantile `>= q`, or `max` when `q` is above all of them.
    pub fn value(&self, q: f64) -> u64 {
        match &self.quantiles {
            Quantiles::Full(hdr) => hdr.value_at_quantile(q.clamp(0.0, 1.0)),
            Quantiles::Predefined(values) => values
                .iter()
                .find(|(stored, _)| *stored >= q)
                .map(|&(_, value)| value)
                .unwrap_or(self.max),
        }
    }

    pub fn median(&self) -> u64 {
        self.value(0.5)
    }

    pub fn p75(&self) -> u64 {
        self.value(0.75)
    }

    pub fn p95(&self) -> u64 {
        self.value(0.95)
    }

    pub fn p98(&self) -> u64 {
        self.value(0.98)
    }

    pub fn p99(&self) -> u64 {
        self.value(0.99)
    }

    pub fn p999(&self) -> u64 {
        self.value(0.999)
    }

    /// Stored quantile/value pairs; empty when the full histogram is kept.
    pub fn predefined_values(&self) -> &[(f64, u64)] {
        match &self.quantiles {
            Quantiles::Predefined(values) => values,
            Quantiles::Full(_) => &[],
        }
    }
}
