use super::engine::Accumulator;
use log::*;
use std::fmt;

/// Label of the sample group every row is computed over
pub const GROUP_LABEL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    /// lag 0: mean within-site identity
    Ks,
    /// lag > 0: correlation relative to lag 0
    P2,
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatKind::Ks => write!(f, "Ks"),
            StatKind::P2 => write!(f, "P2"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurveRow {
    pub lag: usize,
    pub value: f64,
    pub pair_count: u64,
    pub kind: StatKind,
}

/// Normalized correlation as a function of lag, observed lags only.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    rows: Vec<CurveRow>,
}

impl Curve {
    /// `Ks = sum[0] / count[0]` and `P2(l) = sum[l] / sum[0]`
    pub fn from_accumulator(acc: &Accumulator) -> Self {
        let sums = acc.sums();
        let counts = acc.counts();
        let mut rows = Vec::new();
        for lag in acc.observed_lags() {
            let (value, kind) = if lag == 0 {
                (sums[0] / counts[0] as f64, StatKind::Ks)
            } else {
                (sums[lag] / sums[0], StatKind::P2)
            };
            rows.push(CurveRow {
                lag,
                value,
                pair_count: counts[lag],
                kind,
            });
        }
        if rows.iter().any(|r| r.lag > 0) && sums.first().map_or(true, |s| *s == 0.0) {
            warn!("lag-0 sum is zero; P2 values are not finite");
        }
        Self { rows }
    }

    pub fn rows(&self) -> &[CurveRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, lag: usize) -> Option<&CurveRow> {
        self.rows
            .binary_search_by_key(&lag, |r| r.lag)
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn ks(&self) -> Option<f64> {
        self.get(0).map(|r| r.value)
    }
}
