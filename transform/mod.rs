//! # Affine Column Transforms
//!
//! Per-column `(multiplier, shift)` pairs applied as `(x - shift) * multiplier`.
//! Predictors and responses each get their own [`Transform`], configured
//! independently from the column statistics the storage engine reports.

use crate::shared::columns::ColumnSummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use thiserror::Error;

/// Which affine rescaling to derive from column statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Values pass through untouched; no coefficient arrays are kept.
    #[default]
    None,
    /// Subtract the mean, divide by the standard deviation.
    Standardize,
    /// Subtract the mean, divide by the range.
    Normalize,
    /// Subtract the mean only.
    Demean,
    /// Divide by the standard deviation only.
    Descale,
}

impl TransformKind {
    pub const ALL: [TransformKind; 5] = [
        TransformKind::None,
        TransformKind::Standardize,
        TransformKind::Normalize,
        TransformKind::Demean,
        TransformKind::Descale,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransformKind::None => "none",
            TransformKind::Standardize => "standardize",
            TransformKind::Normalize => "normalize",
            TransformKind::Demean => "demean",
            TransformKind::Descale => "descale",
        }
    }

    /// Multiplier and shift for a column with the given statistics; the
    /// identity for [`TransformKind::None`].
    fn coefficients(self, summary: &ColumnSummary) -> (f64, f64) {
        let inverse_sigma = if summary.sigma != 0.0 {
            summary.sigma.recip()
        } else {
            1.0
        };
        match self {
            TransformKind::None => (1.0, 0.0),
            TransformKind::Standardize => (inverse_sigma, summary.mean),
            TransformKind::Normalize => {
                let range = summary.range();
                let multiplier = if range > 0.0 { range.recip() } else { 1.0 };
                (multiplier, summary.mean)
            }
            TransformKind::Demean => (1.0, summary.mean),
            TransformKind::Descale => (inverse_sigma, 0.0),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformKind {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TransformKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TransformError::UnknownKind(wanted.to_string()))
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum TransformError {
    #[error(
        "Unknown transform '{0}'. Expected one of: none, standardize, normalize, demean, descale."
    )]
    UnknownKind(String),
    #[error(
        "The {kind} transform produced a NaN {coefficient} for column {column}. The column statistics are degenerate (mean={mean}, sigma={sigma}, min={min}, max={max})."
    )]
    NonFiniteCoefficient {
        kind: TransformKind,
        column: usize,
        coefficient: &'static str,
        mean: f64,
        sigma: f64,
        min: f64,
        max: f64,
    },
    #[error("Transform covers {expected} columns but {found} were selected.")]
    ColumnOutOfRange { expected: usize, found: usize },
}

/// Per-column affine coefficients. Immutable once configured.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    kind: TransformKind,
    multipliers: Vec<f64>,
    shifts: Vec<f64>,
}

impl Transform {
    /// The disabled transform.
    pub fn none() -> Self {
        Self::default()
    }

    /// Derives one `(multiplier, shift)` pair per summary.
    ///
    /// Fails when any coefficient comes out NaN, which only happens when the
    /// upstream statistics are themselves NaN.
    pub fn configure(kind: TransformKind, summaries: &[ColumnSummary]) -> Result<Self, TransformError> {
        if kind == TransformKind::None {
            return Ok(Self::none());
        }
        let mut multipliers = Vec::with_capacity(summaries.len());
        let mut shifts = Vec::with_capacity(summaries.len());
        for (column, summary) in summaries.iter().enumerate() {
            let (multiplier, shift) = kind.coefficients(summary);
            let bad = if multiplier.is_nan() {
                Some("multiplier")
            } else if shift.is_nan() {
                Some("shift")
            } else {
                None
            };
            if let Some(coefficient) = bad {
                return Err(TransformError::NonFiniteCoefficient {
                    kind,
                    column,
                    coefficient,
                    mean: summary.mean,
                    sigma: summary.sigma,
                    min: summary.min,
                    max: summary.max,
                });
            }
            if matches!(kind, TransformKind::Standardize | TransformKind::Descale)
                && summary.sigma == 0.0
            {
                log::warn!(
                    "Column {column} has zero standard deviation; {kind} leaves its scale unchanged."
                );
            }
            multipliers.push(multiplier);
            shifts.push(shift);
        }
        Ok(Self {
            kind,
            multipliers,
            shifts,
        })
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.kind != TransformKind::None
    }

    /// Number of columns covered; zero when disabled.
    pub fn len(&self) -> usize {
        self.multipliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.multipliers.is_empty()
    }

    pub fn multipliers(&self) -> &[f64] {
        &self.multipliers
    }

    pub fn shifts(&self) -> &[f64] {
        &self.shifts
    }

    /// Multiplier of column `i`; `1.0` when disabled.
    #[inline]
    pub fn multiplier(&self, i: usize) -> f64 {
        self.multipliers.get(i).copied().unwrap_or(1.0)
    }

    /// Shift of column `i`; `0.0` when disabled.
    #[inline]
    pub fn shift(&self, i: usize) -> f64 {
        self.shifts.get(i).copied().unwrap_or(0.0)
    }

    /// True when some column is centred, i.e. zero does not stay zero.
    pub fn shifts_values(&self) -> bool {
        self.shifts.iter().any(|&shift| shift != 0.0)
    }

    #[inline]
    pub fn apply(&self, i: usize, x: f64) -> f64 {
        if self.multipliers.is_empty() {
            return x;
        }
        (x - self.shifts[i]) * self.multipliers[i]
    }

    #[inline]
    pub fn invert(&self, i: usize, x: f64) -> f64 {
        if self.multipliers.is_empty() {
            return x;
        }
        x / self.multipliers[i] + self.shifts[i]
    }

    /// Forces the identity on `columns`. Binary indicator columns stay 0/1.
    pub fn set_identity(&mut self, columns: Range<usize>) {
        if !self.is_active() {
            return;
        }
        for i in columns {
            self.multipliers[i] = 1.0;
            self.shifts[i] = 0.0;
        }
    }

    /// Keeps only the listed columns, in the listed order.
    pub fn select(&self, columns: &[usize]) -> Result<Self, TransformError> {
        if !self.is_active() {
            return Ok(Self::none());
        }
        if let Some(&out_of_range) = columns.iter().find(|&&c| c >= self.len()) {
            return Err(TransformError::ColumnOutOfRange {
                expected: self.len(),
                found: out_of_range,
            });
        }
        Ok(Self {
            kind: self.kind,
            multipliers: columns.iter().map(|&c| self.multipliers[c]).collect(),
            shifts: columns.iter().map(|&c| self.shifts[c]).collect(),
        })
    }
}
