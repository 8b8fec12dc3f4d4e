//! # Column Storage Contract
//!
//! The row views never own the dataset. They read it through [`ColumnChunk`], a
//! narrow capability over one fixed-size slice of one column, and through the
//! per-column [`ColumnSchema`] that carries the label domain and precomputed
//! statistics. Any columnar engine can sit behind these types.
//!
//! [`MemoryChunk`] is the in-memory implementation used by tests, benchmarks
//! and callers that already hold their data in `Vec`s.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Read access to one chunk of one column.
///
/// Row positions are local to the chunk (`0..len()`); [`start`](Self::start)
/// gives the global index of the first row.
pub trait ColumnChunk {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Global row index of local row 0.
    fn start(&self) -> u64 {
        0
    }

    fn is_missing(&self, row: usize) -> bool;

    /// Floating-point value at `row`; NaN when missing.
    fn value(&self, row: usize) -> f64;

    /// Integer level code at `row`. Only meaningful for categorical columns
    /// and only when the row is not missing.
    ///
    /// `None` when the stored value is not a level code at all: negative,
    /// fractional, non-finite or wider than `u32`. Such values are never
    /// rounded or clamped onto a real level.
    fn code(&self, row: usize) -> Option<usize> {
        level_code(self.value(row))
    }

    /// Next row after `after` (or the first row when `after` is `None`) that
    /// may hold a non-default value.
    ///
    /// Sparse-stored chunks must report every stored entry, missing entries
    /// included. Dense chunks may simply report every row. Either kind may
    /// report rows holding an explicit zero; callers skip those themselves.
    fn next_non_default(&self, after: Option<usize>) -> Option<usize> {
        let next = after.map_or(0, |row| row + 1);
        (next < self.len()).then_some(next)
    }

    fn is_stored_sparse(&self) -> bool {
        false
    }
}

/// The level code stored as `value`, if it is one.
fn level_code(value: f64) -> Option<usize> {
    (value >= 0.0 && value <= f64::from(u32::MAX) && value.fract() == 0.0).then_some(value as usize)
}

/// Precomputed statistics of a column, as the storage engine reports them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub mean: f64,
    pub sigma: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnSummary {
    /// Statistics for a column nobody measured. Every field is NaN, so any
    /// transform configured from it is rejected.
    pub const UNKNOWN: ColumnSummary = ColumnSummary {
        mean: f64::NAN,
        sigma: f64::NAN,
        min: f64::NAN,
        max: f64::NAN,
    };

    pub fn new(mean: f64, sigma: f64, min: f64, max: f64) -> Self {
        Self {
            mean,
            sigma,
            min,
            max,
        }
    }

    /// Computes mean, sample standard deviation, min and max over the non-NaN
    /// entries of `values`.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values.into_iter().filter(|v| !v.is_nan()) {
            count += 1;
            sum += value;
            sum_sq += value * value;
            min = min.min(value);
            max = max.max(value);
        }
        if count == 0 {
            return Self::UNKNOWN;
        }
        let n = count as f64;
        let mean = sum / n;
        let sigma = if count > 1 {
            ((sum_sq - n * mean * mean) / (n - 1.0)).max(0.0).sqrt()
        } else {
            0.0
        };
        Self {
            mean,
            sigma,
            min,
            max,
        }
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// True when the column has no spread at all.
    pub fn is_degenerate(&self) -> bool {
        self.sigma == 0.0 || self.range() == 0.0
    }
}

/// What a column holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Finite label set; raw values are codes into `domain`.
    Categorical { domain: Vec<String> },
    /// Numeric 0/1 indicator.
    Binary,
    Numeric,
}

/// Name, kind and statistics of one source column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
    /// Absent for categorical columns unless a caller supplies one.
    pub summary: Option<ColumnSummary>,
}

impl ColumnSchema {
    pub fn categorical<S: Into<String>>(name: S, domain: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Categorical { domain },
            summary: None,
        }
    }

    pub fn numeric<S: Into<String>>(name: S, summary: ColumnSummary) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Numeric,
            summary: Some(summary),
        }
    }

    pub fn binary<S: Into<String>>(name: S, summary: ColumnSummary) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Binary,
            summary: Some(summary),
        }
    }

    pub fn with_summary(mut self, summary: ColumnSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Reported statistics, or [`ColumnSummary::UNKNOWN`] when there are none.
    pub fn summary_or_unknown(&self) -> ColumnSummary {
        self.summary.unwrap_or(ColumnSummary::UNKNOWN)
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, ColumnKind::Categorical { .. })
    }

    pub fn domain(&self) -> Option<&[String]> {
        match &self.kind {
            ColumnKind::Categorical { domain } => Some(domain),
            _ => None,
        }
    }

    pub fn domain_size(&self) -> Option<usize> {
        self.domain().map(<[String]>::len)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ColumnError {
    #[error("sparse entry at row {row} lies outside a chunk of {len} rows")]
    RowOutOfBounds { row: usize, len: usize },
    #[error("sparse entries must have strictly increasing rows; row {row} follows row {previous}")]
    UnsortedRows { previous: usize, row: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum ChunkStorage {
    Codes(Vec<Option<u32>>),
    Dense(Vec<f64>),
    Sparse {
        len: usize,
        rows: Vec<usize>,
        values: Vec<f64>,
    },
}

/// A chunk held entirely in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryChunk {
    start: u64,
    storage: ChunkStorage,
}

impl MemoryChunk {
    /// Categorical codes; `None` marks a missing entry.
    pub fn categorical<I>(codes: I) -> Self
    where
        I: IntoIterator<Item = Option<u32>>,
    {
        Self {
            start: 0,
            storage: ChunkStorage::Codes(codes.into_iter().collect()),
        }
    }

    /// Dense floats; NaN marks a missing entry.
    pub fn numeric(values: Vec<f64>) -> Self {
        Self {
            start: 0,
            storage: ChunkStorage::Dense(values),
        }
    }

    /// Sparse floats over `len` rows. Rows not listed hold `0.0`; a listed
    /// NaN marks a missing entry.
    pub fn sparse(len: usize, entries: Vec<(usize, f64)>) -> Result<Self, ColumnError> {
        let mut rows = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for (row, value) in entries {
            if row >= len {
                return Err(ColumnError::RowOutOfBounds { row, len });
            }
            if let Some(&previous) = rows.last() {
                if row <= previous {
                    return Err(ColumnError::UnsortedRows { previous, row });
                }
            }
            rows.push(row);
            values.push(value);
        }
        Ok(Self {
            start: 0,
            storage: ChunkStorage::Sparse { len, rows, values },
        })
    }

    /// Places this chunk at global row `start`.
    pub fn starting_at(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    /// Statistics over the non-missing values of this chunk.
    pub fn summary(&self) -> ColumnSummary {
        ColumnSummary::from_values((0..self.len()).map(|row| self.value(row)))
    }

    fn sparse_slot(rows: &[usize], row: usize) -> Option<usize> {
        rows.binary_search(&row).ok()
    }
}

impl ColumnChunk for MemoryChunk {
    fn len(&self) -> usize {
        match &self.storage {
            ChunkStorage::Codes(codes) => codes.len(),
            ChunkStorage::Dense(values) => values.len(),
            ChunkStorage::Sparse { len, .. } => *len,
        }
    }

    fn start(&self) -> u64 {
        self.start
    }

    fn is_missing(&self, row: usize) -> bool {
        match &self.storage {
            ChunkStorage::Codes(codes) => codes[row].is_none(),
            ChunkStorage::Dense(values) => values[row].is_nan(),
            ChunkStorage::Sparse { rows, values, .. } => {
                Self::sparse_slot(rows, row).is_some_and(|slot| values[slot].is_nan())
            }
        }
    }

    fn value(&self, row: usize) -> f64 {
        match &self.storage {
            ChunkStorage::Codes(codes) => codes[row].map_or(f64::NAN, f64::from),
            ChunkStorage::Dense(values) => values[row],
            ChunkStorage::Sparse { rows, values, .. } => {
                Self::sparse_slot(rows, row).map_or(0.0, |slot| values[slot])
            }
        }
    }

    fn code(&self, row: usize) -> Option<usize> {
        match &self.storage {
            ChunkStorage::Codes(codes) => codes[row].map(|code| code as usize),
            _ => level_code(self.value(row)),
        }
    }

    fn next_non_default(&self, after: Option<usize>) -> Option<usize> {
        match &self.storage {
            ChunkStorage::Sparse { rows, .. } => {
                let slot = match after {
                    Some(after) => rows.partition_point(|&row| row <= after),
                    None => 0,
                };
                rows.get(slot).copied()
            }
            _ => {
                let next = after.map_or(0, |row| row + 1);
                (next < self.len()).then_some(next)
            }
        }
    }

    fn is_stored_sparse(&self) -> bool {
        matches!(self.storage, ChunkStorage::Sparse { .. })
    }
}
