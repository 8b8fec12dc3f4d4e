//! The per-record materialization handed to training and scoring loops.

use crate::layout::{Layout, LayoutError};
use ndarray::ArrayView1;
use std::fmt;
use thiserror::Error;

/// Failures that stop an extraction call outright. Rows that merely cannot be
/// used are flagged [`RowStatus::Bad`] instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Expected {expected} column chunks in layout order but got {found}.")]
    ChunkCountMismatch { expected: usize, found: usize },
    #[error("Column chunk {column} has {found} rows but the batch has {expected}.")]
    ChunkLengthMismatch {
        column: usize,
        expected: usize,
        found: usize,
    },
    #[error("Row {row} is outside a batch of {len} rows.")]
    RowOutOfBounds { row: usize, len: usize },
    #[error("The output row was not allocated as a dense row for this layout.")]
    RowShapeMismatch,
    #[error("Expected {expected} coefficients but got {found}.")]
    CoefficientLengthMismatch { expected: usize, found: usize },
    #[error(
        "Sparse extraction folds predictor centering into the row offset and needs a coefficient vector."
    )]
    MissingCoefficients,
    #[error("Scaling responses is not implemented for sparse extraction.")]
    SparseResponseScaling,
    #[error("Categorical column {column} holds {value} at row {row}, which is not a level code.")]
    InvalidCategoryCode { column: usize, row: usize, value: f64 },
    #[error("Categorical mapping failed: {0}")]
    Category(#[from] LayoutError),
}

/// Validity of a row. `Fresh` becomes `Valid` or `Bad`; `Bad` never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowStatus {
    #[default]
    Fresh,
    Valid,
    Bad,
}

/// Parallel growable `(feature index, value)` arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseEntries {
    ids: Vec<usize>,
    values: Vec<f64>,
}

impl SparseEntries {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Amortized O(1).
    #[inline]
    pub fn append(&mut self, id: usize, value: f64) {
        self.ids.push(id);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.ids.iter().copied().zip(self.values.iter().copied())
    }
}

/// Numeric part of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Numerics {
    /// One value per numeric column, zeros included.
    Dense(Vec<f64>),
    /// Only the non-default entries, keyed by output feature index.
    Sparse(SparseEntries),
}

/// One record expanded into the feature space of a [`Layout`].
///
/// Only the extractors write rows. Callers must check [`is_bad`](Self::is_bad)
/// before reading anything else: a bad row's contents are partial.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    status: RowStatus,
    row_id: u64,
    bins: Vec<usize>,
    numerics: Numerics,
    response: Vec<f64>,
    eta_offset: f64,
    numeric_start: usize,
    num_features: usize,
    intercept: bool,
}

impl Row {
    pub(crate) fn dense(layout: &Layout) -> Self {
        Self {
            status: RowStatus::Fresh,
            row_id: 0,
            bins: Vec::with_capacity(layout.num_categorical()),
            numerics: Numerics::Dense(vec![0.0; layout.num_numeric()]),
            response: vec![0.0; layout.num_responses()],
            eta_offset: 0.0,
            numeric_start: layout.numeric_start(),
            num_features: layout.num_features(),
            intercept: layout.has_intercept(),
        }
    }

    pub(crate) fn sparse(layout: &Layout, row_id: u64, eta_offset: f64) -> Self {
        let binaries = layout.num_binary();
        let numerics = layout.num_numeric() - binaries;
        Self {
            status: RowStatus::Fresh,
            row_id,
            bins: Vec::with_capacity(layout.num_categorical() + binaries.min(16)),
            numerics: Numerics::Sparse(SparseEntries::with_capacity(numerics.min(16))),
            response: vec![0.0; layout.num_responses()],
            eta_offset,
            numeric_start: layout.numeric_start(),
            num_features: layout.num_features(),
            intercept: layout.has_intercept(),
        }
    }

    /// Prepares a dense row for reuse on another record. Fails when the row
    /// was not allocated for `layout`.
    pub(crate) fn restart_dense(&mut self, layout: &Layout, row_id: u64) -> Result<(), ExtractError> {
        let fits = match &self.numerics {
            Numerics::Dense(values) => values.len() == layout.num_numeric(),
            Numerics::Sparse(_) => false,
        };
        if !fits
            || self.response.len() != layout.num_responses()
            || self.numeric_start != layout.numeric_start()
            || self.num_features != layout.num_features()
        {
            return Err(ExtractError::RowShapeMismatch);
        }
        self.status = RowStatus::Fresh;
        self.row_id = row_id;
        self.bins.clear();
        Ok(())
    }

    #[inline]
    pub(crate) fn mark_bad(&mut self) {
        self.status = RowStatus::Bad;
    }

    #[inline]
    pub(crate) fn mark_valid(&mut self) {
        if self.status == RowStatus::Fresh {
            self.status = RowStatus::Valid;
        }
    }

    #[inline]
    pub(crate) fn push_bin(&mut self, index: usize) {
        self.bins.push(index);
    }

    #[inline]
    pub(crate) fn set_numeric(&mut self, i: usize, value: f64) {
        if let Numerics::Dense(values) = &mut self.numerics {
            values[i] = value;
        }
    }

    #[inline]
    pub(crate) fn append_numeric(&mut self, id: usize, value: f64) {
        if let Numerics::Sparse(entries) = &mut self.numerics {
            entries.append(id, value);
        }
    }

    #[inline]
    pub(crate) fn set_response(&mut self, i: usize, value: f64) {
        self.response[i] = value;
    }

    pub fn status(&self) -> RowStatus {
        self.status
    }

    #[inline]
    pub fn is_bad(&self) -> bool {
        self.status == RowStatus::Bad
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self.numerics, Numerics::Sparse(_))
    }

    /// Global row index within the dataset.
    pub fn row_id(&self) -> u64 {
        self.row_id
    }

    /// Active one-hot features (categorical levels, missing slots and, in
    /// sparse rows, binary indicators).
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn numerics(&self) -> &Numerics {
        &self.numerics
    }

    pub fn response(&self, i: usize) -> f64 {
        self.response[i]
    }

    pub fn responses(&self) -> &[f64] {
        &self.response
    }

    /// Centering correction already folded in by sparse extraction.
    pub fn eta_offset(&self) -> f64 {
        self.eta_offset
    }

    /// Every non-zero feature of the row as `(index, value)`, bins first.
    pub fn nonzero_features(&self) -> Vec<(usize, f64)> {
        let mut features: Vec<(usize, f64)> = self.bins.iter().map(|&b| (b, 1.0)).collect();
        match &self.numerics {
            Numerics::Dense(values) => features.extend(
                values
                    .iter()
                    .enumerate()
                    .filter(|&(_, &v)| v != 0.0)
                    .map(|(i, &v)| (self.numeric_start + i, v)),
            ),
            Numerics::Sparse(entries) => features.extend(entries.iter().filter(|&(_, v)| v != 0.0)),
        }
        features
    }

    /// Linear predictor `x . beta`, intercept and sparse centering included.
    /// `beta` must cover every feature of the layout, intercept last.
    pub fn dot(&self, beta: ArrayView1<f64>) -> Result<f64, ExtractError> {
        if beta.len() != self.num_features {
            return Err(ExtractError::CoefficientLengthMismatch {
                expected: self.num_features,
                found: beta.len(),
            });
        }
        let mut eta: f64 = self.bins.iter().map(|&b| beta[b]).sum();
        match &self.numerics {
            Numerics::Dense(values) => {
                for (i, &value) in values.iter().enumerate() {
                    eta += value * beta[self.numeric_start + i];
                }
            }
            Numerics::Sparse(entries) => {
                eta += self.eta_offset;
                for (id, value) in entries.iter() {
                    eta += value * beta[id];
                }
            }
        }
        if self.intercept {
            eta += beta[self.num_features - 1];
        }
        Ok(eta)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} {:?} bins={:?}", self.row_id, self.status, self.bins)?;
        match &self.numerics {
            Numerics::Dense(values) => write!(f, " numerics={values:?}"),
            Numerics::Sparse(entries) => write!(
                f,
                " numerics={:?} eta_offset={}",
                entries.iter().collect::<Vec<_>>(),
                self.eta_offset
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutOptions;
    use crate::shared::columns::{ColumnSchema, ColumnSummary};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn layout() -> Layout {
        let schema = vec![
            ColumnSchema::categorical("c", vec!["a".into(), "b".into(), "c".into()]),
            ColumnSchema::numeric("x", ColumnSummary::new(1.0, 1.0, 0.0, 2.0)),
            ColumnSchema::numeric("z", ColumnSummary::new(1.0, 1.0, 0.0, 2.0)),
            ColumnSchema::numeric("y", ColumnSummary::new(0.0, 1.0, 0.0, 1.0)),
        ];
        let options = LayoutOptions {
            use_all_levels: true,
            ..LayoutOptions::default()
        };
        Layout::build(&schema, 1, &options).unwrap()
    }

    #[test]
    fn bad_is_absorbing() {
        let mut row = Row::dense(&layout());
        assert_eq!(row.status(), RowStatus::Fresh);
        row.mark_bad();
        row.mark_valid();
        assert!(row.is_bad());
    }

    #[test]
    fn dense_and_sparse_dot_products() {
        let layout = layout();
        // Features: c.a, c.b, c.c, x, z, intercept.
        let beta = array![1.0, 2.0, 3.0, 10.0, 100.0, 0.5];

        let mut dense = Row::dense(&layout);
        dense.push_bin(1);
        dense.set_numeric(0, 0.25);
        dense.set_numeric(1, 0.0);
        assert_abs_diff_eq!(dense.dot(beta.view()).unwrap(), 2.0 + 2.5 + 0.5, epsilon = 1e-12);

        let mut sparse = Row::sparse(&layout, 7, -1.5);
        sparse.push_bin(1);
        sparse.append_numeric(3, 0.25);
        assert_abs_diff_eq!(sparse.dot(beta.view()).unwrap(), 2.0 + 2.5 - 1.5 + 0.5, epsilon = 1e-12);
        assert_eq!(sparse.nonzero_features(), vec![(1, 1.0), (3, 0.25)]);
        assert_eq!(dense.nonzero_features(), sparse.nonzero_features());
        assert_eq!(sparse.to_string(), "row 7 Fresh bins=[1] numerics=[(3, 0.25)] eta_offset=-1.5");
    }

    #[test]
    fn dot_rejects_coefficients_of_the_wrong_width() {
        let layout = layout();
        let mut row = Row::dense(&layout);
        row.push_bin(0);
        // Missing the intercept: five entries for six features.
        let short = array![1.0, 2.0, 3.0, 10.0, 100.0];
        assert_eq!(
            row.dot(short.view()),
            Err(ExtractError::CoefficientLengthMismatch { expected: 6, found: 5 })
        );
        let long = array![1.0, 2.0, 3.0, 10.0, 100.0, 0.5, 9.0];
        assert!(row.dot(long.view()).is_err());
        let sparse = Row::sparse(&layout, 0, 0.0);
        assert!(sparse.dot(array![0.0, 0.0].view()).is_err());
    }

    #[test]
    fn restart_rejects_foreign_rows() {
        let layout = layout();
        let mut sparse = Row::sparse(&layout, 0, 0.0);
        assert_eq!(
            sparse.restart_dense(&layout, 1),
            Err(ExtractError::RowShapeMismatch)
        );
        let mut dense = Row::dense(&layout);
        dense.push_bin(2);
        dense.mark_bad();
        dense.restart_dense(&layout, 9).unwrap();
        assert_eq!(dense.status(), RowStatus::Fresh);
        assert_eq!(dense.row_id(), 9);
        assert!(dense.bins().is_empty());
    }

    #[test]
    fn sparse_entries_grow_on_append() {
        let mut entries = SparseEntries::with_capacity(1);
        for id in 0..40 {
            entries.append(id, id as f64);
        }
        assert_eq!(entries.len(), 40);
        assert_eq!(entries.ids()[39], 39);
        assert_eq!(entries.values()[10], 10.0);
        assert!(!entries.is_empty());
    }
}
