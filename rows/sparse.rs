//! Sparse extraction: a whole chunk batch at once, column by column.
//!
//! Zeros are never materialized. Centering a numeric column would turn its
//! zeros into non-zeros, so numeric values are only scaled here and the
//! centering term `-sum(beta[j] * shift[j] * multiplier[j])` is folded into
//! every row's `eta_offset` instead.

use super::row::{ExtractError, Row};
use super::view::{MissingPolicy, RowView};
use crate::shared::columns::ColumnChunk;
use ndarray::ArrayView1;
use rayon::prelude::*;

/// Rows of `chunk` that may hold something other than zero.
fn non_default_rows<C: ColumnChunk>(chunk: &C) -> impl Iterator<Item = usize> + '_ {
    std::iter::successors(chunk.next_non_default(None), move |&row| {
        chunk.next_non_default(Some(row))
    })
}

impl RowView {
    /// Extracts every row of `chunks` (in layout order) into sparse rows.
    ///
    /// `beta` is the current coefficient vector over this view's features; it
    /// is required whenever the predictor transform centres values. Response
    /// transforms are not supported here.
    pub fn extract_sparse_rows<C: ColumnChunk>(
        &self,
        chunks: &[C],
        beta: Option<ArrayView1<f64>>,
    ) -> Result<Vec<Row>, ExtractError> {
        if self.response.is_active() {
            return Err(ExtractError::SparseResponseScaling);
        }
        let len = self.check_batch(chunks)?;
        let eta_offset = self.eta_offset(beta)?;

        let layout = &self.layout;
        let start = chunks[0].start();
        let mut rows: Vec<Row> = (0..len)
            .map(|r| Row::sparse(layout, start + r as u64, eta_offset))
            .collect();
        let strict = self.missing == MissingPolicy::Skip;

        let cats = layout.num_categorical();
        let binaries_end = cats + layout.num_binary();
        let responses_start = cats + layout.num_numeric();
        let numeric_start = layout.numeric_start();

        for (c, chunk) in chunks[..cats].iter().enumerate() {
            for (r, row) in rows.iter_mut().enumerate() {
                if row.is_bad() {
                    continue;
                }
                if chunk.is_missing(r) {
                    if strict {
                        row.mark_bad();
                    } else if let Some(slot) = layout.missing_slot(c) {
                        row.push_bin(slot);
                    }
                    continue;
                }
                let code = chunk.code(r).ok_or_else(|| ExtractError::InvalidCategoryCode {
                    column: c,
                    row: r,
                    value: chunk.value(r),
                })?;
                if let Some(index) = layout.map_category(c, code)?.active() {
                    row.push_bin(index);
                }
            }
        }

        // Binary indicators are one-hot features of their own.
        for (j, chunk) in chunks[cats..binaries_end].iter().enumerate() {
            let feature = numeric_start + j;
            for r in non_default_rows(chunk) {
                let row = &mut rows[r];
                if row.is_bad() {
                    continue;
                }
                if chunk.is_missing(r) {
                    if strict {
                        row.mark_bad();
                    } else {
                        row.append_numeric(feature, f64::NAN);
                    }
                } else if chunk.value(r) != 0.0 {
                    row.push_bin(feature);
                }
            }
        }

        for (k, chunk) in chunks[binaries_end..responses_start].iter().enumerate() {
            let i = layout.num_binary() + k;
            let feature = numeric_start + i;
            let multiplier = self.predictor.multiplier(i);
            for r in non_default_rows(chunk) {
                let value = chunk.value(r);
                if value == 0.0 {
                    continue;
                }
                let row = &mut rows[r];
                if row.is_bad() {
                    continue;
                }
                if value.is_nan() {
                    if strict {
                        row.mark_bad();
                    } else {
                        row.append_numeric(feature, f64::NAN);
                    }
                    continue;
                }
                row.append_numeric(feature, value * multiplier);
            }
        }

        for (i, chunk) in chunks[responses_start..].iter().enumerate() {
            for (r, row) in rows.iter_mut().enumerate() {
                let value = chunk.value(r);
                row.set_response(i, value);
                if value.is_nan() {
                    row.mark_bad();
                }
            }
        }

        for row in &mut rows {
            row.mark_valid();
        }
        Ok(rows)
    }

    /// Runs [`extract_sparse_rows`](Self::extract_sparse_rows) over many chunk
    /// batches on the rayon thread pool. Output order follows `batches`.
    pub fn par_extract_sparse_rows<C: ColumnChunk + Sync>(
        &self,
        batches: &[Vec<C>],
        beta: Option<ArrayView1<f64>>,
    ) -> Result<Vec<Vec<Row>>, ExtractError> {
        let extracted: Result<Vec<Vec<Row>>, ExtractError> = batches
            .par_iter()
            .map(|batch| self.extract_sparse_rows(batch, beta))
            .collect();
        if let Ok(rows) = &extracted {
            log::debug!(
                "Sparse extraction of {} batches produced {} rows.",
                rows.len(),
                rows.iter().map(Vec::len).sum::<usize>()
            );
        }
        extracted
    }

    /// Centering correction shared by every sparse row under `beta`.
    fn eta_offset(&self, beta: Option<ArrayView1<f64>>) -> Result<f64, ExtractError> {
        let layout = &self.layout;
        match beta {
            Some(beta) => {
                let expected = layout.num_features();
                if beta.len() != expected {
                    return Err(ExtractError::CoefficientLengthMismatch {
                        expected,
                        found: beta.len(),
                    });
                }
                let start = layout.numeric_start();
                Ok(-(0..layout.num_numeric())
                    .map(|i| beta[start + i] * self.predictor.shift(i) * self.predictor.multiplier(i))
                    .sum::<f64>())
            }
            None if self.predictor.shifts_values() => Err(ExtractError::MissingCoefficients),
            None => Ok(0.0),
        }
    }
}
