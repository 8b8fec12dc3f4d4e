//! Dense extraction: one record at a time into a caller-owned, reusable row.

use super::row::{ExtractError, Row};
use super::view::{MissingPolicy, RowView};
use crate::shared::columns::ColumnChunk;

impl RowView {
    /// A dense row sized for this view, ready for [`extract_dense_row`](Self::extract_dense_row).
    pub fn new_dense_row(&self) -> Row {
        Row::dense(&self.layout)
    }

    /// Fills `out` with local row `row` of `chunks`, which must be given in
    /// layout order (see [`reorder_columns_for_layout`](crate::layout::reorder_columns_for_layout)).
    ///
    /// Under [`MissingPolicy::Skip`] any missing value marks the row bad and
    /// nothing else is written. Otherwise categoricals go to their missing
    /// slot, or contribute nothing when the layout has none, and numerics come
    /// through as NaN. A NaN response always marks the row bad.
    pub fn extract_dense_row<C: ColumnChunk>(
        &self,
        chunks: &[C],
        row: usize,
        out: &mut Row,
    ) -> Result<(), ExtractError> {
        let layout = &self.layout;
        let len = self.check_batch(chunks)?;
        if row >= len {
            return Err(ExtractError::RowOutOfBounds { row, len });
        }
        out.restart_dense(layout, chunks[0].start() + row as u64)?;

        if self.missing == MissingPolicy::Skip && chunks.iter().any(|c| c.is_missing(row)) {
            out.mark_bad();
            return Ok(());
        }

        let cats = layout.num_categorical();
        let responses_start = cats + layout.num_numeric();
        for (c, chunk) in chunks[..cats].iter().enumerate() {
            if chunk.is_missing(row) {
                if let Some(slot) = layout.missing_slot(c) {
                    out.push_bin(slot);
                }
                continue;
            }
            let code = chunk.code(row).ok_or_else(|| ExtractError::InvalidCategoryCode {
                column: c,
                row,
                value: chunk.value(row),
            })?;
            if let Some(index) = layout.map_category(c, code)?.active() {
                out.push_bin(index);
            }
        }
        for (i, chunk) in chunks[cats..responses_start].iter().enumerate() {
            out.set_numeric(i, self.predictor.apply(i, chunk.value(row)));
        }
        for (i, chunk) in chunks[responses_start..].iter().enumerate() {
            let value = self.response.apply(i, chunk.value(row));
            out.set_response(i, value);
            if value.is_nan() {
                out.mark_bad();
                return Ok(());
            }
        }
        out.mark_valid();
        Ok(())
    }

    /// Every row of `chunks` extracted densely.
    pub fn extract_dense_rows<C: ColumnChunk>(&self, chunks: &[C]) -> Result<Vec<Row>, ExtractError> {
        let len = self.check_batch(chunks)?;
        (0..len)
            .map(|row| {
                let mut out = self.new_dense_row();
                self.extract_dense_row(chunks, row, &mut out)?;
                Ok(out)
            })
            .collect()
    }

    /// Checks that one chunk per layout column was supplied and returns the
    /// row count of the first.
    pub(crate) fn check_chunk_count<C: ColumnChunk>(&self, chunks: &[C]) -> Result<usize, ExtractError> {
        let expected = self.layout.num_columns();
        match chunks.first() {
            Some(first) if chunks.len() == expected => Ok(first.len()),
            _ => Err(ExtractError::ChunkCountMismatch {
                expected,
                found: chunks.len(),
            }),
        }
    }

    /// Like [`check_chunk_count`](Self::check_chunk_count), and also checks
    /// that every chunk covers the same rows.
    pub(crate) fn check_batch<C: ColumnChunk>(&self, chunks: &[C]) -> Result<usize, ExtractError> {
        let expected = self.check_chunk_count(chunks)?;
        if let Some((column, chunk)) = chunks.iter().enumerate().find(|(_, c)| c.len() != expected) {
            return Err(ExtractError::ChunkLengthMismatch {
                column,
                expected,
                found: chunk.len(),
            });
        }
        Ok(expected)
    }
}
