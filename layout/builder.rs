use super::LayoutError;
use super::levels::CategoryLevels;
use crate::shared::columns::{ColumnKind, ColumnSchema, ColumnSummary};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Construction switches for a [`Layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Keep every level (`L` slots) instead of dropping the first (`L - 1`).
    pub use_all_levels: bool,
    /// Reserve a trailing slot per categorical column for missing values.
    pub missing_bucket: bool,
    /// Append a bias feature after the numeric block.
    pub intercept: bool,
    /// Lay out [`ColumnKind::Binary`] columns as 0/1 indicators at the head of
    /// the numeric block. When off they are ordinary numeric columns.
    pub binary_columns: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            use_all_levels: false,
            missing_bucket: false,
            intercept: true,
            binary_columns: false,
        }
    }
}

/// The one-hot expanded feature space over a column schema.
///
/// Column order is categoricals (descending domain size), binary indicators,
/// numerics, then responses. Feature order is the categorical ranges given by
/// `category_offsets`, then one slot per numeric column, then the intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub(super) columns: Vec<ColumnSchema>,
    pub(super) permutation: Vec<usize>,
    pub(super) source_columns: usize,
    pub(super) num_categorical: usize,
    pub(super) num_binary: usize,
    pub(super) num_numeric: usize,
    pub(super) num_responses: usize,
    pub(super) category_offsets: Vec<usize>,
    pub(super) category_missing: Vec<bool>,
    pub(super) levels: Vec<CategoryLevels>,
    pub(super) use_all_levels: bool,
    pub(super) intercept: bool,
    pub(super) validation: bool,
    pub(super) active_columns: Option<Vec<usize>>,
}

impl Layout {
    /// Builds the layout for `schema`, whose last `num_responses` entries are
    /// responses.
    ///
    /// The schema itself is left alone; use [`reorder_columns_for_layout`] to
    /// bring any caller-owned column collection into layout order.
    pub fn build(
        schema: &[ColumnSchema],
        num_responses: usize,
        options: &LayoutOptions,
    ) -> Result<Self, LayoutError> {
        if num_responses > schema.len() {
            return Err(LayoutError::TooManyResponses {
                responses: num_responses,
                columns: schema.len(),
            });
        }
        let num_predictors = schema.len() - num_responses;
        if num_predictors == 0 {
            return Err(LayoutError::NoPredictors);
        }

        let mut categorical = Vec::new();
        let mut binary = Vec::new();
        let mut numeric = Vec::new();
        for (i, column) in schema[..num_predictors].iter().enumerate() {
            match &column.kind {
                ColumnKind::Categorical { domain } => {
                    if domain.is_empty() {
                        return Err(LayoutError::EmptyDomain(column.name.clone()));
                    }
                    categorical.push(i);
                }
                ColumnKind::Binary if options.binary_columns => binary.push(i),
                ColumnKind::Binary | ColumnKind::Numeric => numeric.push(i),
            }
        }

        // Stable: equal cardinalities keep their source order, so the same
        // schema always yields the same coefficient indexing.
        categorical.sort_by_key(|&i| Reverse(schema[i].domain_size().unwrap_or(0)));

        let dropped_level = usize::from(!options.use_all_levels);
        let missing_slot = usize::from(options.missing_bucket);
        let mut category_offsets = Vec::with_capacity(categorical.len() + 1);
        let mut width = 0;
        category_offsets.push(width);
        for &i in &categorical {
            let levels = schema[i].domain_size().unwrap_or(0);
            width += levels - dropped_level + missing_slot;
            category_offsets.push(width);
        }

        let permutation: Vec<usize> = categorical
            .iter()
            .chain(binary.iter())
            .chain(numeric.iter())
            .copied()
            .chain(num_predictors..schema.len())
            .collect();
        let columns = permutation.iter().map(|&i| schema[i].clone()).collect();

        let layout = Self {
            columns,
            permutation,
            source_columns: schema.len(),
            num_categorical: categorical.len(),
            num_binary: binary.len(),
            num_numeric: binary.len() + numeric.len(),
            num_responses,
            category_missing: vec![options.missing_bucket; categorical.len()],
            levels: vec![CategoryLevels::Unfiltered; categorical.len()],
            category_offsets,
            use_all_levels: options.use_all_levels,
            intercept: options.intercept,
            validation: false,
            active_columns: None,
        };

        log::info!(
            "Layout: {} categorical columns expanded to {} features, {} numeric columns ({} binary), {} responses; {} features in total.",
            layout.num_categorical,
            layout.numeric_start(),
            layout.num_numeric,
            layout.num_binary,
            layout.num_responses,
            layout.num_features()
        );
        log::debug!(
            "Categorical columns by descending cardinality: {:?}",
            layout.columns[..layout.num_categorical]
                .iter()
                .map(|c| (&c.name, c.domain_size().unwrap_or(0)))
                .collect::<Vec<_>>()
        );

        Ok(layout)
    }

    /// A copy of this layout that tolerates categorical levels it has never
    /// seen, as scoring against fresh data must.
    pub fn for_validation(&self) -> Self {
        let mut layout = self.clone();
        layout.validation = true;
        layout
    }

    pub fn num_categorical(&self) -> usize {
        self.num_categorical
    }

    /// Binary indicator columns, all of which sit at the head of the numeric block.
    pub fn num_binary(&self) -> usize {
        self.num_binary
    }

    /// Numeric predictor columns, binary indicators included.
    pub fn num_numeric(&self) -> usize {
        self.num_numeric
    }

    pub fn num_responses(&self) -> usize {
        self.num_responses
    }

    /// Columns in layout order, responses included.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn category_offsets(&self) -> &[usize] {
        &self.category_offsets
    }

    pub fn category_missing(&self) -> &[bool] {
        &self.category_missing
    }

    pub fn levels(&self) -> &[CategoryLevels] {
        &self.levels
    }

    pub fn use_all_levels(&self) -> bool {
        self.use_all_levels
    }

    pub fn has_intercept(&self) -> bool {
        self.intercept
    }

    pub fn is_validation(&self) -> bool {
        self.validation
    }

    /// First output index of the numeric block.
    #[inline]
    pub fn numeric_start(&self) -> usize {
        self.category_offsets[self.num_categorical]
    }

    /// Expanded width without the intercept.
    #[inline]
    pub fn full_width(&self) -> usize {
        self.numeric_start() + self.num_numeric
    }

    /// Length of a coefficient vector over this layout, intercept included.
    pub fn num_features(&self) -> usize {
        self.full_width() + usize::from(self.intercept)
    }

    pub fn category_width(&self, column: usize) -> usize {
        self.category_offsets[column + 1] - self.category_offsets[column]
    }

    pub fn largest_category_width(&self) -> usize {
        (0..self.num_categorical)
            .map(|c| self.category_width(c))
            .max()
            .unwrap_or(0)
    }

    /// Column schemas in layout order.
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// `permutation()[i]` is the source position of layout column `i`.
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Feature indices of the parent layout this one was projected from.
    pub fn active_columns(&self) -> Option<&[usize]> {
        self.active_columns.as_deref()
    }

    pub fn numeric_summaries(&self) -> Vec<ColumnSummary> {
        let start = self.num_categorical;
        self.columns[start..start + self.num_numeric]
            .iter()
            .map(ColumnSchema::summary_or_unknown)
            .collect()
    }

    pub fn response_summaries(&self) -> Vec<ColumnSummary> {
        self.columns[self.columns.len() - self.num_responses..]
            .iter()
            .map(ColumnSchema::summary_or_unknown)
            .collect()
    }

    /// Names of every feature in output order.
    ///
    /// Categorical levels become `"<column>.<level>"`, the missing slot
    /// `"<column>.missing(NA)"`, numeric columns keep their names, and the
    /// intercept, when present, is `"Intercept"`.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.num_features());
        for c in 0..self.num_categorical {
            let column = &self.columns[c];
            let domain = column.domain().unwrap_or(&[]);
            let slots = self.category_width(c) - usize::from(self.category_missing[c]);
            for offset in 0..slots {
                let code = self.code_at_offset(c, offset);
                match domain.get(code) {
                    Some(level) => names.push(format!("{}.{}", column.name, level)),
                    None => names.push(format!("{}.{}", column.name, code)),
                }
            }
            if self.category_missing[c] {
                names.push(format!("{}.missing(NA)", column.name));
            }
        }
        let start = self.num_categorical;
        names.extend(
            self.columns[start..start + self.num_numeric]
                .iter()
                .map(|c| c.name.clone()),
        );
        if self.intercept {
            names.push("Intercept".to_string());
        }
        names
    }

    /// Raw level code behind offset `offset` of categorical column `column`.
    pub(super) fn code_at_offset(&self, column: usize, offset: usize) -> usize {
        match &self.levels[column] {
            CategoryLevels::Unfiltered => offset + usize::from(!self.use_all_levels),
            filtered => filtered.code_at(offset),
        }
    }

    /// For each layout column, the position of the equally named entry in
    /// `names`, or `None` when absent.
    pub fn map_column_names<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<Option<usize>>, LayoutError> {
        if names.len() != self.columns.len() {
            return Err(LayoutError::NameCountMismatch {
                expected: self.columns.len(),
                found: names.len(),
            });
        }
        let mut positions: AHashMap<&str, usize> = AHashMap::with_capacity(names.len());
        for (j, name) in names.iter().enumerate() {
            positions.entry(name.as_ref()).or_insert(j);
        }
        Ok(self
            .columns
            .iter()
            .map(|c| positions.get(c.name.as_str()).copied())
            .collect())
    }
}

/// Rearranges `columns`, given in source order, into layout order and returns
/// the permutation that was applied.
///
/// This mutates the caller's collection. Columns a projection dropped are
/// removed from it.
pub fn reorder_columns_for_layout<'a, T>(
    layout: &'a Layout,
    columns: &mut Vec<T>,
) -> Result<&'a [usize], LayoutError> {
    if columns.len() != layout.source_columns {
        return Err(LayoutError::ColumnCountMismatch {
            expected: layout.source_columns,
            found: columns.len(),
        });
    }
    let mut slots: Vec<Option<T>> = columns.drain(..).map(Some).collect();
    for &source in &layout.permutation {
        if let Some(column) = slots[source].take() {
            columns.push(column);
        }
    }
    Ok(&layout.permutation)
}
