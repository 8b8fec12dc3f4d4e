use super::LayoutError;
use super::builder::Layout;
use super::levels::CategoryLevels;
use itertools::Itertools;
use ndarray::{Array1, ArrayView1};

/// A layout restricted to a subset of its parent's features.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// The restricted layout. Its categorical columns are all filtered.
    pub layout: Layout,
    /// Parent layout columns that lost every feature, in ascending order.
    pub dropped_columns: Vec<usize>,
    /// Parent numeric-block positions that survived, in order.
    pub retained_numeric: Vec<usize>,
    parent_features: usize,
}

impl Projection {
    /// Spreads a coefficient vector over the restricted layout back into the
    /// parent's feature space, with zeros for every dropped feature.
    pub fn scatter(&self, restricted: ArrayView1<f64>) -> Result<Array1<f64>, LayoutError> {
        let expected = self.layout.num_features();
        if restricted.len() != expected {
            return Err(LayoutError::CoefficientLengthMismatch {
                expected,
                found: restricted.len(),
            });
        }
        let mut full = Array1::zeros(self.parent_features);
        let active = self.layout.active_columns().unwrap_or(&[]);
        for (&target, &value) in active.iter().zip(restricted.iter()) {
            full[target] = value;
        }
        if self.layout.has_intercept() {
            full[self.parent_features - 1] = restricted[expected - 1];
        }
        Ok(full)
    }
}

impl Layout {
    /// Restricts this layout to the features in `keep`, a strictly increasing
    /// list of output indices below [`full_width`](Self::full_width).
    ///
    /// Categorical columns keep only the selected levels (and the missing slot
    /// if selected); columns left with nothing are dropped from the schema, as
    /// are unselected numeric columns. Responses and the intercept carry over.
    pub fn project(&self, keep: &[usize]) -> Result<Projection, LayoutError> {
        if let Some((&previous, &index)) = keep.iter().tuple_windows().find(|(a, b)| a >= b) {
            return Err(LayoutError::UnsortedSelection { previous, index });
        }
        let width = self.full_width();
        if let Some(&index) = keep.last().filter(|&&index| index >= width) {
            return Err(LayoutError::SelectionOutOfRange { index, width });
        }

        let numeric_start = self.numeric_start();
        let split = keep.partition_point(|&index| index < numeric_start);
        let (categorical_keep, numeric_keep) = keep.split_at(split);

        let mut dropped_columns = Vec::new();
        let mut columns = Vec::with_capacity(self.columns.len());
        let mut permutation = Vec::with_capacity(self.columns.len());
        let mut levels = Vec::new();
        let mut category_missing = Vec::new();
        let mut category_offsets = vec![0];

        let mut cursor = 0;
        for c in 0..self.num_categorical {
            let start = self.category_offsets[c];
            let end = self.category_offsets[c + 1];
            let taken = categorical_keep[cursor..].partition_point(|&index| index < end);
            let picked = &categorical_keep[cursor..cursor + taken];
            cursor += taken;
            if picked.is_empty() {
                dropped_columns.push(c);
                continue;
            }
            let missing_slot = self.missing_slot(c);
            let keep_missing = missing_slot.is_some_and(|slot| picked.last() == Some(&slot));
            let codes: Vec<usize> = picked
                .iter()
                .filter(|&&index| Some(index) != missing_slot)
                .map(|&index| self.code_at_offset(c, index - start))
                .collect();
            let width = codes.len() + usize::from(keep_missing);
            category_offsets.push(category_offsets[category_offsets.len() - 1] + width);
            levels.push(CategoryLevels::Filtered(codes));
            category_missing.push(keep_missing);
            columns.push(self.columns[c].clone());
            permutation.push(self.permutation[c]);
        }

        let retained_numeric: Vec<usize> = numeric_keep
            .iter()
            .map(|&index| index - numeric_start)
            .collect();
        let mut retained = retained_numeric.iter().peekable();
        for j in 0..self.num_numeric {
            let column = self.num_categorical + j;
            if retained.next_if_eq(&&j).is_some() {
                columns.push(self.columns[column].clone());
                permutation.push(self.permutation[column]);
            } else {
                dropped_columns.push(column);
            }
        }
        let num_binary = retained_numeric
            .iter()
            .take_while(|&&j| j < self.num_binary)
            .count();

        let responses = self.columns.len() - self.num_responses..self.columns.len();
        columns.extend(self.columns[responses.clone()].iter().cloned());
        permutation.extend_from_slice(&self.permutation[responses]);

        let layout = Layout {
            columns,
            permutation,
            source_columns: self.source_columns,
            num_categorical: levels.len(),
            num_binary,
            num_numeric: retained_numeric.len(),
            num_responses: self.num_responses,
            category_offsets,
            category_missing,
            levels,
            use_all_levels: self.use_all_levels,
            intercept: self.intercept,
            validation: self.validation,
            active_columns: Some(keep.to_vec()),
        };

        log::info!(
            "Projected layout keeps {} of {} features; dropped columns {:?}.",
            layout.full_width(),
            width,
            dropped_columns
                .iter()
                .map(|&c| self.columns[c].name.as_str())
                .collect::<Vec<_>>()
        );

        Ok(Projection {
            layout,
            dropped_columns,
            retained_numeric,
            parent_features: self.num_features(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{CategoryIndex, LayoutOptions};
    use crate::shared::columns::{ColumnSchema, ColumnSummary};
    use ndarray::array;

    fn domain(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("l{i}")).collect()
    }

    fn layout(options: LayoutOptions) -> Layout {
        let summary = ColumnSummary::new(0.0, 1.0, -1.0, 1.0);
        let schema = vec![
            ColumnSchema::categorical("wide", domain(4)),
            ColumnSchema::categorical("narrow", domain(3)),
            ColumnSchema::numeric("a", summary),
            ColumnSchema::numeric("b", summary),
            ColumnSchema::numeric("c", summary),
            ColumnSchema::numeric("y", summary),
        ];
        Layout::build(&schema, 1, &options).unwrap()
    }

    #[test]
    fn emptied_categorical_is_dropped_entirely() {
        let parent = layout(LayoutOptions {
            use_all_levels: true,
            ..LayoutOptions::default()
        });
        assert_eq!(parent.category_offsets(), &[0, 4, 7]);
        assert_eq!(parent.full_width(), 10);

        // Keep wide levels 1 and 3, nothing of narrow, numerics a and c.
        let projection = parent.project(&[1, 3, 7, 9]).unwrap();
        let child = &projection.layout;
        assert_eq!(projection.dropped_columns, vec![1, 3]);
        assert_eq!(projection.retained_numeric, vec![0, 2]);
        assert_eq!(child.num_categorical(), 1);
        assert_eq!(child.category_offsets(), &[0, 2]);
        // Two wide levels, all three narrow levels and numeric b are gone.
        assert_eq!(child.full_width(), parent.full_width() - 2 - 3 - 1);
        let names: Vec<&str> = child.column_names().collect();
        assert_eq!(names, vec!["wide", "a", "c", "y"]);
        assert_eq!(child.permutation(), &[0, 2, 4, 5]);

        assert_eq!(child.map_category(0, 3).unwrap(), CategoryIndex::Active(1));
        assert_eq!(child.map_category(0, 2).unwrap(), CategoryIndex::Ignored);
        assert_eq!(child.feature_names(), vec!["wide.l1", "wide.l3", "a", "c", "Intercept"]);
    }

    #[test]
    fn partial_drop_shrinks_by_removed_levels() {
        let parent = layout(LayoutOptions {
            missing_bucket: true,
            ..LayoutOptions::default()
        });
        // wide: 3 levels + missing = 4, narrow: 2 levels + missing = 3.
        assert_eq!(parent.category_offsets(), &[0, 4, 7]);
        let keep: Vec<usize> = (0..parent.full_width()).filter(|&i| i != 1 && i != 5).collect();
        let projection = parent.project(&keep).unwrap();
        assert!(projection.dropped_columns.is_empty());
        assert_eq!(projection.layout.full_width(), parent.full_width() - 2);
        assert_eq!(projection.layout.category_missing(), &[true, true]);
        // Dummy-coded codes are shifted by one: wide keeps codes 1 and 3.
        assert_eq!(
            projection.layout.levels()[0],
            CategoryLevels::Filtered(vec![1, 3])
        );
        assert_eq!(projection.layout.missing_slot(0), Some(2));
    }

    #[test]
    fn selection_must_be_sorted_and_in_range() {
        let parent = layout(LayoutOptions::default());
        assert_eq!(
            parent.project(&[2, 2]).unwrap_err(),
            LayoutError::UnsortedSelection {
                previous: 2,
                index: 2
            }
        );
        let width = parent.full_width();
        assert_eq!(
            parent.project(&[0, width]).unwrap_err(),
            LayoutError::SelectionOutOfRange { index: width, width }
        );
    }

    #[test]
    fn scatter_restores_parent_positions() {
        let parent = layout(LayoutOptions {
            use_all_levels: true,
            ..LayoutOptions::default()
        });
        let projection = parent.project(&[1, 3, 7, 9]).unwrap();
        let full = projection
            .scatter(array![0.1, 0.3, 0.7, 0.9, 5.0].view())
            .unwrap();
        assert_eq!(full.len(), parent.num_features());
        assert_eq!(full[1], 0.1);
        assert_eq!(full[3], 0.3);
        assert_eq!(full[7], 0.7);
        assert_eq!(full[9], 0.9);
        assert_eq!(full[10], 5.0);
        assert_eq!(full.iter().filter(|&&v| v != 0.0).count(), 5);
        assert!(projection.scatter(array![1.0].view()).is_err());
    }
}
