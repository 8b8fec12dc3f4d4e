use super::LayoutError;
use super::builder::Layout;
use super::levels::CategoryLevels;

/// Where one raw categorical code lands in the feature space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryIndex {
    /// The one active feature for this column.
    Active(usize),
    /// The dropped base level under dummy coding: no active feature.
    Reference,
    /// A level removed by projection: the row omits this column.
    Ignored,
    /// A level beyond the training domain, seen by a validation layout.
    Unseen,
}

impl CategoryIndex {
    #[inline]
    pub fn active(self) -> Option<usize> {
        match self {
            CategoryIndex::Active(index) => Some(index),
            _ => None,
        }
    }
}

impl Layout {
    /// Maps raw `code` of categorical column `column` to its output feature.
    ///
    /// Filtered columns look the code up among the retained levels. Unfiltered
    /// columns use `code` directly, or `code - 1` under dummy coding, where
    /// code 0 is the reference level. A result at or past the end of the
    /// column's range is an unseen level, which only a validation layout may
    /// tolerate. The range includes the missing slot, so the first code past
    /// the domain lands there when the column has one.
    #[inline]
    pub fn map_category(&self, column: usize, code: usize) -> Result<CategoryIndex, LayoutError> {
        let local = match &self.levels[column] {
            CategoryLevels::Filtered(codes) => match codes.binary_search(&code) {
                Ok(position) => position,
                Err(_) => return Ok(CategoryIndex::Ignored),
            },
            CategoryLevels::Unfiltered if self.use_all_levels => code,
            CategoryLevels::Unfiltered => match code.checked_sub(1) {
                Some(local) => local,
                None => return Ok(CategoryIndex::Reference),
            },
        };
        let start = self.category_offsets[column];
        let end = self.category_offsets[column + 1];
        let index = start.checked_add(local).filter(|&index| index < end);
        if let Some(index) = index {
            Ok(CategoryIndex::Active(index))
        } else if self.validation {
            Ok(CategoryIndex::Unseen)
        } else {
            Err(LayoutError::LevelOutOfRange {
                column: self.columns[column].name.clone(),
                code,
                index: start.saturating_add(local),
                end,
            })
        }
    }

    /// Output index of the missing slot of categorical column `column`.
    #[inline]
    pub fn missing_slot(&self, column: usize) -> Option<usize> {
        self.category_missing[column].then(|| self.category_offsets[column + 1] - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutOptions;
    use crate::shared::columns::ColumnSchema;

    fn xyz(options: LayoutOptions) -> Layout {
        let schema = vec![ColumnSchema::categorical(
            "letter",
            vec!["x".into(), "y".into(), "z".into()],
        )];
        Layout::build(&schema, 0, &options).unwrap()
    }

    #[test]
    fn dummy_coding_with_missing_bucket() {
        let layout = xyz(LayoutOptions {
            missing_bucket: true,
            intercept: false,
            ..LayoutOptions::default()
        });
        assert_eq!(layout.category_offsets(), &[0, 3]);
        assert_eq!(layout.map_category(0, 0).unwrap(), CategoryIndex::Reference);
        assert_eq!(layout.map_category(0, 1).unwrap(), CategoryIndex::Active(0));
        assert_eq!(layout.map_category(0, 2).unwrap(), CategoryIndex::Active(1));
        assert_eq!(layout.missing_slot(0), Some(2));
    }

    #[test]
    fn first_code_past_the_domain_lands_in_the_missing_slot() {
        let layout = xyz(LayoutOptions {
            missing_bucket: true,
            ..LayoutOptions::default()
        });
        assert_eq!(layout.map_category(0, 3).unwrap(), CategoryIndex::Active(2));
        assert_eq!(layout.missing_slot(0), Some(2));
        assert!(matches!(
            layout.map_category(0, 4),
            Err(LayoutError::LevelOutOfRange { code: 4, index: 3, end: 3, .. })
        ));
        let scoring = layout.for_validation();
        assert_eq!(scoring.map_category(0, 4).unwrap(), CategoryIndex::Unseen);
        assert_eq!(scoring.map_category(0, 3).unwrap(), CategoryIndex::Active(2));

        let all_levels = xyz(LayoutOptions {
            use_all_levels: true,
            missing_bucket: true,
            ..LayoutOptions::default()
        });
        assert_eq!(all_levels.category_offsets(), &[0, 4]);
        assert_eq!(all_levels.map_category(0, 3).unwrap(), CategoryIndex::Active(3));
    }

    #[test]
    fn huge_codes_never_wrap_into_another_column() {
        let schema = vec![
            ColumnSchema::categorical("a", vec!["a0".into(), "a1".into(), "a2".into()]),
            ColumnSchema::categorical("b", vec!["b0".into(), "b1".into()]),
        ];
        let options = LayoutOptions {
            use_all_levels: true,
            ..LayoutOptions::default()
        };
        let layout = Layout::build(&schema, 0, &options).unwrap();
        assert_eq!(layout.category_offsets(), &[0, 3, 5]);
        assert!(matches!(
            layout.map_category(1, usize::MAX),
            Err(LayoutError::LevelOutOfRange { index: usize::MAX, end: 5, .. })
        ));
        let scoring = layout.for_validation();
        assert_eq!(scoring.map_category(1, usize::MAX).unwrap(), CategoryIndex::Unseen);
    }

    #[test]
    fn all_levels_map_codes_directly() {
        let layout = xyz(LayoutOptions {
            use_all_levels: true,
            ..LayoutOptions::default()
        });
        assert_eq!(layout.map_category(0, 0).unwrap(), CategoryIndex::Active(0));
        assert_eq!(layout.map_category(0, 2).unwrap(), CategoryIndex::Active(2));
        assert_eq!(layout.missing_slot(0), None);
        assert!(layout.map_category(0, 3).is_err());
    }

    #[test]
    fn filtered_levels_ignore_dropped_codes() {
        let mut layout = xyz(LayoutOptions {
            use_all_levels: true,
            ..LayoutOptions::default()
        });
        layout.levels[0] = CategoryLevels::Filtered(vec![0, 2]);
        layout.category_offsets = vec![0, 2];
        assert_eq!(layout.map_category(0, 2).unwrap(), CategoryIndex::Active(1));
        assert_eq!(layout.map_category(0, 1).unwrap(), CategoryIndex::Ignored);
        assert_eq!(CategoryIndex::Ignored.active(), None);
        assert_eq!(CategoryIndex::Active(4).active(), Some(4));
    }
}
