use serde::{Deserialize, Serialize};

/// Which raw level codes of one categorical column reach the feature space.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategoryLevels {
    /// Every level of the domain, with no remapping.
    #[default]
    Unfiltered,
    /// Only these raw codes, sorted ascending; a code's position in the list
    /// is its offset inside the column's range.
    Filtered(Vec<usize>),
}

impl CategoryLevels {
    pub fn is_filtered(&self) -> bool {
        matches!(self, CategoryLevels::Filtered(_))
    }

    /// Offset of `code` inside a filtered column, `None` when it was dropped.
    /// Always `Some(code)` for unfiltered columns.
    #[inline]
    pub fn position(&self, code: usize) -> Option<usize> {
        match self {
            CategoryLevels::Unfiltered => Some(code),
            CategoryLevels::Filtered(codes) => codes.binary_search(&code).ok(),
        }
    }

    /// Raw code stored at `offset` of a filtered column.
    pub fn code_at(&self, offset: usize) -> usize {
        match self {
            CategoryLevels::Unfiltered => offset,
            CategoryLevels::Filtered(codes) => codes[offset],
        }
    }

    /// Retained level count, or `None` when every level is kept.
    pub fn retained(&self) -> Option<usize> {
        match self {
            CategoryLevels::Unfiltered => None,
            CategoryLevels::Filtered(codes) => Some(codes.len()),
        }
    }
}
