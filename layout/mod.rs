//! # Expanded Feature Layout
//!
//! A [`Layout`] fixes where every source column lands in the flat feature
//! space: categorical columns first, one-hot expanded into contiguous ranges,
//! then numeric columns one slot each, then an optional intercept. Responses
//! ride along at the end of the column order but never occupy feature slots.
//!
//! Layouts are computed once and then shared read-only by every extractor.

pub mod builder;
pub mod levels;
pub mod mapper;
pub mod project;

pub use builder::{Layout, LayoutOptions, reorder_columns_for_layout};
pub use levels::CategoryLevels;
pub use mapper::CategoryIndex;
pub use project::Projection;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("{responses} response columns were requested but the schema only has {columns} columns.")]
    TooManyResponses { responses: usize, columns: usize },
    #[error("The schema has no predictor columns.")]
    NoPredictors,
    #[error("Categorical column '{0}' has an empty domain.")]
    EmptyDomain(String),
    #[error(
        "Categorical column '{column}' produced code {code}, which maps to feature {index} but the column's levels end at {end}. Only validation layouts may see unseen levels."
    )]
    LevelOutOfRange {
        column: String,
        code: usize,
        index: usize,
        end: usize,
    },
    #[error("Expected {expected} column names but got {found}.")]
    NameCountMismatch { expected: usize, found: usize },
    #[error("Expected {expected} columns to reorder but got {found}.")]
    ColumnCountMismatch { expected: usize, found: usize },
    #[error("Selected feature indices must be strictly increasing; {index} follows {previous}.")]
    UnsortedSelection { previous: usize, index: usize },
    #[error("Selected feature index {index} is outside a layout of {width} features.")]
    SelectionOutOfRange { index: usize, width: usize },
    #[error("Expected a vector of {expected} coefficients but got {found}.")]
    CoefficientLengthMismatch { expected: usize, found: usize },
}
