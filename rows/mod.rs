//! # Row Extraction
//!
//! Turns column chunks into feature rows through a configured [`RowView`]:
//! densely one record at a time into a reusable [`Row`], or sparsely for a
//! whole batch at once.

pub mod config;
pub mod dense;
pub mod row;
pub mod sparse;
pub mod view;

pub use config::{ConfigError, ViewConfig};
pub use row::{ExtractError, Numerics, Row, RowStatus, SparseEntries};
pub use view::{MissingPolicy, ProjectedView, RowView, ViewError};
