#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

pub mod columns;

pub mod shared {
    pub use super::columns;
}

#[path = "../transform/mod.rs"]
pub mod transform;

#[path = "../layout/mod.rs"]
pub mod layout;

#[path = "../rows/mod.rs"]
pub mod rows;

pub use rows::{
    ConfigError, ExtractError, MissingPolicy, Numerics, ProjectedView, Row, RowStatus, RowView,
    SparseEntries, ViewConfig, ViewError,
};
