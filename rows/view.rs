//! # Row View
//!
//! [`RowView`] bundles everything an extractor needs: the [`Layout`], the
//! predictor and response [`Transform`]s, and the [`MissingPolicy`]. It is
//! immutable once configured and is shared by reference across worker threads;
//! each worker owns only the rows it fills.

use super::config::{ConfigError, ViewConfig};
use crate::layout::{Layout, LayoutError, Projection};
use crate::shared::columns::ColumnSchema;
use crate::transform::{Transform, TransformError, TransformKind};
use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(
        "Expected a vector of {full_width} features (or {num_features} with the intercept) but got {found}."
    )]
    VectorLengthMismatch {
        full_width: usize,
        num_features: usize,
        found: usize,
    },
}

/// What to do with a row that has a missing value in any column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Flag the whole row bad.
    #[default]
    Skip,
    /// Categoricals go to their missing slot when the layout has one; numeric
    /// values come through as NaN.
    Propagate,
}

/// A configured, read-only view of column chunks as feature rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowView {
    pub(crate) layout: Layout,
    pub(crate) predictor: Transform,
    pub(crate) response: Transform,
    pub(crate) missing: MissingPolicy,
}

/// The result of [`RowView::project`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedView {
    view: RowView,
    projection: Projection,
}

impl ProjectedView {
    pub fn view(&self) -> &RowView {
        &self.view
    }

    pub fn into_view(self) -> RowView {
        self.view
    }

    /// Parent layout columns that no longer contribute any feature.
    pub fn dropped_columns(&self) -> &[usize] {
        &self.projection.dropped_columns
    }

    /// See [`Projection::scatter`].
    pub fn scatter(&self, restricted: ArrayView1<f64>) -> Result<Array1<f64>, LayoutError> {
        self.projection.scatter(restricted)
    }
}

impl RowView {
    /// Builds the layout for `schema` and configures both transforms from the
    /// column statistics.
    pub fn new(schema: &[ColumnSchema], config: &ViewConfig) -> Result<Self, ViewError> {
        let layout = Layout::build(schema, config.responses, &config.layout_options())?;
        let mut view = Self::from_layout(layout, config.missing);
        view.configure_predictor_transform(config.predictor_transform)?;
        view.configure_response_transform(config.response_transform)?;
        Ok(view)
    }

    /// A view with both transforms disabled.
    pub fn from_layout(layout: Layout, missing: MissingPolicy) -> Self {
        Self {
            layout,
            predictor: Transform::none(),
            response: Transform::none(),
            missing,
        }
    }

    /// Derives predictor coefficients from the numeric columns' statistics.
    /// Binary indicator columns always get the identity.
    pub fn configure_predictor_transform(&mut self, kind: TransformKind) -> Result<(), TransformError> {
        let mut transform = Transform::configure(kind, &self.layout.numeric_summaries())?;
        transform.set_identity(0..self.layout.num_binary());
        log::debug!("Predictor transform: {kind} over {} columns.", transform.len());
        self.predictor = transform;
        Ok(())
    }

    pub fn configure_response_transform(&mut self, kind: TransformKind) -> Result<(), TransformError> {
        self.response = Transform::configure(kind, &self.layout.response_summaries())?;
        log::debug!("Response transform: {kind} over {} columns.", self.response.len());
        Ok(())
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn predictor_transform(&self) -> &Transform {
        &self.predictor
    }

    pub fn response_transform(&self) -> &Transform {
        &self.response
    }

    pub fn missing_policy(&self) -> MissingPolicy {
        self.missing
    }

    /// A copy for scoring fresh data, where unseen categorical levels are
    /// dropped instead of failing the extraction.
    pub fn for_validation(&self) -> Self {
        Self {
            layout: self.layout.for_validation(),
            ..self.clone()
        }
    }

    pub fn is_validation(&self) -> bool {
        self.layout.is_validation()
    }

    /// An independent copy. Nothing is shared with `self`.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// Total feature count, intercept included.
    pub fn num_features(&self) -> usize {
        self.layout.num_features()
    }

    pub fn first_numeric_output_index(&self) -> usize {
        self.layout.numeric_start()
    }

    /// One name per feature, in output order.
    pub fn output_feature_names(&self) -> Vec<String> {
        self.layout.feature_names()
    }

    /// For each column of this view's layout, the position of the equally
    /// named entry in `names`, typically another dataset's column names.
    pub fn map_column_names_to_output_order<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<Option<usize>>, LayoutError> {
        self.layout.map_column_names(names)
    }

    /// Applies the predictor transform to the numeric block of `values`.
    pub fn scale_predictors_in_place(&self, mut values: ArrayViewMut1<f64>) -> Result<(), ViewError> {
        self.check_vector(values.len())?;
        let start = self.layout.numeric_start();
        for i in 0..self.layout.num_numeric() {
            values[start + i] = self.predictor.apply(i, values[start + i]);
        }
        Ok(())
    }

    /// Writes `input`'s numeric block, mapped back to raw units, into the same
    /// positions of `output`. Categorical slots and the intercept of `output`
    /// are not written.
    pub fn unscale_predictors(
        &self,
        input: ArrayView1<f64>,
        mut output: ArrayViewMut1<f64>,
    ) -> Result<(), ViewError> {
        self.check_vector(input.len())?;
        self.check_vector(output.len())?;
        let start = self.layout.numeric_start();
        for i in 0..self.layout.num_numeric() {
            output[start + i] = self.predictor.invert(i, input[start + i]);
        }
        Ok(())
    }

    pub fn unscale_predictors_in_place(&self, mut values: ArrayViewMut1<f64>) -> Result<(), ViewError> {
        self.check_vector(values.len())?;
        let start = self.layout.numeric_start();
        for i in 0..self.layout.num_numeric() {
            values[start + i] = self.predictor.invert(i, values[start + i]);
        }
        Ok(())
    }

    /// Restricts the view to the features in `keep`, carrying each surviving
    /// numeric column's transform coefficients along.
    pub fn project(&self, keep: &[usize]) -> Result<ProjectedView, ViewError> {
        let projection = self.layout.project(keep)?;
        let predictor = self.predictor.select(&projection.retained_numeric)?;
        let view = Self {
            layout: projection.layout.clone(),
            predictor,
            response: self.response.clone(),
            missing: self.missing,
        };
        Ok(ProjectedView { view, projection })
    }

    fn check_vector(&self, found: usize) -> Result<(), ViewError> {
        let full_width = self.layout.full_width();
        let num_features = self.layout.num_features();
        if found != full_width && found != num_features {
            return Err(ViewError::VectorLengthMismatch {
                full_width,
                num_features,
                found,
            });
        }
        Ok(())
    }
}
